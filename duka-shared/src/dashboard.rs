/// Sales dashboard metrics
///
/// Each metric is a daily series over an inclusive date range, one point
/// per calendar day (UTC) with days without activity filled with zero. The
/// SQL only groups and sums; the series are assembled here.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::product::Product;
use crate::models::stock_history::{StockHistory, StockHistoryEntry};

/// Longest range a single request may cover
pub const MAX_RANGE_DAYS: i64 = 366;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Range start {from} is after range end {to}")]
    InvertedRange { from: NaiveDate, to: NaiveDate },

    #[error("Range covers more than {MAX_RANGE_DAYS} days")]
    RangeTooLong,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Uses the given bounds, defaulting to the month containing `today`
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, DashboardError> {
        let month = Self::month_of(today);
        let range = Self {
            from: from.unwrap_or(month.from),
            to: to.unwrap_or(month.to),
        };

        if range.from > range.to {
            return Err(DashboardError::InvertedRange {
                from: range.from,
                to: range.to,
            });
        }
        if range.days() > MAX_RANGE_DAYS {
            return Err(DashboardError::RangeTooLong);
        }
        Ok(range)
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// First to last day of the month containing `day`
    pub fn month_of(day: NaiveDate) -> Self {
        let from = day.with_day(1).unwrap_or(day);
        let next_month = if from.month() == 12 {
            NaiveDate::from_ymd_opt(from.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(from.year(), from.month() + 1, 1)
        };
        let to = next_month
            .and_then(|d| d.pred_opt())
            .unwrap_or(day);
        Self { from, to }
    }

    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let from = self.from;
        (0..self.days()).map(move |offset| from + Duration::days(offset))
    }

    /// Start of `from` as a UTC timestamp
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
    }

    /// Start of the day after `to`, the exclusive upper bound
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.start() + Duration::days(self.days())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// One point per day of `range`, zero where `rows` has no entry
pub fn fill_daily(range: &DateRange, rows: &[(NaiveDate, Decimal)]) -> Vec<DailyPoint> {
    let by_day: HashMap<NaiveDate, Decimal> = rows.iter().copied().collect();
    range
        .iter_days()
        .map(|date| DailyPoint {
            date,
            value: by_day.get(&date).copied().unwrap_or(Decimal::ZERO),
        })
        .collect()
}

/// Profit minus expenses, day by day
pub fn net_profit(profit: &[DailyPoint], expenses: &[DailyPoint]) -> Vec<DailyPoint> {
    profit
        .iter()
        .zip(expenses)
        .map(|(p, e)| DailyPoint {
            date: p.date,
            value: p.value - e.value,
        })
        .collect()
}

fn total(series: &[DailyPoint]) -> Decimal {
    series.iter().map(|p| p.value).sum()
}

/// Range totals of every metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    pub products: Decimal,
    pub cash_sales: Decimal,
    pub credit_sales: Decimal,
    pub credit_repayments: Decimal,
    pub expenses: Decimal,
    pub profit: Decimal,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub range: DateRange,
    /// Products created per day
    pub products: Vec<DailyPoint>,
    pub cash_sales: Vec<DailyPoint>,
    pub credit_sales: Vec<DailyPoint>,
    pub credit_repayments: Vec<DailyPoint>,
    pub expenses: Vec<DailyPoint>,
    pub profit: Vec<DailyPoint>,
    pub net_profit: Vec<DailyPoint>,
    pub totals: MetricTotals,
}

impl DashboardSummary {
    /// Assembles the summary from per-day query rows
    pub fn from_rows(
        range: DateRange,
        products: &[(NaiveDate, Decimal)],
        cash_sales: &[(NaiveDate, Decimal)],
        credit_sales: &[(NaiveDate, Decimal)],
        credit_repayments: &[(NaiveDate, Decimal)],
        expenses: &[(NaiveDate, Decimal)],
        profit: &[(NaiveDate, Decimal)],
    ) -> Self {
        let products = fill_daily(&range, products);
        let cash_sales = fill_daily(&range, cash_sales);
        let credit_sales = fill_daily(&range, credit_sales);
        let credit_repayments = fill_daily(&range, credit_repayments);
        let expenses = fill_daily(&range, expenses);
        let profit = fill_daily(&range, profit);
        let net_profit = net_profit(&profit, &expenses);

        let totals = MetricTotals {
            products: total(&products),
            cash_sales: total(&cash_sales),
            credit_sales: total(&credit_sales),
            credit_repayments: total(&credit_repayments),
            expenses: total(&expenses),
            profit: total(&profit),
            net_profit: total(&net_profit),
        };

        Self {
            range,
            products,
            cash_sales,
            credit_sales,
            credit_repayments,
            expenses,
            profit,
            net_profit,
            totals,
        }
    }
}

const PRODUCTS_PER_DAY: &str = r#"
    SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*)::numeric AS value
    FROM products
    WHERE created_at >= $1 AND created_at < $2
    GROUP BY day
"#;

const CASH_SALES_PER_DAY: &str = r#"
    SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COALESCE(SUM(total_amount), 0) AS value
    FROM invoices
    WHERE sale_type = 'CASH' AND created_at >= $1 AND created_at < $2
    GROUP BY day
"#;

const CREDIT_SALES_PER_DAY: &str = r#"
    SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COALESCE(SUM(total_amount), 0) AS value
    FROM invoices
    WHERE sale_type = 'CREDIT' AND created_at >= $1 AND created_at < $2
    GROUP BY day
"#;

const REPAYMENTS_PER_DAY: &str = r#"
    SELECT (payment_date AT TIME ZONE 'UTC')::date AS day, COALESCE(SUM(amount), 0) AS value
    FROM credit_repayments
    WHERE status = 'COMPLETED' AND payment_date >= $1 AND payment_date < $2
    GROUP BY day
"#;

const EXPENSES_PER_DAY: &str = r#"
    SELECT (expense_date AT TIME ZONE 'UTC')::date AS day, COALESCE(SUM(amount), 0) AS value
    FROM expenses
    WHERE expense_date >= $1 AND expense_date < $2
    GROUP BY day
"#;

const PROFIT_PER_DAY: &str = r#"
    SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COALESCE(SUM(sale_profit), 0) AS value
    FROM invoices
    WHERE created_at >= $1 AND created_at < $2
    GROUP BY day
"#;

async fn per_day(
    pool: &PgPool,
    sql: &'static str,
    range: &DateRange,
) -> Result<Vec<(NaiveDate, Decimal)>, sqlx::Error> {
    sqlx::query_as::<_, (NaiveDate, Decimal)>(sql)
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_all(pool)
        .await
}

/// Daily metrics over `range`
pub async fn summary(pool: &PgPool, range: DateRange) -> Result<DashboardSummary, DashboardError> {
    let (products, cash_sales, credit_sales, credit_repayments, expenses, profit) = futures::try_join!(
        per_day(pool, PRODUCTS_PER_DAY, &range),
        per_day(pool, CASH_SALES_PER_DAY, &range),
        per_day(pool, CREDIT_SALES_PER_DAY, &range),
        per_day(pool, REPAYMENTS_PER_DAY, &range),
        per_day(pool, EXPENSES_PER_DAY, &range),
        per_day(pool, PROFIT_PER_DAY, &range),
    )?;

    tracing::debug!(from = %range.from, to = %range.to, "Dashboard summary computed");

    Ok(DashboardSummary::from_rows(
        range,
        &products,
        &cash_sales,
        &credit_sales,
        &credit_repayments,
        &expenses,
        &profit,
    ))
}

/// Totals for the current UTC day
pub async fn today(pool: &PgPool) -> Result<DashboardSummary, DashboardError> {
    summary(pool, DateRange::single_day(Utc::now().date_naive())).await
}

/// Stock movements over `range` with per-product running totals
pub async fn stock_history(pool: &PgPool, range: DateRange) -> Result<Vec<StockHistoryEntry>, DashboardError> {
    Ok(StockHistory::report(pool, range.start(), range.end_exclusive()).await?)
}

/// Number of products at or below their minimum stock
pub async fn low_stock_count(pool: &PgPool) -> Result<i64, DashboardError> {
    Ok(Product::low_stock_count(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_range_is_current_month() {
        let range = DateRange::resolve(None, None, day(2024, 2, 14)).unwrap();
        assert_eq!(range.from, day(2024, 2, 1));
        assert_eq!(range.to, day(2024, 2, 29));
        assert_eq!(range.days(), 29);

        let december = DateRange::month_of(day(2025, 12, 31));
        assert_eq!(december.to, day(2025, 12, 31));
    }

    #[test]
    fn test_range_validation() {
        assert!(matches!(
            DateRange::resolve(Some(day(2025, 3, 2)), Some(day(2025, 3, 1)), day(2025, 3, 1)),
            Err(DashboardError::InvertedRange { .. })
        ));
        assert!(matches!(
            DateRange::resolve(Some(day(2023, 1, 1)), Some(day(2025, 1, 1)), day(2025, 1, 1)),
            Err(DashboardError::RangeTooLong)
        ));
    }

    #[test]
    fn test_range_bounds() {
        let range = DateRange { from: day(2025, 3, 1), to: day(2025, 3, 3) };
        assert_eq!(range.start().to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert_eq!(range.end_exclusive().to_rfc3339(), "2025-03-04T00:00:00+00:00");
    }

    #[test]
    fn test_fill_daily_zero_fills() {
        let range = DateRange { from: day(2025, 3, 1), to: day(2025, 3, 4) };
        let series = fill_daily(&range, &[(day(2025, 3, 2), Decimal::from(150))]);

        let values: Vec<Decimal> = series.iter().map(|p| p.value).collect();
        assert_eq!(
            values,
            vec![Decimal::ZERO, Decimal::from(150), Decimal::ZERO, Decimal::ZERO]
        );
        assert_eq!(series[3].date, day(2025, 3, 4));
    }

    #[test]
    fn test_summary_net_profit_and_totals() {
        let range = DateRange { from: day(2025, 3, 1), to: day(2025, 3, 2) };
        let summary = DashboardSummary::from_rows(
            range,
            &[(day(2025, 3, 1), Decimal::from(2))],
            &[(day(2025, 3, 1), Decimal::from(900))],
            &[(day(2025, 3, 2), Decimal::from(300))],
            &[],
            &[(day(2025, 3, 2), Decimal::from(120))],
            &[(day(2025, 3, 1), Decimal::from(180)), (day(2025, 3, 2), Decimal::from(60))],
        );

        assert_eq!(summary.net_profit[0].value, Decimal::from(180));
        assert_eq!(summary.net_profit[1].value, Decimal::from(-60));
        assert_eq!(summary.totals.net_profit, Decimal::from(120));
        assert_eq!(summary.totals.products, Decimal::from(2));
        assert_eq!(summary.totals.credit_repayments, Decimal::ZERO);
        assert_eq!(summary.credit_repayments.len(), 2);
    }
}
