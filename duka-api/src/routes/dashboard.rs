/// Dashboard endpoints
///
/// Ranges are inclusive calendar days in UTC. A missing bound falls back
/// to the current month.
///
/// # Endpoints
///
/// - `GET /v1/dashboard/summary?from=&to=` - Daily metric series
/// - `GET /v1/dashboard/today` - Today's metrics
/// - `GET /v1/dashboard/stock-history?from=&to=` - Stock movements with running totals
/// - `GET /v1/dashboard/low-stock-count` - Number of products at or below their alert level

use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use duka_shared::{
    dashboard::{self, DashboardSummary, DateRange},
    models::stock_history::StockHistoryEntry,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    fn resolve(&self) -> ApiResult<DateRange> {
        Ok(DateRange::resolve(self.from, self.to, Utc::now().date_naive())?)
    }
}

#[derive(Debug, Serialize)]
pub struct StockHistoryReport {
    pub range: DateRange,
    pub entries: Vec<StockHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct LowStockCount {
    pub count: i64,
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<ApiResponse<DashboardSummary>> {
    let range = query.resolve()?;
    let summary = dashboard::summary(&state.db, range).await?;
    Ok(ApiResponse::ok("Dashboard summary fetched", summary))
}

pub async fn today(State(state): State<AppState>) -> ApiResult<ApiResponse<DashboardSummary>> {
    let summary = dashboard::today(&state.db).await?;
    Ok(ApiResponse::ok("Today's summary fetched", summary))
}

pub async fn stock_history(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<ApiResponse<StockHistoryReport>> {
    let range = query.resolve()?;
    let entries = dashboard::stock_history(&state.db, range).await?;
    Ok(ApiResponse::ok("Stock history fetched", StockHistoryReport { range, entries }))
}

pub async fn low_stock_count(State(state): State<AppState>) -> ApiResult<ApiResponse<LowStockCount>> {
    let count = dashboard::low_stock_count(&state.db).await?;
    Ok(ApiResponse::ok("Low stock count fetched", LowStockCount { count }))
}
