/// Shop expenses, subtracted from sale profit on the dashboard

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::pagination::{Page, PageRequest};

const EXPENSE_COLUMNS: &str = "id, description, amount, expense_date, created_by, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateExpense {
    pub description: String,
    pub amount: Decimal,
    /// Defaults to now
    pub expense_date: Option<DateTime<Utc>>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Inclusive lower bound on `expense_date`
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `expense_date`
    pub to: Option<DateTime<Utc>>,
}

impl Expense {
    pub async fn create(pool: &PgPool, data: CreateExpense) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO expenses (description, amount, expense_date, created_by)
            VALUES ($1, $2, COALESCE($3, NOW()), $4)
            RETURNING {EXPENSE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Expense>(&sql)
            .bind(data.description.trim())
            .bind(data.amount)
            .bind(data.expense_date)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1");
        sqlx::query_as::<_, Expense>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Newest expense first
    pub async fn list(pool: &PgPool, params: &ExpenseListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);

        const FILTER: &str = "($1::timestamptz IS NULL OR expense_date >= $1) \
                              AND ($2::timestamptz IS NULL OR expense_date < $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM expenses WHERE {FILTER}"))
            .bind(params.from)
            .bind(params.to)
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE {FILTER} \
             ORDER BY expense_date DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Expense>(&sql)
            .bind(params.from)
            .bind(params.to)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }

    pub async fn delete(pool: &PgPool, existing: &Expense, actor_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Expense",
                table_name: "expenses",
                record_id: existing.id,
                original: existing,
                updated: existing,
                skip_fields: &[],
                actor_id,
                other_details: &format!("Amount: {}, Description: {}", existing.amount, existing.description),
            },
        )
        .await?;

        tx.commit().await
    }
}
