/// Credit limit history of a customer
///
/// Setting a limit deactivates the previous one, so at most one row per
/// customer is `ACTIVE`. The active amount is mirrored on
/// `customers.credit_limit` for the order path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status::RecordStatus;

const LIMIT_COLUMNS: &str = "id, customer_id, limit_amount, created_by, created_at, updated_at, status";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditLimit {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub limit_amount: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: RecordStatus,
}

impl CreditLimit {
    /// Records a new active limit for the customer
    ///
    /// Returns `None` when the customer does not exist.
    pub async fn set(
        pool: &PgPool,
        customer_id: Uuid,
        limit_amount: Decimal,
        actor_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE customers SET credit_limit = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(customer_id)
        .bind(limit_amount)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE credit_limits
            SET status = 'INACTIVE', updated_at = NOW()
            WHERE customer_id = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            r#"
            INSERT INTO credit_limits (customer_id, limit_amount, created_by)
            VALUES ($1, $2, $3)
            RETURNING {LIMIT_COLUMNS}
            "#
        );
        let limit = sqlx::query_as::<_, CreditLimit>(&sql)
            .bind(customer_id)
            .bind(limit_amount)
            .bind(actor_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%customer_id, limit = %limit_amount, "Credit limit set");
        Ok(Some(limit))
    }

    /// Every limit the customer has had, newest first
    pub async fn list_for_customer(pool: &PgPool, customer_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {LIMIT_COLUMNS} FROM credit_limits WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CreditLimit>(&sql)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }
}
