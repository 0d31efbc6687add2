/// Append-only log of product stock movements
///
/// Every change to `products.available_stock` writes one row here on the
/// same connection, so the log and the stock level commit together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::status::RecordStatus;

/// Reason recorded for the stock a product is created with
pub const REASON_NEW_STOCK: &str = "NEW_STOCK";

/// Reason recorded when stock is edited through a product update
pub const REASON_PRODUCT_UPDATE: &str = "PRODUCT_UPDATE";

const HISTORY_COLUMNS: &str = "id, product_id, previous_stock, new_stock, change_amount, \
                               changed_by, change_reason, change_note, change_date, status";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockHistory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub previous_stock: i32,
    pub new_stock: i32,
    /// `new_stock - previous_stock`
    pub change_amount: i32,
    pub changed_by: Option<Uuid>,
    pub change_reason: String,
    pub change_note: Option<String>,
    pub change_date: DateTime<Utc>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct NewStockChange {
    pub product_id: Uuid,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub changed_by: Uuid,
    pub reason: String,
    pub note: Option<String>,
}

/// A stock movement joined with names, for reports
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StockHistoryEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub change_amount: i32,
    pub changed_by: Option<Uuid>,
    pub changed_by_name: Option<String>,
    pub change_reason: String,
    pub change_note: Option<String>,
    pub change_date: DateTime<Utc>,
    /// Running sum of `change_amount` for this product up to this entry
    #[sqlx(default)]
    pub cumulative_change: i64,
}

impl StockHistory {
    /// Appends one movement
    pub async fn record(conn: &mut PgConnection, change: NewStockChange) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO stock_history
                (product_id, previous_stock, new_stock, change_amount, changed_by, change_reason, change_note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {HISTORY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, StockHistory>(&sql)
            .bind(change.product_id)
            .bind(change.previous_stock)
            .bind(change.new_stock)
            .bind(change.new_stock - change.previous_stock)
            .bind(change.changed_by)
            .bind(change.reason)
            .bind(change.note)
            .fetch_one(conn)
            .await
    }

    /// Movements of one product, newest first
    pub async fn for_product(pool: &PgPool, product_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM stock_history WHERE product_id = $1 ORDER BY change_date DESC, id DESC"
        );
        sqlx::query_as::<_, StockHistory>(&sql)
            .bind(product_id)
            .fetch_all(pool)
            .await
    }

    /// Movements in `[from, to)` with names and per-product running totals,
    /// newest first
    pub async fn report(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StockHistoryEntry>, sqlx::Error> {
        let entries = sqlx::query_as::<_, StockHistoryEntry>(
            r#"
            SELECT sh.id, sh.product_id, p.name AS product_name,
                   sh.previous_stock, sh.new_stock, sh.change_amount,
                   sh.changed_by, u.name AS changed_by_name,
                   sh.change_reason, sh.change_note, sh.change_date
            FROM stock_history sh
            JOIN products p ON p.id = sh.product_id
            LEFT JOIN users u ON u.id = sh.changed_by
            WHERE sh.change_date >= $1 AND sh.change_date < $2
              AND sh.status = 'ACTIVE'
            ORDER BY sh.change_date ASC, sh.id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(with_cumulative(entries))
    }
}

/// Fills `cumulative_change` from chronologically ordered entries and
/// returns them newest first
pub fn with_cumulative(mut entries: Vec<StockHistoryEntry>) -> Vec<StockHistoryEntry> {
    let mut running: HashMap<Uuid, i64> = HashMap::new();
    for entry in entries.iter_mut() {
        let total = running.entry(entry.product_id).or_insert(0);
        *total += i64::from(entry.change_amount);
        entry.cumulative_change = *total;
    }
    entries.reverse();
    entries
}
