/// Audit events
///
/// Rows are written by [`crate::audit::store_change_log`] and only read back
/// through the events listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::status::RecordStatus;
use crate::pagination::{Page, PageRequest};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    /// Table of the affected row
    pub table_name: String,
    /// Primary key of the affected row, as text
    pub field_id: String,
    pub event_details: String,
    pub event_date: DateTime<Utc>,
    pub event_by: Option<Uuid>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub table_name: String,
    pub field_id: String,
    pub event_details: String,
    pub event_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub table_name: Option<String>,
    pub field_id: Option<String>,
}

impl Event {
    pub async fn create(conn: &mut PgConnection, data: CreateEvent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (table_name, field_id, event_details, event_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, table_name, field_id, event_details, event_date, event_by, status
            "#,
        )
        .bind(data.table_name)
        .bind(data.field_id)
        .bind(data.event_details)
        .bind(data.event_by)
        .fetch_one(conn)
        .await
    }

    /// Newest first
    pub async fn list(pool: &PgPool, params: &EventListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM events
            WHERE ($1::text IS NULL OR table_name = $1)
              AND ($2::text IS NULL OR field_id = $2)
            "#,
        )
        .bind(&params.table_name)
        .bind(&params.field_id)
        .fetch_one(pool)
        .await?;

        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, table_name, field_id, event_details, event_date, event_by, status
            FROM events
            WHERE ($1::text IS NULL OR table_name = $1)
              AND ($2::text IS NULL OR field_id = $2)
            ORDER BY event_date DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&params.table_name)
        .bind(&params.field_id)
        .bind(request.limit())
        .bind(request.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(events, total, request))
    }
}
