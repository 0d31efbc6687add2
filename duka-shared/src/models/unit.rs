/// Units of measure (piece, kilogram, litre, ...)
///
/// Same lifecycle as categories. The acronym is optional and stored
/// upper-case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::models::status::RecordStatus;
use crate::models::NamedOption;
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};
use crate::text::{capitalize_first, clean_optional, upper_code};

const UNIT_COLUMNS: &str =
    "id, name, acronym, description, created_by, created_at, updated_at, status";

const AUDIT_SKIP: &[&str] = &["id", "created_by", "created_at", "updated_at"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Unit {
    pub id: Uuid,
    pub name: String,
    pub acronym: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct CreateUnit {
    pub name: String,
    pub acronym: Option<String>,
    pub description: Option<String>,
    pub status: RecordStatus,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUnit {
    pub name: Option<String>,
    pub acronym: Option<String>,
    pub description: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSort {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField for UnitSort {
    fn column(&self) -> &'static str {
        match self {
            UnitSort::Name => "name",
            UnitSort::CreatedAt => "created_at",
            UnitSort::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Matches name or acronym
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
    pub sort_by: Option<UnitSort>,
    pub sort_order: Option<SortOrder>,
}

fn clean_acronym(acronym: Option<String>) -> Option<String> {
    clean_optional(acronym).map(|a| upper_code(&a))
}

impl Unit {
    pub async fn create(pool: &PgPool, data: CreateUnit) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO units (name, acronym, description, status, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {UNIT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Unit>(&sql)
            .bind(capitalize_first(&data.name))
            .bind(clean_acronym(data.acronym))
            .bind(clean_optional(data.description))
            .bind(data.status)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {UNIT_COLUMNS} FROM units WHERE id = $1");
        sqlx::query_as::<_, Unit>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {UNIT_COLUMNS} FROM units WHERE name = $1");
        sqlx::query_as::<_, Unit>(&sql)
            .bind(capitalize_first(name))
            .fetch_optional(pool)
            .await
    }

    pub fn merged(&self, patch: UpdateUnit) -> Unit {
        Unit {
            name: patch.name.map(|n| capitalize_first(&n)).unwrap_or_else(|| self.name.clone()),
            acronym: match patch.acronym {
                Some(a) => clean_acronym(Some(a)),
                None => self.acronym.clone(),
            },
            description: match patch.description {
                Some(d) => clean_optional(Some(d)),
                None => self.description.clone(),
            },
            status: patch.status.unwrap_or(self.status),
            ..self.clone()
        }
    }

    pub async fn update(
        pool: &PgPool,
        existing: &Unit,
        patch: UpdateUnit,
        actor_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let merged = existing.merged(patch);
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE units
            SET name = $2, acronym = $3, description = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {UNIT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Unit>(&sql)
            .bind(existing.id)
            .bind(&merged.name)
            .bind(&merged.acronym)
            .bind(&merged.description)
            .bind(merged.status)
            .fetch_one(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Update,
                entity: "Unit",
                table_name: "units",
                record_id: existing.id,
                original: existing,
                updated: &updated,
                skip_fields: AUDIT_SKIP,
                actor_id,
                other_details: "",
            },
        )
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(pool: &PgPool, existing: &Unit, actor_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Unit",
                table_name: "units",
                record_id: existing.id,
                original: existing,
                updated: existing,
                skip_fields: AUDIT_SKIP,
                actor_id,
                other_details: &format!("Name: {}", existing.name),
            },
        )
        .await?;

        tx.commit().await
    }

    /// Oldest first unless another sort is requested
    pub async fn list(pool: &PgPool, params: &UnitListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Asc),
        );

        const FILTER: &str = "($1::text IS NULL OR name ILIKE $1 OR acronym ILIKE $1) \
                              AND ($2::record_status IS NULL OR status = $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM units WHERE {FILTER}"))
            .bind(&pattern)
            .bind(params.status)
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {UNIT_COLUMNS} FROM units WHERE {FILTER} {order} LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Unit>(&sql)
            .bind(&pattern)
            .bind(params.status)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }

    pub async fn options(pool: &PgPool) -> Result<Vec<NamedOption>, sqlx::Error> {
        sqlx::query_as::<_, NamedOption>("SELECT id, name FROM units ORDER BY name")
            .fetch_all(pool)
            .await
    }
}
