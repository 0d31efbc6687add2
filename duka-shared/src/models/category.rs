/// Product categories
///
/// Names are unique and stored with a capitalised first letter. Updates and
/// deletes are written to the events table together with the change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::models::status::RecordStatus;
use crate::models::NamedOption;
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};
use crate::text::{capitalize_first, clean_optional};

const CATEGORY_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at, status";

/// Fields left out of the audit diff
const AUDIT_SKIP: &[&str] = &["id", "created_by", "created_at", "updated_at"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: RecordStatus,
}

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub status: RecordStatus,
    pub created_by: Uuid,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySort {
    Name,
    #[default]
    CreatedAt,
}

impl SortField for CategorySort {
    fn column(&self) -> &'static str {
        match self {
            CategorySort::Name => "name",
            CategorySort::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
    pub sort_by: Option<CategorySort>,
    pub sort_order: Option<SortOrder>,
}

impl Category {
    pub async fn create(pool: &PgPool, data: CreateCategory) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO categories (name, description, status, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Category>(&sql)
            .bind(capitalize_first(&data.name))
            .bind(clean_optional(data.description))
            .bind(data.status)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE name = $1");
        sqlx::query_as::<_, Category>(&sql)
            .bind(capitalize_first(name))
            .fetch_optional(pool)
            .await
    }

    /// Merges `patch` into `self` and returns the row as it would be stored
    pub fn merged(&self, patch: UpdateCategory) -> Category {
        Category {
            name: patch.name.map(|n| capitalize_first(&n)).unwrap_or_else(|| self.name.clone()),
            description: match patch.description {
                Some(d) => clean_optional(Some(d)),
                None => self.description.clone(),
            },
            status: patch.status.unwrap_or(self.status),
            ..self.clone()
        }
    }

    /// Writes the merged row and its change log in one transaction
    pub async fn update(
        pool: &PgPool,
        existing: &Category,
        patch: UpdateCategory,
        actor_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let merged = existing.merged(patch);
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE categories
            SET name = $2, description = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Category>(&sql)
            .bind(existing.id)
            .bind(&merged.name)
            .bind(&merged.description)
            .bind(merged.status)
            .fetch_one(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Update,
                entity: "Category",
                table_name: "categories",
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

    /// Deletes the category (cascading to its products) and logs it
    pub async fn delete(pool: &PgPool, existing: &Category, actor_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Category",
                table_name: "categories",
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

    pub async fn list(pool: &PgPool, params: &CategoryListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Desc),
        );

        const FILTER: &str = "($1::text IS NULL OR name ILIKE $1) AND ($2::record_status IS NULL OR status = $2)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM categories WHERE {FILTER}"))
                .bind(&pattern)
                .bind(params.status)
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE {FILTER} {order} LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Category>(&sql)
            .bind(&pattern)
            .bind(params.status)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }

    /// Every category as an `{id, name}` option, ordered by name
    pub async fn options(pool: &PgPool) -> Result<Vec<NamedOption>, sqlx::Error> {
        sqlx::query_as::<_, NamedOption>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category() -> Category {
        Category {
            id: Uuid::new_v4(),
            name: "Cereals".into(),
            description: Some("Grains".into()),
            created_by: None,
            created_at: Utc::now(),
            updated_at: None,
            status: RecordStatus::Active,
        }
    }

    #[test]
    fn test_merged_keeps_unset_fields() {
        let existing = category();
        let merged = existing.merged(UpdateCategory {
            name: Some("beverages".into()),
            ..Default::default()
        });

        assert_eq!(merged.name, "Beverages");
        assert_eq!(merged.description.as_deref(), Some("Grains"));
        assert_eq!(merged.status, RecordStatus::Active);
        assert_eq!(merged.id, existing.id);
    }

    #[test]
    fn test_merged_clears_blank_description() {
        let merged = category().merged(UpdateCategory {
            description: Some("  ".into()),
            status: Some(RecordStatus::Inactive),
            ..Default::default()
        });

        assert_eq!(merged.description, None);
        assert_eq!(merged.status, RecordStatus::Inactive);
    }
}
