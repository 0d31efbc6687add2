/// Credit customers
///
/// A customer is identified at the till by phone number. Credit sales made
/// to a known phone number grow the customer's `credit_balance`; repayments
/// shrink it. A positive `credit_limit` caps the balance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::models::status::{CustomerStatus, RecordStatus};
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};
use crate::text::clean_optional;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone_number, national_id, img_url, address, \
    credit_limit, credit_balance, credit_status, status, created_by, created_at, updated_at";

const AUDIT_SKIP: &[&str] = &["id", "created_by", "created_at", "updated_at", "credit_balance"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    /// Normalised `<country code><number>`
    pub phone_number: String,
    pub national_id: String,
    pub img_url: Option<String>,
    pub address: Option<String>,
    /// Zero means no limit
    pub credit_limit: Decimal,
    /// Total still owed across credit invoices
    pub credit_balance: Decimal,
    pub credit_status: RecordStatus,
    pub status: CustomerStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub name: String,
    pub email: Option<String>,
    /// Already normalised
    pub phone_number: String,
    pub national_id: String,
    pub img_url: Option<String>,
    pub address: Option<String>,
    pub status: CustomerStatus,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCustomer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub img_url: Option<String>,
    pub address: Option<String>,
    pub credit_status: Option<RecordStatus>,
    pub status: Option<CustomerStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSort {
    Name,
    #[default]
    CreatedAt,
    CreditBalance,
}

impl SortField for CustomerSort {
    fn column(&self) -> &'static str {
        match self {
            CustomerSort::Name => "name",
            CustomerSort::CreatedAt => "created_at",
            CustomerSort::CreditBalance => "credit_balance",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Matches name, phone number or national id
    pub search: Option<String>,
    pub status: Option<CustomerStatus>,
    pub sort_by: Option<CustomerSort>,
    pub sort_order: Option<SortOrder>,
}

impl Customer {
    pub async fn create(pool: &PgPool, data: CreateCustomer) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO customers (name, email, phone_number, national_id, img_url, address, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Customer>(&sql)
            .bind(data.name.trim())
            .bind(clean_optional(data.email).map(|e| e.to_lowercase()))
            .bind(data.phone_number)
            .bind(data.national_id.trim())
            .bind(clean_optional(data.img_url))
            .bind(clean_optional(data.address))
            .bind(data.status)
            .bind(data.created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Looks up and locks the customer owning a phone number
    pub async fn lock_by_phone(
        conn: &mut PgConnection,
        phone_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone_number = $1 FOR UPDATE");
        sqlx::query_as::<_, Customer>(&sql)
            .bind(phone_number)
            .fetch_optional(conn)
            .await
    }

    /// Adds `delta` (negative to reduce) to the credit balance, never below zero
    pub async fn adjust_credit_balance(
        conn: &mut PgConnection,
        id: Uuid,
        delta: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE customers
            SET credit_balance = GREATEST(credit_balance + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Whether adding `amount` would take the balance past a positive limit
    pub fn would_exceed_limit(&self, amount: Decimal) -> bool {
        self.credit_limit > Decimal::ZERO && self.credit_balance + amount > self.credit_limit
    }

    pub fn merged(&self, patch: UpdateCustomer) -> Customer {
        Customer {
            name: patch.name.map(|n| n.trim().to_string()).unwrap_or_else(|| self.name.clone()),
            email: match patch.email {
                Some(e) => clean_optional(Some(e)).map(|e| e.to_lowercase()),
                None => self.email.clone(),
            },
            phone_number: patch.phone_number.unwrap_or_else(|| self.phone_number.clone()),
            national_id: patch
                .national_id
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| self.national_id.clone()),
            img_url: match patch.img_url {
                Some(u) => clean_optional(Some(u)),
                None => self.img_url.clone(),
            },
            address: match patch.address {
                Some(a) => clean_optional(Some(a)),
                None => self.address.clone(),
            },
            credit_status: patch.credit_status.unwrap_or(self.credit_status),
            status: patch.status.unwrap_or(self.status),
            ..self.clone()
        }
    }

    pub async fn update(
        pool: &PgPool,
        existing: &Customer,
        patch: UpdateCustomer,
        actor_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let merged = existing.merged(patch);
        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE customers
            SET name = $2, email = $3, phone_number = $4, national_id = $5, img_url = $6,
                address = $7, credit_status = $8, status = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Customer>(&sql)
            .bind(existing.id)
            .bind(&merged.name)
            .bind(&merged.email)
            .bind(&merged.phone_number)
            .bind(&merged.national_id)
            .bind(&merged.img_url)
            .bind(&merged.address)
            .bind(merged.credit_status)
            .bind(merged.status)
            .fetch_one(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Update,
                entity: "Customer",
                table_name: "customers",
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

    pub async fn delete(pool: &PgPool, existing: &Customer, actor_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Customer",
                table_name: "customers",
                record_id: existing.id,
                original: existing,
                updated: existing,
                skip_fields: AUDIT_SKIP,
                actor_id,
                other_details: &format!("Name: {}, Phone: {}", existing.name, existing.phone_number),
            },
        )
        .await?;

        tx.commit().await
    }

    pub async fn list(pool: &PgPool, params: &CustomerListParams) -> Result<Page<Self>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Desc),
        );

        const FILTER: &str = "($1::text IS NULL OR name ILIKE $1 OR phone_number ILIKE $1 OR national_id ILIKE $1) \
                              AND ($2::customer_status IS NULL OR status = $2)";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM customers WHERE {FILTER}"))
                .bind(&pattern)
                .bind(params.status)
                .fetch_one(pool)
                .await?;

        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE {FILTER} {order} LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Customer>(&sql)
            .bind(&pattern)
            .bind(params.status)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(limit: i64, balance: i64) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            name: "Otieno".into(),
            email: None,
            phone_number: "254712345678".into(),
            national_id: "12345678".into(),
            img_url: None,
            address: None,
            credit_limit: Decimal::from(limit),
            credit_balance: Decimal::from(balance),
            credit_status: RecordStatus::Active,
            status: CustomerStatus::Active,
            created_by: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_credit_limit() {
        assert!(!customer(0, 10_000).would_exceed_limit(Decimal::from(500)));
        assert!(!customer(1000, 400).would_exceed_limit(Decimal::from(600)));
        assert!(customer(1000, 400).would_exceed_limit(Decimal::from(601)));
    }

    #[test]
    fn test_merged_lowercases_email() {
        let merged = customer(0, 0).merged(UpdateCustomer {
            email: Some(" Otieno@Duka.Test ".into()),
            ..Default::default()
        });
        assert_eq!(merged.email.as_deref(), Some("otieno@duka.test"));
        assert_eq!(merged.phone_number, "254712345678");
    }
}
