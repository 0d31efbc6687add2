/// Products and their stock levels
///
/// A product belongs to one category and one unit. Prices are `NUMERIC(20,2)`
/// and the selling price may never fall below the purchase price; the
/// difference is stored as `expected_profit`. Every stock change writes a
/// [`StockHistory`] row in the same transaction.
///
/// # Example
///
/// ```no_run
/// use duka_shared::models::product::{CreateProduct, Product};
/// use duka_shared::models::status::RecordStatus;
/// use rust_decimal::Decimal;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, category_id: Uuid, unit_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let product = Product::create(&pool, CreateProduct {
///     code: "mf-001".into(),
///     name: "maize flour 2kg".into(),
///     description: None,
///     category_id,
///     unit_id,
///     purchase_price: Decimal::new(18000, 2),
///     selling_price: Decimal::new(21000, 2),
///     available_stock: 40,
///     minimum_stock: 5,
///     image_url: None,
///     status: RecordStatus::Active,
///     created_by: user_id,
/// }).await?;
///
/// assert_eq!(product.code, "MF-001");
/// assert_eq!(product.expected_profit, Decimal::new(3000, 2));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::models::status::RecordStatus;
use crate::models::stock_history::{
    NewStockChange, StockHistory, REASON_NEW_STOCK, REASON_PRODUCT_UPDATE,
};
use crate::models::NamedOption;
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};
use crate::pricing::{expected_profit, PricingError, ProductSnapshot};
use crate::text::{capitalize, clean_optional, upper_code};

const PRODUCT_COLUMNS: &str = "id, code, name, description, category_id, unit_id, \
    purchase_price, selling_price, expected_profit, available_stock, minimum_stock, \
    image_url, created_by, created_at, updated_at, status";

const JOINED_COLUMNS: &str = "p.id, p.code, p.name, p.description, p.category_id, p.unit_id, \
    p.purchase_price, p.selling_price, p.expected_profit, p.available_stock, p.minimum_stock, \
    p.image_url, p.created_by, p.created_at, p.updated_at, p.status, \
    c.name AS category_name, u.name AS unit_name, u.acronym AS unit_acronym";

const JOINS: &str = "FROM products p \
    JOIN categories c ON c.id = p.category_id \
    JOIN units u ON u.id = p.unit_id";

const AUDIT_SKIP: &[&str] = &["id", "created_by", "created_at", "updated_at", "expected_profit"];

/// Product and stock errors
#[derive(Error, Debug)]
pub enum StockError {
    #[error("Product not found")]
    NotFound,

    #[error("Stock cannot be negative")]
    NegativeStock,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    /// Upper-case, unique
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    /// `selling_price - purchase_price`
    pub expected_profit: Decimal,
    pub available_stock: i32,
    /// Restock threshold; at or below it the product counts as low stock
    pub minimum_stock: i32,
    pub image_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: RecordStatus,
}

/// A product with its category and unit names
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductWithRefs {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: String,
    pub unit_name: String,
    pub unit_acronym: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub available_stock: i32,
    pub minimum_stock: i32,
    pub image_url: Option<String>,
    pub status: RecordStatus,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub available_stock: Option<i32>,
    pub minimum_stock: Option<i32>,
    pub image_url: Option<String>,
    pub status: Option<RecordStatus>,
}

/// Result of a direct stock adjustment
#[derive(Debug, Clone)]
pub enum StockAdjustment {
    /// Requested level equals the current level; nothing written
    Unchanged(Product),
    Updated(Product),
}

impl StockAdjustment {
    pub fn product(&self) -> &Product {
        match self {
            StockAdjustment::Unchanged(p) | StockAdjustment::Updated(p) => p,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
    SellingPrice,
}

impl SortField for ProductSort {
    fn column(&self) -> &'static str {
        match self {
            ProductSort::Name => "p.name",
            ProductSort::CreatedAt => "p.created_at",
            ProductSort::UpdatedAt => "p.updated_at",
            ProductSort::SellingPrice => "p.selling_price",
        }
    }

    fn tie_breaker(&self) -> &'static str {
        "p.id"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Matches name or code
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
    pub category_id: Option<Uuid>,
    /// Lower bound on selling price
    pub min_price: Option<Decimal>,
    /// Upper bound on selling price
    pub max_price: Option<Decimal>,
    /// `true`: stock above zero, `false`: out of stock
    pub in_stock: Option<bool>,
    pub sort_by: Option<ProductSort>,
    pub sort_order: Option<SortOrder>,
}

impl Product {
    /// Inserts the product and its opening stock-history row
    ///
    /// # Errors
    ///
    /// [`StockError::Pricing`] when the selling price is below the purchase
    /// price, [`StockError::Database`] for constraint violations such as a
    /// duplicate code or unknown category.
    pub async fn create(pool: &PgPool, data: CreateProduct) -> Result<Self, StockError> {
        let profit = expected_profit(data.purchase_price, data.selling_price)?;
        if data.available_stock < 0 || data.minimum_stock < 0 {
            return Err(StockError::NegativeStock);
        }

        let mut tx = pool.begin().await?;

        let sql = format!(
            r#"
            INSERT INTO products
                (code, name, description, category_id, unit_id, purchase_price, selling_price,
                 expected_profit, available_stock, minimum_stock, image_url, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(upper_code(&data.code))
            .bind(capitalize(&data.name))
            .bind(clean_optional(data.description))
            .bind(data.category_id)
            .bind(data.unit_id)
            .bind(data.purchase_price)
            .bind(data.selling_price)
            .bind(profit)
            .bind(data.available_stock)
            .bind(data.minimum_stock)
            .bind(clean_optional(data.image_url))
            .bind(data.status)
            .bind(data.created_by)
            .fetch_one(&mut *tx)
            .await?;

        StockHistory::record(
            &mut tx,
            NewStockChange {
                product_id: product.id,
                previous_stock: 0,
                new_stock: product.available_stock,
                changed_by: data.created_by,
                reason: REASON_NEW_STOCK.to_string(),
                note: None,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, code = %product.code, "Product created");
        Ok(product)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_refs(pool: &PgPool, id: Uuid) -> Result<Option<ProductWithRefs>, sqlx::Error> {
        let sql = format!("SELECT {JOINED_COLUMNS} {JOINS} WHERE p.id = $1");
        sqlx::query_as::<_, ProductWithRefs>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Applies `patch` on top of the stored row
    ///
    /// The price rule is checked on the merged values, so changing only one
    /// of the two prices cannot break it.
    pub fn merged(&self, patch: UpdateProduct) -> Result<Product, StockError> {
        let purchase_price = patch.purchase_price.unwrap_or(self.purchase_price);
        let selling_price = patch.selling_price.unwrap_or(self.selling_price);
        let expected_profit = expected_profit(purchase_price, selling_price)?;

        let available_stock = patch.available_stock.unwrap_or(self.available_stock);
        let minimum_stock = patch.minimum_stock.unwrap_or(self.minimum_stock);
        if available_stock < 0 || minimum_stock < 0 {
            return Err(StockError::NegativeStock);
        }

        Ok(Product {
            code: patch.code.map(|c| upper_code(&c)).unwrap_or_else(|| self.code.clone()),
            name: patch.name.map(|n| capitalize(&n)).unwrap_or_else(|| self.name.clone()),
            description: match patch.description {
                Some(d) => clean_optional(Some(d)),
                None => self.description.clone(),
            },
            category_id: patch.category_id.unwrap_or(self.category_id),
            unit_id: patch.unit_id.unwrap_or(self.unit_id),
            purchase_price,
            selling_price,
            expected_profit,
            available_stock,
            minimum_stock,
            image_url: match patch.image_url {
                Some(url) => clean_optional(Some(url)),
                None => self.image_url.clone(),
            },
            status: patch.status.unwrap_or(self.status),
            ..self.clone()
        })
    }

    /// Writes a partial update
    ///
    /// The patch is merged onto the row as locked inside the transaction, so
    /// a sale committed after the caller last read the product is kept. A
    /// changed stock level is logged to stock history, and every changed
    /// field to the events table, all in one transaction.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: UpdateProduct,
        actor_id: Uuid,
    ) -> Result<Self, StockError> {
        let mut tx = pool.begin().await?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let existing = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StockError::NotFound)?;
        let merged = existing.merged(patch)?;

        let sql = format!(
            r#"
            UPDATE products
            SET code = $2, name = $3, description = $4, category_id = $5, unit_id = $6,
                purchase_price = $7, selling_price = $8, expected_profit = $9,
                available_stock = $10, minimum_stock = $11, image_url = $12, status = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(existing.id)
            .bind(&merged.code)
            .bind(&merged.name)
            .bind(&merged.description)
            .bind(merged.category_id)
            .bind(merged.unit_id)
            .bind(merged.purchase_price)
            .bind(merged.selling_price)
            .bind(merged.expected_profit)
            .bind(merged.available_stock)
            .bind(merged.minimum_stock)
            .bind(&merged.image_url)
            .bind(merged.status)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StockError::NotFound)?;

        if updated.available_stock != existing.available_stock {
            StockHistory::record(
                &mut tx,
                NewStockChange {
                    product_id: updated.id,
                    previous_stock: existing.available_stock,
                    new_stock: updated.available_stock,
                    changed_by: actor_id,
                    reason: REASON_PRODUCT_UPDATE.to_string(),
                    note: None,
                },
            )
            .await?;
        }

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Update,
                entity: "Product",
                table_name: "products",
                record_id: existing.id,
                original: &existing,
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

    /// Sets the stock level to `new_stock`
    ///
    /// The row is locked for the duration, so a concurrent sale cannot slip
    /// between the read and the write. Equal levels are a no-op.
    pub async fn set_stock(
        pool: &PgPool,
        id: Uuid,
        new_stock: i32,
        reason: &str,
        note: Option<String>,
        actor_id: Uuid,
    ) -> Result<StockAdjustment, StockError> {
        if new_stock < 0 {
            return Err(StockError::NegativeStock);
        }

        let mut tx = pool.begin().await?;

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let existing = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StockError::NotFound)?;

        if existing.available_stock == new_stock {
            return Ok(StockAdjustment::Unchanged(existing));
        }

        let sql = format!(
            "UPDATE products SET available_stock = $2, updated_at = NOW() WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(new_stock)
            .fetch_one(&mut *tx)
            .await?;

        let note = clean_optional(note);
        StockHistory::record(
            &mut tx,
            NewStockChange {
                product_id: id,
                previous_stock: existing.available_stock,
                new_stock,
                changed_by: actor_id,
                reason: reason.trim().to_string(),
                note: note.clone(),
            },
        )
        .await?;

        let details = match note {
            Some(note) => format!("Reason: {}. Note: {}", reason.trim(), note),
            None => format!("Reason: {}", reason.trim()),
        };
        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Update,
                entity: "Product stock",
                table_name: "products",
                record_id: id,
                original: &existing,
                updated: &updated,
                skip_fields: AUDIT_SKIP,
                actor_id,
                other_details: &details,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %id,
            previous_stock = existing.available_stock,
            new_stock,
            "Product stock adjusted"
        );
        Ok(StockAdjustment::Updated(updated))
    }

    pub async fn delete(pool: &PgPool, existing: &Product, actor_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Product",
                table_name: "products",
                record_id: existing.id,
                original: existing,
                updated: existing,
                skip_fields: AUDIT_SKIP,
                actor_id,
                other_details: &format!("Code: {}, Name: {}", existing.code, existing.name),
            },
        )
        .await?;

        tx.commit().await
    }

    /// Oldest first unless another sort is requested
    pub async fn list(
        pool: &PgPool,
        params: &ProductListParams,
    ) -> Result<Page<ProductWithRefs>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Asc),
        );

        const FILTER: &str = "($1::text IS NULL OR p.name ILIKE $1 OR p.code ILIKE $1) \
            AND ($2::record_status IS NULL OR p.status = $2) \
            AND ($3::uuid IS NULL OR p.category_id = $3) \
            AND ($4::numeric IS NULL OR p.selling_price >= $4) \
            AND ($5::numeric IS NULL OR p.selling_price <= $5) \
            AND ($6::boolean IS NULL OR (p.available_stock > 0) = $6)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {JOINS} WHERE {FILTER}"))
            .bind(&pattern)
            .bind(params.status)
            .bind(params.category_id)
            .bind(params.min_price)
            .bind(params.max_price)
            .bind(params.in_stock)
            .fetch_one(pool)
            .await?;

        let sql = format!(
            "SELECT {JOINED_COLUMNS} {JOINS} WHERE {FILTER} {order} LIMIT $7 OFFSET $8"
        );
        let rows = sqlx::query_as::<_, ProductWithRefs>(&sql)
            .bind(&pattern)
            .bind(params.status)
            .bind(params.category_id)
            .bind(params.min_price)
            .bind(params.max_price)
            .bind(params.in_stock)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }

    pub async fn options(pool: &PgPool) -> Result<Vec<NamedOption>, sqlx::Error> {
        sqlx::query_as::<_, NamedOption>("SELECT id, name FROM products ORDER BY name")
            .fetch_all(pool)
            .await
    }

    /// Products for a cart, in name order
    pub async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<ProductWithRefs>, sqlx::Error> {
        let sql = format!("SELECT {JOINED_COLUMNS} {JOINS} WHERE p.id = ANY($1) ORDER BY p.name");
        sqlx::query_as::<_, ProductWithRefs>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Products at or below their minimum stock, lowest stock first
    pub async fn low_stock(pool: &PgPool) -> Result<Vec<ProductWithRefs>, sqlx::Error> {
        let sql = format!(
            "SELECT {JOINED_COLUMNS} {JOINS} WHERE p.available_stock <= p.minimum_stock \
             ORDER BY p.available_stock ASC, p.name ASC"
        );
        sqlx::query_as::<_, ProductWithRefs>(&sql).fetch_all(pool).await
    }

    pub async fn low_stock_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE available_stock <= minimum_stock")
            .fetch_one(pool)
            .await
    }

    /// Locks the given product rows until the transaction ends
    ///
    /// Rows are locked in id order so two orders over the same products
    /// cannot deadlock.
    pub async fn lock_for_sale(
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<Vec<ProductSnapshot>, sqlx::Error> {
        sqlx::query_as::<_, ProductSnapshot>(
            r#"
            SELECT id, name, purchase_price, selling_price, available_stock, status
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }

    /// Subtracts `quantity` unless that would take stock below zero
    ///
    /// Returns false when the guard rejected the update.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        id: Uuid,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET available_stock = available_stock - $2, updated_at = NOW()
            WHERE id = $1 AND available_stock >= $2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
