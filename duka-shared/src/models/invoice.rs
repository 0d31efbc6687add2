/// Invoices (orders) and their line items
///
/// An order is created in a single transaction that locks the referenced
/// product rows, prices the lines, writes the invoice and its details,
/// decrements stock and appends stock history. Any failure rolls all of it
/// back, so stock never goes negative and never drifts from the invoices.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE invoices (
///     id UUID PRIMARY KEY,
///     cashier_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     sale_type sale_type NOT NULL,
///     total_amount NUMERIC(20, 2) NOT NULL,
///     paid_amount NUMERIC(20, 2) NOT NULL,
///     sale_profit NUMERIC(20, 2) NOT NULL DEFAULT 0,
///     cash_balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
///     credit_balance NUMERIC(20, 2) NOT NULL DEFAULT 0,
///     credit_due_date DATE,
///     customer_phone_number VARCHAR(20),
///     status invoice_status NOT NULL DEFAULT 'UNPAID',
///     ...
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::{store_change_log, AuditAction, ChangeLog};
use crate::models::customer::Customer;
use crate::models::product::Product;
use crate::models::status::{InvoiceStatus, RecordStatus, SaleType};
use crate::models::stock_history::{NewStockChange, StockHistory};
use crate::pagination::{order_by, search_pattern, Page, PageRequest, SortField, SortOrder};
use crate::phone::parse_phone;
use crate::pricing::{price_lines, settle, LineRequest, PricingError};

const INVOICE_COLUMNS: &str = "id, cashier_id, sale_type, total_amount, paid_amount, sale_profit, \
    cash_balance, credit_balance, credit_due_date, customer_phone_number, status, created_by, \
    created_at, updated_at";

const DETAIL_COLUMNS: &str = "id, invoice_id, product_id, user_id, quantity, per_unit_price, \
    total_price, sale_type, created_by, created_at, updated_at, status";

/// Order creation failures
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyOrder,

    #[error("Invalid customer phone number")]
    InvalidPhone,

    #[error("Credit sale requires a valid customer phone number")]
    MissingPhone,

    #[error("Credit sale requires a due date")]
    MissingDueDate,

    #[error("Credit due date cannot be in the past")]
    DueDateInPast,

    #[error("Customer credit limit of {limit} would be exceeded (balance {balance}, adding {amount})")]
    CreditLimitExceeded {
        limit: Decimal,
        balance: Decimal,
        amount: Decimal,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub cashier_id: Uuid,
    pub sale_type: SaleType,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub sale_profit: Decimal,
    /// Change returned on a cash sale
    pub cash_balance: Decimal,
    /// Still owed on a credit sale
    pub credit_balance: Decimal,
    pub credit_due_date: Option<NaiveDate>,
    pub customer_phone_number: Option<String>,
    pub status: InvoiceStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoiceDetail {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub per_unit_price: Decimal,
    pub total_price: Decimal,
    pub sale_type: SaleType,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub status: RecordStatus,
}

/// Invoice row with the cashier's name for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoiceSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub invoice: Invoice,
    pub cashier_name: String,
    pub cashier_email: String,
}

/// Line item with the product it refers to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvoiceLine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub detail: InvoiceDetail,
    pub product_name: String,
    pub product_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceWithLines {
    #[serde(flatten)]
    pub invoice: InvoiceSummary,
    pub lines: Vec<InvoiceLine>,
}

/// A newly written order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceDetail>,
}

#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub sale_type: SaleType,
    pub items: Vec<LineRequest>,
    pub paid_amount: Decimal,
    /// As typed at the till; normalised before use
    pub customer_phone_number: Option<String>,
    pub credit_due_date: Option<NaiveDate>,
    pub cashier_id: Uuid,
    /// Country code used to normalise the phone number
    pub country_code: String,
}

/// Checks the sale-type rules that do not need the database
///
/// Returns the normalised phone number, if one was given.
pub fn check_order_terms(
    sale_type: SaleType,
    phone: Option<&str>,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
    country_code: &str,
) -> Result<Option<String>, OrderError> {
    let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => Some(parse_phone(raw, country_code).ok_or(OrderError::InvalidPhone)?),
        None => None,
    };

    if sale_type == SaleType::Credit {
        if phone.is_none() {
            return Err(OrderError::MissingPhone);
        }
        match due_date {
            None => return Err(OrderError::MissingDueDate),
            Some(date) if date < today => return Err(OrderError::DueDateInPast),
            Some(_) => {}
        }
    }

    Ok(phone)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSort {
    #[default]
    CreatedAt,
    TotalAmount,
}

impl SortField for InvoiceSort {
    fn column(&self) -> &'static str {
        match self {
            InvoiceSort::CreatedAt => "i.created_at",
            InvoiceSort::TotalAmount => "i.total_amount",
        }
    }

    fn tie_breaker(&self) -> &'static str {
        "i.id"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Matches cashier name, cashier email or sale type
    pub search: Option<String>,
    pub sale_type: Option<SaleType>,
    pub status: Option<InvoiceStatus>,
    pub sort_by: Option<InvoiceSort>,
    pub sort_order: Option<SortOrder>,
}

impl Invoice {
    /// Creates an order
    ///
    /// # Errors
    ///
    /// - [`OrderError::Pricing`] for missing, inactive or under-stocked
    ///   products and for payments that break the sale-type rules
    /// - [`OrderError::CreditLimitExceeded`] when the buyer is a known
    ///   customer with a limit the outstanding amount would pass
    /// - phone and due-date errors from [`check_order_terms`]
    pub async fn create_order(pool: &PgPool, order: CreateOrder) -> Result<OrderReceipt, OrderError> {
        if order.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let phone = check_order_terms(
            order.sale_type,
            order.customer_phone_number.as_deref(),
            order.credit_due_date,
            Utc::now().date_naive(),
            &order.country_code,
        )?;

        let mut tx = pool.begin().await?;

        let ids: Vec<Uuid> = order.items.iter().map(|i| i.product_id).collect();
        let products = Product::lock_for_sale(&mut tx, &ids).await?;

        let lines = price_lines(&order.items, &products)?;
        let settlement = settle(order.sale_type, &lines, order.paid_amount)?;

        let customer = match &phone {
            Some(phone) => Customer::lock_by_phone(&mut tx, phone).await?,
            None => None,
        };

        if let Some(customer) = &customer {
            if settlement.credit_balance > Decimal::ZERO
                && customer.would_exceed_limit(settlement.credit_balance)
            {
                return Err(OrderError::CreditLimitExceeded {
                    limit: customer.credit_limit,
                    balance: customer.credit_balance,
                    amount: settlement.credit_balance,
                });
            }
        }

        let due_date = match order.sale_type {
            SaleType::Credit => order.credit_due_date,
            SaleType::Cash => None,
        };

        let sql = format!(
            r#"
            INSERT INTO invoices
                (cashier_id, sale_type, total_amount, paid_amount, sale_profit, cash_balance,
                 credit_balance, credit_due_date, customer_phone_number, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $1)
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(order.cashier_id)
            .bind(order.sale_type)
            .bind(settlement.total_amount)
            .bind(settlement.paid_amount)
            .bind(settlement.sale_profit)
            .bind(settlement.cash_balance)
            .bind(settlement.credit_balance)
            .bind(due_date)
            .bind(&phone)
            .bind(settlement.status)
            .fetch_one(&mut *tx)
            .await?;

        let detail_sql = format!(
            r#"
            INSERT INTO invoice_details
                (invoice_id, product_id, user_id, quantity, per_unit_price, total_price, sale_type, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $3)
            RETURNING {DETAIL_COLUMNS}
            "#
        );

        let mut details = Vec::with_capacity(lines.len());
        for line in &lines {
            let detail = sqlx::query_as::<_, InvoiceDetail>(&detail_sql)
                .bind(invoice.id)
                .bind(line.product_id)
                .bind(order.cashier_id)
                .bind(line.quantity)
                .bind(line.per_unit_price)
                .bind(line.total_price)
                .bind(order.sale_type)
                .fetch_one(&mut *tx)
                .await?;
            details.push(detail);

            if !Product::decrement_stock(&mut tx, line.product_id, line.quantity).await? {
                let name = products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                return Err(PricingError::InsufficientStock {
                    name,
                    available: line.previous_stock,
                    requested: line.quantity,
                }
                .into());
            }

            StockHistory::record(
                &mut tx,
                NewStockChange {
                    product_id: line.product_id,
                    previous_stock: line.previous_stock,
                    new_stock: line.new_stock,
                    changed_by: order.cashier_id,
                    reason: order.sale_type.stock_change_reason().to_string(),
                    note: Some(format!("Invoice {}", invoice.id)),
                },
            )
            .await?;
        }

        if let Some(customer) = &customer {
            if settlement.credit_balance > Decimal::ZERO {
                Customer::adjust_credit_balance(&mut tx, customer.id, settlement.credit_balance)
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            invoice_id = %invoice.id,
            sale_type = order.sale_type.as_str(),
            total = %invoice.total_amount,
            lines = details.len(),
            "Order created"
        );

        Ok(OrderReceipt {
            invoice,
            lines: details,
        })
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Invoice, cashier and line items with product names
    pub async fn find_with_lines(pool: &PgPool, id: Uuid) -> Result<Option<InvoiceWithLines>, sqlx::Error> {
        let invoice = sqlx::query_as::<_, InvoiceSummary>(&summary_sql("WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT d.id, d.invoice_id, d.product_id, d.user_id, d.quantity, d.per_unit_price,
                   d.total_price, d.sale_type, d.created_by, d.created_at, d.updated_at, d.status,
                   p.name AS product_name, p.code AS product_code
            FROM invoice_details d
            JOIN products p ON p.id = d.product_id
            WHERE d.invoice_id = $1
            ORDER BY d.created_at, d.id
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        Ok(Some(InvoiceWithLines { invoice, lines }))
    }

    /// Newest first unless another sort is requested
    pub async fn list(pool: &PgPool, params: &InvoiceListParams) -> Result<Page<InvoiceSummary>, sqlx::Error> {
        let request = PageRequest::new(params.page, params.page_size);
        let pattern = search_pattern(params.search.as_deref());
        let order = order_by(
            params.sort_by.unwrap_or_default(),
            params.sort_order.unwrap_or(SortOrder::Desc),
        );

        const FILTER: &str = "WHERE ($1::text IS NULL OR u.name ILIKE $1 OR u.email ILIKE $1 OR i.sale_type::text ILIKE $1) \
            AND ($2::sale_type IS NULL OR i.sale_type = $2) \
            AND ($3::invoice_status IS NULL OR i.status = $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM invoices i JOIN users u ON u.id = i.cashier_id {FILTER}"
        ))
        .bind(&pattern)
        .bind(params.sale_type)
        .bind(params.status)
        .fetch_one(pool)
        .await?;

        let sql = format!("{} {order} LIMIT $4 OFFSET $5", summary_sql(FILTER));
        let rows = sqlx::query_as::<_, InvoiceSummary>(&sql)
            .bind(&pattern)
            .bind(params.sale_type)
            .bind(params.status)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(pool)
            .await?;

        Ok(Page::new(rows, total, request))
    }

    /// Deletes the invoice and its lines
    ///
    /// Stock is not returned to the shelf. Whatever a credit sale still owes
    /// is taken off the customer's balance. Returns false if there was no
    /// such invoice.
    pub async fn delete(pool: &PgPool, id: Uuid, actor_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let sql = format!("DELETE FROM invoices WHERE id = $1 RETURNING {INVOICE_COLUMNS}");
        let deleted = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(invoice) = deleted else {
            return Ok(false);
        };

        if invoice.sale_type == SaleType::Credit && invoice.credit_balance > Decimal::ZERO {
            if let Some(phone) = invoice.customer_phone_number.as_deref() {
                if let Some(customer) = Customer::lock_by_phone(&mut tx, phone).await? {
                    Customer::adjust_credit_balance(&mut tx, customer.id, -invoice.credit_balance).await?;
                    tracing::info!(
                        invoice_id = %invoice.id,
                        customer_id = %customer.id,
                        released = %invoice.credit_balance,
                        "Outstanding credit released"
                    );
                }
            }
        }

        store_change_log(
            &mut tx,
            ChangeLog {
                action: AuditAction::Delete,
                entity: "Invoice",
                table_name: "invoices",
                record_id: invoice.id,
                original: &invoice,
                updated: &invoice,
                skip_fields: &[],
                actor_id,
                other_details: &format!(
                    "Sale type: {}, Total: {}",
                    invoice.sale_type.as_str(),
                    invoice.total_amount
                ),
            },
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn summary_sql(filter: &str) -> String {
    format!(
        r#"
        SELECT i.id, i.cashier_id, i.sale_type, i.total_amount, i.paid_amount, i.sale_profit,
               i.cash_balance, i.credit_balance, i.credit_due_date, i.customer_phone_number,
               i.status, i.created_by, i.created_at, i.updated_at,
               u.name AS cashier_name, u.email AS cashier_email
        FROM invoices i
        JOIN users u ON u.id = i.cashier_id
        {filter}
        "#
    )
}
