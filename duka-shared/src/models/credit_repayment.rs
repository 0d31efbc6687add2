/// Repayments against credit invoices

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::customer::Customer;
use crate::models::invoice::Invoice;
use crate::models::status::{PaymentMethod, RepaymentStatus, SaleType};
use crate::pricing::{apply_repayment, PricingError};

const REPAYMENT_COLUMNS: &str = "id, invoice_id, added_by, customer_phone_number, amount, \
    payment_date, transaction_code, credit_balance, payment_method, created_by, created_at, \
    updated_at, deleted_at, status";

const TRANSACTION_CODE_LENGTH: usize = 10;

#[derive(Error, Debug)]
pub enum RepaymentError {
    #[error("Invoice not found")]
    InvoiceNotFound,

    #[error("Only credit sales accept repayments")]
    NotCreditSale,

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditRepayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub added_by: Option<Uuid>,
    pub customer_phone_number: Option<String>,
    pub amount: Decimal,
    pub payment_date: DateTime<Utc>,
    pub transaction_code: Option<String>,
    /// Outstanding on the invoice after this payment
    pub credit_balance: Decimal,
    pub payment_method: PaymentMethod,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub status: RepaymentStatus,
}

#[derive(Debug, Clone)]
pub struct RecordRepayment {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    /// Generated when absent
    pub transaction_code: Option<String>,
    /// Defaults to now
    pub payment_date: Option<DateTime<Utc>>,
    pub added_by: Uuid,
}

/// Random upper-case alphanumeric reference for cash repayments
pub fn generate_transaction_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TRANSACTION_CODE_LENGTH)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

impl CreditRepayment {
    /// Records a repayment and updates the invoice and customer balances
    ///
    /// The invoice row is locked, so two repayments against the same
    /// invoice cannot both pass the outstanding-balance check.
    pub async fn record(
        pool: &PgPool,
        data: RecordRepayment,
    ) -> Result<(Self, Invoice), RepaymentError> {
        let mut tx = pool.begin().await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, cashier_id, sale_type, total_amount, paid_amount, sale_profit,
                   cash_balance, credit_balance, credit_due_date, customer_phone_number,
                   status, created_by, created_at, updated_at
            FROM invoices
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(data.invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepaymentError::InvoiceNotFound)?;

        if invoice.sale_type != SaleType::Credit {
            return Err(RepaymentError::NotCreditSale);
        }

        let outcome = apply_repayment(invoice.paid_amount, invoice.credit_balance, data.amount)?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET paid_amount = $2, credit_balance = $3, status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, cashier_id, sale_type, total_amount, paid_amount, sale_profit,
                      cash_balance, credit_balance, credit_due_date, customer_phone_number,
                      status, created_by, created_at, updated_at
            "#,
        )
        .bind(invoice.id)
        .bind(outcome.paid_amount)
        .bind(outcome.credit_balance)
        .bind(outcome.status)
        .fetch_one(&mut *tx)
        .await?;

        let transaction_code = data
            .transaction_code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(generate_transaction_code);

        let sql = format!(
            r#"
            INSERT INTO credit_repayments
                (invoice_id, added_by, customer_phone_number, amount, payment_date,
                 transaction_code, credit_balance, payment_method, created_by)
            VALUES ($1, $2, $3, $4, COALESCE($5, NOW()), $6, $7, $8, $2)
            RETURNING {REPAYMENT_COLUMNS}
            "#
        );
        let repayment = sqlx::query_as::<_, CreditRepayment>(&sql)
            .bind(invoice.id)
            .bind(data.added_by)
            .bind(&invoice.customer_phone_number)
            .bind(data.amount)
            .bind(data.payment_date)
            .bind(transaction_code)
            .bind(outcome.credit_balance)
            .bind(data.payment_method)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(phone) = &invoice.customer_phone_number {
            if let Some(customer) = Customer::lock_by_phone(&mut tx, phone).await? {
                Customer::adjust_credit_balance(&mut tx, customer.id, -data.amount).await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            invoice_id = %invoice.id,
            amount = %repayment.amount,
            outstanding = %invoice.credit_balance,
            "Credit repayment recorded"
        );
        Ok((repayment, invoice))
    }

    /// Repayments of one invoice, oldest first
    pub async fn list_for_invoice(pool: &PgPool, invoice_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {REPAYMENT_COLUMNS} FROM credit_repayments WHERE invoice_id = $1 ORDER BY payment_date, id"
        );
        sqlx::query_as::<_, CreditRepayment>(&sql)
            .bind(invoice_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_transaction_code() {
        let code = generate_transaction_code();
        assert_eq!(code.len(), TRANSACTION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(code, generate_transaction_code());
    }
}
