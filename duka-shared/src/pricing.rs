/// Order line pricing and payment settlement
///
/// Everything here is arithmetic on values already loaded from the database.
/// [`crate::models::invoice::Invoice::create_order`] locks the product rows,
/// calls [`price_lines`] and [`settle`], then writes the results.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::models::status::{InvoiceStatus, RecordStatus, SaleType};

/// Pricing rule violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Selling price ({selling}) must be greater than or equal to purchase price ({purchase})")]
    SellingBelowPurchase { purchase: Decimal, selling: Decimal },

    #[error("Product {0} appears more than once in the order")]
    DuplicateProduct(Uuid),

    #[error("Some products not found")]
    ProductsNotFound(Vec<Uuid>),

    #[error("Product {name} is not active")]
    InactiveProduct { name: String },

    #[error("Product {name} only has {available} in stock, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Cash sale must be paid in full: total {total}, paid {paid}")]
    CashUnderpaid { total: Decimal, paid: Decimal },

    #[error("Cash sale requires a paid amount greater than zero")]
    CashNotPaid,

    #[error("Credit sale paid amount ({paid}) must be less than the total ({total})")]
    CreditFullyPaid { total: Decimal, paid: Decimal },

    #[error("Amount must not be negative")]
    NegativeAmount,

    #[error("Repayment of {amount} exceeds the outstanding balance of {outstanding}")]
    RepaymentExceedsBalance { outstanding: Decimal, amount: Decimal },

    #[error("Invoice has no outstanding balance")]
    NothingOutstanding,
}

/// Profit per unit, rejecting a selling price below the purchase price
pub fn expected_profit(purchase: Decimal, selling: Decimal) -> Result<Decimal, PricingError> {
    if selling < purchase {
        return Err(PricingError::SellingBelowPurchase { purchase, selling });
    }
    Ok(selling - purchase)
}

/// A requested order line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// The product columns pricing needs, read under a row lock
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    pub available_stock: i32,
    pub status: RecordStatus,
}

/// A priced order line with the stock movement it causes
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub per_unit_price: Decimal,
    pub total_price: Decimal,
    pub profit: Decimal,
    pub previous_stock: i32,
    pub new_stock: i32,
}

/// Prices each requested line against the locked product rows
///
/// Lines keep the request order. Fails on the first duplicate, missing,
/// inactive or under-stocked product.
pub fn price_lines(
    lines: &[LineRequest],
    products: &[ProductSnapshot],
) -> Result<Vec<PricedLine>, PricingError> {
    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(PricingError::InvalidQuantity);
        }
        if !seen.insert(line.product_id) {
            return Err(PricingError::DuplicateProduct(line.product_id));
        }
    }

    let by_id: HashMap<Uuid, &ProductSnapshot> = products.iter().map(|p| (p.id, p)).collect();

    let missing: Vec<Uuid> = lines
        .iter()
        .map(|l| l.product_id)
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(PricingError::ProductsNotFound(missing));
    }

    lines
        .iter()
        .map(|line| {
            let product = by_id[&line.product_id];

            if product.status != RecordStatus::Active {
                return Err(PricingError::InactiveProduct {
                    name: product.name.clone(),
                });
            }

            if line.quantity > product.available_stock {
                return Err(PricingError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.available_stock,
                    requested: line.quantity,
                });
            }

            let quantity = Decimal::from(line.quantity);
            Ok(PricedLine {
                product_id: product.id,
                quantity: line.quantity,
                per_unit_price: product.selling_price,
                total_price: product.selling_price * quantity,
                profit: (product.selling_price - product.purchase_price) * quantity,
                previous_stock: product.available_stock,
                new_stock: product.available_stock - line.quantity,
            })
        })
        .collect()
}

/// Invoice amounts after payment
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub sale_profit: Decimal,
    /// Change handed back on a cash sale
    pub cash_balance: Decimal,
    /// Amount still owed on a credit sale
    pub credit_balance: Decimal,
    pub status: InvoiceStatus,
}

/// Applies the payment rules of the sale type to the priced lines
///
/// Cash sales must cover the total and record the change. Credit sales must
/// leave something owing; nothing paid is `UNPAID`, a deposit is
/// `PARTIALLY_PAID`.
pub fn settle(
    sale_type: SaleType,
    lines: &[PricedLine],
    paid_amount: Decimal,
) -> Result<Settlement, PricingError> {
    if paid_amount < Decimal::ZERO {
        return Err(PricingError::NegativeAmount);
    }

    let total_amount: Decimal = lines.iter().map(|l| l.total_price).sum();
    let sale_profit: Decimal = lines.iter().map(|l| l.profit).sum();

    match sale_type {
        SaleType::Cash => {
            if paid_amount.is_zero() {
                return Err(PricingError::CashNotPaid);
            }
            if paid_amount < total_amount {
                return Err(PricingError::CashUnderpaid {
                    total: total_amount,
                    paid: paid_amount,
                });
            }
            Ok(Settlement {
                total_amount,
                paid_amount,
                sale_profit,
                cash_balance: paid_amount - total_amount,
                credit_balance: Decimal::ZERO,
                status: InvoiceStatus::Paid,
            })
        }
        SaleType::Credit => {
            if paid_amount >= total_amount {
                return Err(PricingError::CreditFullyPaid {
                    total: total_amount,
                    paid: paid_amount,
                });
            }
            let status = if paid_amount.is_zero() {
                InvoiceStatus::Unpaid
            } else {
                InvoiceStatus::PartiallyPaid
            };
            Ok(Settlement {
                total_amount,
                paid_amount,
                sale_profit,
                cash_balance: Decimal::ZERO,
                credit_balance: total_amount - paid_amount,
                status,
            })
        }
    }
}

/// Invoice amounts after a credit repayment
#[derive(Debug, Clone, PartialEq)]
pub struct RepaymentOutcome {
    pub paid_amount: Decimal,
    pub credit_balance: Decimal,
    pub status: InvoiceStatus,
}

/// Applies a repayment to an invoice's outstanding balance
pub fn apply_repayment(
    paid_amount: Decimal,
    outstanding: Decimal,
    amount: Decimal,
) -> Result<RepaymentOutcome, PricingError> {
    if outstanding <= Decimal::ZERO {
        return Err(PricingError::NothingOutstanding);
    }
    if amount <= Decimal::ZERO {
        return Err(PricingError::NegativeAmount);
    }
    if amount > outstanding {
        return Err(PricingError::RepaymentExceedsBalance { outstanding, amount });
    }

    let credit_balance = outstanding - amount;
    Ok(RepaymentOutcome {
        paid_amount: paid_amount + amount,
        credit_balance,
        status: if credit_balance.is_zero() {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        },
    })
}
