/// Enumerations shared by several tables
///
/// Each enum maps to a PostgreSQL enum type created by the initial
/// migration, and serializes to the same upper-case label in JSON.

use serde::{Deserialize, Serialize};

/// User role, checked by admin-only routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Cashier,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Cashier => "CASHIER",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Soft active flag carried by catalogue rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Inactive => "INACTIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    Cash,
    Credit,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::Cash => "CASH",
            SaleType::Credit => "CREDIT",
        }
    }

    /// `change_reason` written to stock history for each sold line
    pub fn stock_change_reason(&self) -> &'static str {
        match self {
            SaleType::Cash => "CASH SALE",
            SaleType::Credit => "CREDIT SALE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    PartiallyPaid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Unpaid => "UNPAID",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "customer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerStatus {
    #[default]
    Active,
    Pending,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "repayment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Refunded,
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_labels_match_database_labels() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap(),
            "\"PARTIALLY_PAID\""
        );
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"MOBILE_MONEY\"").unwrap(),
            PaymentMethod::MobileMoney
        );
        assert_eq!(InvoiceStatus::PartiallyPaid.as_str(), "PARTIALLY_PAID");
    }

    #[test]
    fn test_stock_change_reason() {
        assert_eq!(SaleType::Cash.stock_change_reason(), "CASH SALE");
        assert_eq!(SaleType::Credit.stock_change_reason(), "CREDIT SALE");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(RecordStatus::default(), RecordStatus::Active);
        assert_eq!(RepaymentStatus::default(), RepaymentStatus::Completed);
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Cashier.is_admin());
    }
}
