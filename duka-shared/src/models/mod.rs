/// Database models for Duka
///
/// One module per table, each holding the row type and its SQL operations.
///
/// # Models
///
/// - `user`: Staff accounts and roles
/// - `category`, `unit`: Catalogue reference data
/// - `product`: Products, prices and stock levels
/// - `stock_history`: Append-only stock movements
/// - `invoice`: Orders and their line items
/// - `customer`, `credit_limit`, `credit_repayment`: Credit sales bookkeeping
/// - `expense`: Shop expenses
/// - `event`: Audit log
/// - `status`: Enumerations shared by the tables above
///
/// # Example
///
/// ```no_run
/// use duka_shared::models::category::{Category, CreateCategory};
/// use duka_shared::models::status::RecordStatus;
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let category = Category::create(&pool, CreateCategory {
///     name: "cereals".to_string(),
///     description: None,
///     status: RecordStatus::Active,
///     created_by: user_id,
/// }).await?;
///
/// assert_eq!(category.name, "Cereals");
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod category;
pub mod credit_limit;
pub mod credit_repayment;
pub mod customer;
pub mod event;
pub mod expense;
pub mod invoice;
pub mod product;
pub mod status;
pub mod stock_history;
pub mod unit;
pub mod user;

/// `{id, name}` pair used to fill select inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NamedOption {
    pub id: Uuid,
    pub name: String,
}
