/// API route handlers
///
/// One module per resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, token refresh, profile
/// - `users`: Staff account management
/// - `categories`, `units`: Catalogue reference data
/// - `products`: Products, stock adjustments and stock history
/// - `orders`: Cash and credit sales, repayments
/// - `customers`: Credit customers and their limits
/// - `expenses`: Shop expenses
/// - `events`: Audit log
/// - `dashboard`: Sales metrics and stock reports

pub mod auth;
pub mod categories;
pub mod customers;
pub mod dashboard;
pub mod events;
pub mod expenses;
pub mod health;
pub mod orders;
pub mod products;
pub mod units;
pub mod users;
