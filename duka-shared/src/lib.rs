//! # Duka Shared Library
//!
//! This crate contains the data layer and business rules shared by the Duka
//! API server and its tooling.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their SQL operations
//! - `auth`: Password hashing, JWT tokens, request auth context
//! - `pricing`: Order line pricing and payment settlement
//! - `dashboard`: Daily sales metrics and stock reports
//! - `audit`: Change-log diffing for the events table
//! - `pagination`: Paging, sorting and search helpers for list queries
//! - `phone`: Customer phone number normalisation
//! - `text`: Name and code formatting

pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod pagination;
pub mod phone;
pub mod pricing;
pub mod text;

/// Current version of the Duka shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
