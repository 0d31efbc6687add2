/// Database layer for Duka
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Schema migrations embedded from `migrations/`
///
/// Table models live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
