//! # Duka API Server Library
//!
//! Router, configuration and HTTP error mapping for the Duka backend. The
//! business rules live in `duka-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `response`: Success envelope
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
