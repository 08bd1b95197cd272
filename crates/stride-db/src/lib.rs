//! Catalog store for compiled training plans.
//!
//! PostgreSQL persistence via `sqlx`, with migrations embedded at compile
//! time from `crates/stride-db/migrations/`.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
