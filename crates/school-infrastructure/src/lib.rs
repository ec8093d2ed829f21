//! # School Infrastructure
//! 
//! PostgreSQL adapter for the entity repository port.

pub mod database;

pub use database::{bootstrap_schema, create_pool, PgEntityRepository};
