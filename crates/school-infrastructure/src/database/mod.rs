//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod ddl;
pub mod postgres;

pub use connection::{bootstrap_schema, create_pool};
pub use postgres::PgEntityRepository;
