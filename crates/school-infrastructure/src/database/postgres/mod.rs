//! PostgreSQL repository implementations

pub mod entity_repo_impl;
mod sql;

pub use entity_repo_impl::PgEntityRepository;
