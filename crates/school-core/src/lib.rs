//! # School Core
//! 
//! Schema catalog, record model, repository port, and the generic entity service.

pub mod schema;
pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

pub use schema::{Catalog, DeletePolicy, EntityDef, FieldDef, FieldKind, Module, Relation, TenantScope};
pub use domain::*;
pub use error::DomainError;
