//! Domain errors

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One rejected field in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn describe(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: Uuid },

    #[error("Validation error: {}", describe(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: Uuid) -> Self {
        DomainError::NotFound {
            entity: entity.to_string(),
            id,
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![FieldViolation::new(field, message)])
    }
}
