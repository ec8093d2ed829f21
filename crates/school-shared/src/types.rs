//! Common types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub type EntityId = Uuid;

pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// Clamps out-of-range input instead of rejecting it
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

/// Audit quadruple carried by every record.
///
/// Populated by the entity service, never taken from request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFields {
    pub created_on: Option<DateTime<Utc>>,
    pub created_by: Option<EntityId>,
    pub updated_on: Option<DateTime<Utc>>,
    pub updated_by: Option<EntityId>,
}

impl AuditFields {
    pub fn created(by: EntityId) -> Self {
        Self {
            created_on: Some(Utc::now()),
            created_by: Some(by),
            updated_on: None,
            updated_by: None,
        }
    }

    pub fn touch(&mut self, by: EntityId) {
        self.updated_on = Some(Utc::now());
        self.updated_by = Some(by);
    }
}
