//! Generic entity repository trait (port)

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use school_shared::types::Pagination;

use crate::domain::{CallerContext, Record};
use crate::error::DomainError;
use crate::schema::EntityDef;

/// Row visibility applied by every repository read and write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantFilter {
    /// Only rows whose `tenant_id` matches
    Tenant(Uuid),
    /// No tenant predicate; used for tenant-global entities
    Unrestricted,
}

impl TenantFilter {
    /// Tenant-scoped entities are filtered by the caller's tenant, global ones are not
    pub fn for_entity(def: &EntityDef, caller: &CallerContext) -> Self {
        if def.is_tenant_scoped() {
            TenantFilter::Tenant(caller.tenant_id)
        } else {
            TenantFilter::Unrestricted
        }
    }

    /// Whether `record` of entity `def` is visible under this filter. Global
    /// entities carry no tenant, so the tenant predicate never applies to them.
    pub fn admits(&self, def: &EntityDef, record: &Record) -> bool {
        match self {
            TenantFilter::Tenant(tenant) if def.is_tenant_scoped() => record.belongs_to(*tenant),
            _ => true,
        }
    }
}

/// Paging plus equality filters on reference columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub filters: Vec<(&'static str, Uuid)>,
}

impl ListQuery {
    pub fn matches(&self, record: &Record) -> bool {
        self.filters
            .iter()
            .all(|(field, id)| record.reference(field) == Some(*id))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Record>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Storage port for every catalog entity.
///
/// Implementations must enforce that non-null references point at existing
/// rows, and must make `delete` atomic while honouring each incoming
/// relation's delete policy (`Restrict` fails with
/// `DomainError::ReferentialIntegrity` and deletes nothing).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityRepository: Send + Sync {
    async fn insert(&self, def: &EntityDef, record: &Record) -> Result<Record, DomainError>;

    async fn find(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<Option<Record>, DomainError>;

    async fn exists(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError>;

    async fn list(&self, def: &EntityDef, filter: TenantFilter, query: &ListQuery) -> Result<Page, DomainError>;

    /// Overwrites a visible row; `None` when no such row exists
    async fn update(&self, def: &EntityDef, record: &Record, filter: TenantFilter) -> Result<Option<Record>, DomainError>;

    /// `false` when no visible row matched
    async fn delete(&self, def: &EntityDef, id: Uuid, filter: TenantFilter) -> Result<bool, DomainError>;

    async fn ping(&self) -> Result<(), DomainError>;
}
