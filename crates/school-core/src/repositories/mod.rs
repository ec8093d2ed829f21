//! Repository traits (ports) and the in-memory adapter

pub mod entity_repository;
pub mod memory;

pub use entity_repository::{EntityRepository, ListQuery, Page, TenantFilter};
pub use memory::MemoryRepository;

#[cfg(test)]
pub use entity_repository::MockEntityRepository;
