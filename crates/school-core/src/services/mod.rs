//! Domain services (business logic)

pub mod entity_service;

pub use entity_service::EntityService;
