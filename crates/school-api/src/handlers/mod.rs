pub mod entity;
pub mod health;
pub mod schema;
