//! # School Security
//! 
//! Bearer token validation for the school data service.

pub mod jwt;

pub use jwt::{Claims, JwtError, JwtService};
