//! # School Core - Domain Module
//! 
//! Generic record model shared by every entity in the catalog.

pub mod value;
pub mod record;
pub mod payload;
pub mod caller;

pub use value::FieldValue;
pub use record::Record;
pub use payload::{parse_payload, PayloadMode};
pub use caller::CallerContext;
