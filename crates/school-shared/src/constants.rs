//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 3600;

/// Role allowed to write tenant-global lookup tables
pub const ROLE_PLATFORM_ADMIN: &str = "platform_admin";

/// Columns owned by the server. Ignored in request bodies, reserved in the catalog.
pub const SERVER_MANAGED_FIELDS: [&str; 6] = [
    "id",
    "tenant_id",
    "created_on",
    "created_by",
    "updated_on",
    "updated_by",
];
