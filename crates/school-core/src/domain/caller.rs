//! Authenticated caller, derived from the bearer token

use uuid::Uuid;

use school_shared::constants::ROLE_PLATFORM_ADMIN;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub roles: Vec<String>,
}

impl CallerContext {
    pub fn new(user_id: Uuid, tenant_id: Uuid, roles: Vec<String>) -> Self {
        Self { user_id, tenant_id, roles }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_platform_admin(&self) -> bool {
        self.has_role(ROLE_PLATFORM_ADMIN)
    }
}
