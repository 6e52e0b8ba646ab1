//! Per-request access context

use super::principal::Principal;
use super::roles::RoleSet;

/// Identity and aggregated roles of one request
///
/// Built once per request and shared by every check made while serving it.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub principal: Principal,
    pub roles: RoleSet,
}

impl AccessContext {
    pub fn new(principal: Principal, roles: RoleSet) -> Self {
        Self { principal, roles }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.principal.user_id()
    }
}
