//! Security configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::access::TokenSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Read the token from a cookie or a header
    /// Env: CG_TOKEN_SOURCE
    /// Default: cookie
    pub token_source: TokenSource,

    /// Cookie or header name carrying the token
    /// Env: CG_TOKEN_KEY
    /// Default: "Authorization"
    pub token_key: String,

    /// Claim holding the user id
    /// Env: CG_USER_ID_CLAIM
    /// Default: "_id"
    pub user_id_claim: String,

    /// HS256 secret; tokens are decoded unverified when absent
    /// Env: CG_JWT_SECRET
    pub jwt_secret: Option<String>,

    /// Answer 401 instead of treating token-less callers as anonymous
    /// Env: CG_REQUIRE_AUTHENTICATION
    /// Default: false
    pub require_authentication: bool,

    /// Base path of the model whose documents are the groups
    /// Env: CG_GROUPS_PATH
    /// Default: "/api/groups"
    pub groups_path: String,

    /// Roles allowed to manage the built-in groups collection
    /// Env: CG_ADMIN_ROLES (comma separated)
    /// Default: ["admin"]
    pub admin_roles: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_source: TokenSource::Cookie,
            token_key: "Authorization".to_string(),
            user_id_claim: "_id".to_string(),
            jwt_secret: None,
            require_authentication: false,
            groups_path: "/api/groups".to_string(),
            admin_roles: vec!["admin".to_string()],
        }
    }
}

impl SecurityConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(source) = var("CG_TOKEN_SOURCE").and_then(|s| s.parse().ok()) {
            self.token_source = source;
        }
        if let Some(key) = var("CG_TOKEN_KEY") {
            self.token_key = key;
        }
        if let Some(claim) = var("CG_USER_ID_CLAIM") {
            self.user_id_claim = claim;
        }
        if let Some(secret) = var("CG_JWT_SECRET").filter(|s| !s.is_empty()) {
            self.jwt_secret = Some(secret);
        }
        if let Some(required) = var("CG_REQUIRE_AUTHENTICATION") {
            self.require_authentication = required.parse().unwrap_or(false);
        }
        if let Some(path) = var("CG_GROUPS_PATH") {
            self.groups_path = path;
        }
        if let Some(roles) = var("CG_ADMIN_ROLES") {
            self.admin_roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_key.trim().is_empty() {
            bail!("Invalid token_key: cannot be empty");
        }
        if self.user_id_claim.trim().is_empty() {
            bail!("Invalid user_id_claim: cannot be empty");
        }
        if matches!(&self.jwt_secret, Some(s) if s.is_empty()) {
            bail!("Invalid jwt_secret: cannot be empty, omit it to disable verification");
        }
        if !self.groups_path.starts_with('/') {
            bail!("Invalid groups_path: must start with '/'");
        }
        if self.admin_roles.is_empty() || self.admin_roles.iter().any(|r| r.trim().is_empty()) {
            bail!("Invalid admin_roles: need at least one non-empty role");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SecurityConfig::default();
        assert_eq!(cfg.token_source, TokenSource::Cookie);
        assert_eq!(cfg.token_key, "Authorization");
        assert_eq!(cfg.user_id_claim, "_id");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = SecurityConfig::default();
        cfg.apply_env(&|k| match k {
            "CG_TOKEN_SOURCE" => Some("header".to_string()),
            "CG_JWT_SECRET" => Some("s3cret".to_string()),
            "CG_REQUIRE_AUTHENTICATION" => Some("true".to_string()),
            "CG_ADMIN_ROLES" => Some("ops, root".to_string()),
            _ => None,
        });
        assert_eq!(cfg.admin_roles, vec!["ops", "root"]);
        assert_eq!(cfg.token_source, TokenSource::Header);
        assert_eq!(cfg.jwt_secret.as_deref(), Some("s3cret"));
        assert!(cfg.require_authentication);
    }

    #[test]
    fn test_empty_claim_fails() {
        let cfg = SecurityConfig { user_id_claim: " ".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = SecurityConfig { admin_roles: Vec::new(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
