//! Pagination configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Envelope key names of a paginated list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginateKeys {
    pub data: String,
    pub total: String,
    #[serde(rename = "lastPage", alias = "last_page")]
    pub last_page: String,
    #[serde(rename = "currentPage", alias = "current_page")]
    pub current_page: String,
}

impl Default for PaginateKeys {
    fn default() -> Self {
        Self {
            data: "data".to_string(),
            total: "total".to_string(),
            last_page: "lastPage".to_string(),
            current_page: "page".to_string(),
        }
    }
}

impl PaginateKeys {
    pub fn validate(&self) -> Result<()> {
        let keys = [&self.data, &self.total, &self.last_page, &self.current_page];
        if keys.iter().any(|k| k.is_empty()) {
            bail!("Invalid pagination keys: names cannot be empty");
        }
        for (i, a) in keys.iter().enumerate() {
            if keys[i + 1..].contains(a) {
                bail!("Invalid pagination keys: '{}' is used twice", a);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Wrap list results in an envelope; a bare array otherwise
    pub enabled: bool,

    /// Page size when the caller sends none
    /// Env: CG_DEFAULT_LIMIT
    /// Default: 10
    pub default_limit: u64,

    pub keys: PaginateKeys,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { enabled: true, default_limit: 10, keys: PaginateKeys::default() }
    }
}

impl PaginationConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(limit) = var("CG_DEFAULT_LIMIT").and_then(|l| l.parse().ok()) {
            self.default_limit = limit;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_limit == 0 {
            bail!("Invalid default_limit: must be greater than 0");
        }
        self.keys.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let cfg = PaginationConfig::default();
        assert_eq!(cfg.default_limit, 10);
        assert_eq!(cfg.keys.last_page, "lastPage");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_duplicate_keys_fail() {
        let keys = PaginateKeys { total: "data".to_string(), ..Default::default() };
        assert!(keys.validate().unwrap_err().to_string().contains("twice"));
    }

    #[test]
    fn test_toml_key_names() {
        let keys: PaginateKeys = toml::from_str("data = \"items\"\nlastPage = \"pages\"").unwrap();
        assert_eq!(keys.data, "items");
        assert_eq!(keys.last_page, "pages");
        assert_eq!(keys.current_page, "page");
    }
}
