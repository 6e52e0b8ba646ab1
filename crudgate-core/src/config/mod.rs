//! Configuration system for Crudgate
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on `CrudServer`)
//! 2. **Environment Variables** (`CG_*`)
//! 3. **Config File** (crudgate.toml)
//! 4. **Defaults**
//!
//! The resolved value is passed explicitly to the server and the handlers;
//! there is no process-wide default.
//!
//! # Example
//!
//! ```no_run
//! use crudgate_core::config::CrudgateConfig;
//!
//! let config = CrudgateConfig::load_from("crudgate.toml")?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod pagination;
pub mod security;
pub mod server;

pub use logging::LoggingConfig;
pub use pagination::{PaginateKeys, PaginationConfig};
pub use security::SecurityConfig;
pub use server::ServerConfig;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::ModelConfig;

/// Complete Crudgate configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudgateConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
    pub models: Vec<ModelConfig>,
}

impl CrudgateConfig {
    /// Defaults, then `crudgate.toml` if present, then environment
    pub fn load() -> Result<Self> {
        Self::load_from("crudgate.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.security.merge(other.security);
        self.pagination.merge(other.pagination);
        self.logging.merge(other.logging);
        if !other.models.is_empty() {
            self.models = other.models;
        }
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_env(&|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        self.server.apply_env(var);
        self.security.apply_env(var);
        self.pagination.apply_env(var);
        self.logging.apply_env(var);
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.security.validate()?;
        self.pagination.validate()?;
        self.logging.validate()?;

        let mut paths = HashSet::new();
        for model in &self.models {
            model.validate()?;
            if !paths.insert(model.normalized_path()) {
                bail!("Duplicate model path '{}'", model.normalized_path());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CrudgateConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.pagination.default_limit, 10);
        assert!(config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 3000

[security]
token_source = "header"
jwt_secret = "s3cret"

[[models]]
name = "posts"
path = "/api/posts"
owner_seed = "creator"

[models.properties_roles]
draft_notes = ["editor"]
"#
        )
        .unwrap();

        let config = CrudgateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.security.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].properties_roles["draft_notes"], vec!["editor"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrudgateConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.security.token_key, "Authorization");
    }

    #[test]
    fn test_bad_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = CrudgateConfig::load_from(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }

    #[test]
    fn test_duplicate_model_paths_fail() {
        let config: CrudgateConfig = toml::from_str(
            r#"
[[models]]
name = "a"
path = "/api/things"

[[models]]
name = "b"
path = "/api/things/"
"#,
        )
        .unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("Duplicate"));
    }
}
