//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: CG_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Listening port
    /// Env: CG_PORT
    /// Default: 8080
    pub port: u16,

    /// Maximum request body size in bytes
    /// Env: CG_MAX_BODY_SIZE
    /// Default: 2097152 (2MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, max_body_size: 2 * 1024 * 1024 }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(host) = var("CG_HOST") {
            self.host = host;
        }

        if let Some(p) = var("CG_PORT").and_then(|p| p.parse().ok()) {
            self.port = p;
        }

        if let Some(s) = var("CG_MAX_BODY_SIZE").and_then(|s| s.parse().ok()) {
            self.max_body_size = s;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Invalid port: port must be between 1 and 65535");
        }

        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = ServerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_port_zero_fails() {
        let cfg = ServerConfig { port: 0, ..Default::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("port"));
    }

    #[test]
    fn test_env_overrides_and_ignores_garbage() {
        let mut cfg = ServerConfig::default();
        cfg.apply_env(&|k| match k {
            "CG_PORT" => Some("9090".to_string()),
            "CG_MAX_BODY_SIZE" => Some("lots".to_string()),
            _ => None,
        });
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.max_body_size, 2 * 1024 * 1024);
    }
}
