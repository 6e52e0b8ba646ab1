//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: CG_LOG_LEVEL
    pub level: String,
    /// human, json or logfmt
    /// Env: CG_LOG_FORMAT
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(level) = var("CG_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = var("CG_LOG_FORMAT") {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.level.parse::<log::LevelFilter>().is_err() {
            bail!("Invalid log level '{}'", self.level);
        }
        if let Err(e) = self.format.parse::<LogFormat>() {
            bail!("Invalid log format: {}", e);
        }
        Ok(())
    }
}
