//! Crudgate logging
//!
//! Code logs through the standard `log` macros; [`init_logging`] installs an
//! `env_logger` backend rendering lines in the configured [`LogFormat`].
//! `RUST_LOG` directives refine the configured level.
//!
//! ```rust,no_run
//! use crudgate_core::config::LoggingConfig;
//!
//! crudgate_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("Server starting on port {}", 8080);
//! ```

pub mod formatter;

pub use formatter::{LogFormat, LogLine};

use std::io::Write;

use crate::config::LoggingConfig;

/// Install the global logger
///
/// Safe to call more than once; later calls leave the first logger in place.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level: log::LevelFilter = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level '{}'", config.level))?;
    let format: LogFormat = config.format.parse().map_err(anyhow::Error::msg)?;

    let result = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(move |buf, record| writeln!(buf, "{}", format.format_line(&LogLine::from_record(record))))
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialised, keeping the existing one");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_ok() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_bad_level_rejected() {
        let config = LoggingConfig { level: "loud".to_string(), ..Default::default() };
        assert!(init_logging(&config).is_err());
    }
}
