//! Log line formatting

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// How log lines are rendered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Example: 2024-01-15 10:30:00.000 INFO  [crudgate_core::http] Listening on 127.0.0.1:8080
    #[default]
    Human,

    /// Example: {"timestamp":"2024-01-15T10:30:00+00:00","level":"INFO","target":"...","message":"..."}
    Json,

    /// Example: timestamp=2024-01-15T10:30:00+00:00 level=INFO target=... message="..."
    Logfmt,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// One record as seen by the formatter
#[derive(Debug, Clone)]
pub struct LogLine<'a> {
    pub timestamp: DateTime<Utc>,
    pub level: log::Level,
    pub target: &'a str,
    pub message: String,
}

impl<'a> LogLine<'a> {
    pub fn from_record(record: &'a log::Record<'_>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: record.level(),
            target: record.target(),
            message: record.args().to_string(),
        }
    }
}

impl LogFormat {
    pub fn format_line(&self, line: &LogLine<'_>) -> String {
        match self {
            LogFormat::Human => format_human(line),
            LogFormat::Json => format_json(line),
            LogFormat::Logfmt => format_logfmt(line),
        }
    }
}

fn format_human(line: &LogLine<'_>) -> String {
    format!(
        "{} {:5} [{}] {}",
        line.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        line.level,
        line.target,
        line.message
    )
}

fn format_json(line: &LogLine<'_>) -> String {
    let mut json = Map::new();
    json.insert("timestamp".to_string(), Value::String(line.timestamp.to_rfc3339()));
    json.insert("level".to_string(), Value::String(line.level.to_string()));
    json.insert("target".to_string(), Value::String(line.target.to_string()));
    json.insert("message".to_string(), Value::String(line.message.clone()));
    Value::Object(json).to_string()
}

fn format_logfmt(line: &LogLine<'_>) -> String {
    format!(
        "timestamp={} level={} target={} message=\"{}\"",
        line.timestamp.to_rfc3339(),
        line.level,
        line.target,
        line.message.replace('"', "\\\"")
    )
}
