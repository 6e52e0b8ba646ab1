//! Query parsing for list and get requests
//!
//! Callers send `?query=<json>` with `where`, `limit`, `page`, `skip` and
//! `sort`, plus an optional `?select=` projection string.

mod filter;
mod pagination;
mod sort;

pub use filter::Filter;
pub use pagination::Pagination;
pub use sort::{compare_documents, SortKey};

use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid query parameter: {0}")]
    InvalidParameter(String),
}

/// Parsed list/get query; `None` means "use the model default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Option<Filter>,
    pub limit: Option<u64>,
    pub page: Option<u64>,
    pub skip: Option<u64>,
    pub sort: Option<Vec<SortKey>>,
    pub select: Option<String>,
}

impl ListQuery {
    /// Parse a raw URI query string
    pub fn from_query_string(raw: Option<&str>) -> Result<Self, QueryError> {
        let mut query = ListQuery::default();
        let Some(raw) = raw else {
            return Ok(query);
        };

        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_component(value)?;
            match key {
                "query" if !value.is_empty() => {
                    let json: Value = serde_json::from_str(&value).map_err(|e| {
                        QueryError::InvalidParameter(format!("'query' is not valid JSON: {}", e))
                    })?;
                    query.merge_json(&json)?;
                }
                "select" => query.select = Some(value),
                "limit" => query.limit = Some(parse_number("limit", &value)?),
                "page" => query.page = Some(parse_number("page", &value)?),
                "skip" => query.skip = Some(parse_number("skip", &value)?),
                "sort" => query.sort = Some(SortKey::parse_str(&value)),
                _ => {}
            }
        }
        Ok(query)
    }

    fn merge_json(&mut self, json: &Value) -> Result<(), QueryError> {
        let Some(obj) = json.as_object() else {
            return Err(QueryError::InvalidParameter("'query' must be a JSON object".to_string()));
        };
        if let Some(w) = obj.get("where") {
            self.filter = Some(Filter::from_json(w)?);
        }
        if let Some(v) = obj.get("limit") {
            self.limit = Some(json_number("limit", v)?);
        }
        if let Some(v) = obj.get("page") {
            self.page = Some(json_number("page", v)?);
        }
        if let Some(v) = obj.get("skip") {
            self.skip = Some(json_number("skip", v)?);
        }
        if let Some(v) = obj.get("sort") {
            self.sort = Some(SortKey::parse_all(v)?);
        }
        if let Some(Value::String(s)) = obj.get("select") {
            self.select = Some(s.clone());
        }
        Ok(())
    }
}

fn decode_component(raw: &str) -> Result<String, QueryError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| QueryError::InvalidParameter(format!("bad percent-encoding: {}", e)))
}

fn parse_number(name: &str, value: &str) -> Result<u64, QueryError> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::InvalidParameter(format!("'{}' must be a non-negative integer", name)))
}

fn json_number(name: &str, value: &Value) -> Result<u64, QueryError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| QueryError::InvalidParameter(format!("'{}' must be non-negative", name))),
        Value::String(s) => parse_number(name, s),
        _ => Err(QueryError::InvalidParameter(format!("'{}' must be a number", name))),
    }
}
