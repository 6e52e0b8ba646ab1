//! Sort specifications

use std::cmp::Ordering;

use serde_json::Value;

use super::QueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: false }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }

    /// Parse `"-created title"` or `{"created": -1, "title": 1}`
    pub fn parse_all(value: &Value) -> Result<Vec<SortKey>, QueryError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::String(s) => Ok(Self::parse_str(s)),
            Value::Object(obj) => obj
                .iter()
                .map(|(field, dir)| match dir {
                    Value::Number(n) if n.as_i64() == Some(-1) => Ok(SortKey::desc(field)),
                    Value::Number(n) if n.as_i64() == Some(1) => Ok(SortKey::asc(field)),
                    Value::String(s) if matches!(s.as_str(), "desc" | "descending") => {
                        Ok(SortKey::desc(field))
                    }
                    Value::String(s) if matches!(s.as_str(), "asc" | "ascending") => {
                        Ok(SortKey::asc(field))
                    }
                    other => Err(QueryError::InvalidParameter(format!(
                        "invalid sort direction for '{}': {}",
                        field, other
                    ))),
                })
                .collect(),
            other => Err(QueryError::InvalidParameter(format!("invalid sort: {}", other))),
        }
    }

    pub fn parse_str(spec: &str) -> Vec<SortKey> {
        spec.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(|t| match t.strip_prefix('-') {
                Some(field) => SortKey::desc(field),
                None => SortKey::asc(t.trim_start_matches('+')),
            })
            .collect()
    }
}

/// Compare two documents by a list of sort keys; missing fields sort first
pub fn compare_documents(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_values(a.get(&key.field), b.get(&key.field));
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
