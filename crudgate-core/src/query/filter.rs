//! Document filters
//!
//! A small subset of the Mongo query language: equality (with array
//! containment), `$ne`, `$in`, `$and` and `$or`. Paths may be dotted.

use serde_json::{Map, Value};

use super::QueryError;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Matches every document
    #[default]
    All,
    /// Matches no document
    Nothing,
    /// Field equals the value, or is an array containing it
    Eq(String, Value),
    /// Negation of `Eq`
    Ne(String, Value),
    /// Field (or one of its array elements) is one of the values
    In(String, Vec<Value>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn in_list<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    /// Conjunction; `All` is the identity and `Nothing` absorbs
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::Nothing, _) | (_, Filter::Nothing) => Filter::Nothing,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Nothing => false,
            Filter::Eq(path, expected) => field_equals(lookup(doc, path), expected),
            Filter::Ne(path, expected) => !field_equals(lookup(doc, path), expected),
            Filter::In(path, values) => {
                let actual = lookup(doc, path);
                values.iter().any(|v| field_equals(actual, v))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }

    /// Every field path the filter reads, in clause order
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Filter::All | Filter::Nothing => Vec::new(),
            Filter::Eq(path, _) | Filter::Ne(path, _) | Filter::In(path, _) => vec![path.as_str()],
            Filter::And(filters) | Filter::Or(filters) => filters.iter().flat_map(Filter::fields).collect(),
        }
    }

    /// Parse a Mongo-style `where` object
    pub fn from_json(value: &Value) -> Result<Filter, QueryError> {
        let obj = match value {
            Value::Null => return Ok(Filter::All),
            Value::Object(obj) => obj,
            other => {
                return Err(QueryError::InvalidFilter(format!("expected an object, got {}", other)))
            }
        };

        let mut filter = Filter::All;
        for (key, v) in obj {
            let clause = match key.as_str() {
                "$and" => Filter::And(Self::parse_list(key, v)?),
                "$or" => Filter::Or(Self::parse_list(key, v)?),
                op if op.starts_with('$') => {
                    return Err(QueryError::InvalidFilter(format!("unsupported operator '{}'", op)))
                }
                field => Self::parse_field(field, v)?,
            };
            filter = filter.and(clause);
        }
        Ok(filter)
    }

    fn parse_list(key: &str, value: &Value) -> Result<Vec<Filter>, QueryError> {
        value
            .as_array()
            .ok_or_else(|| QueryError::InvalidFilter(format!("'{}' expects an array", key)))?
            .iter()
            .map(Filter::from_json)
            .collect()
    }

    fn parse_field(field: &str, value: &Value) -> Result<Filter, QueryError> {
        let Some(ops) = value.as_object().filter(|o| o.keys().any(|k| k.starts_with('$'))) else {
            return Ok(Filter::Eq(field.to_string(), value.clone()));
        };

        let mut filter = Filter::All;
        for (op, operand) in ops {
            let clause = match op.as_str() {
                "$eq" => Filter::Eq(field.to_string(), operand.clone()),
                "$ne" => Filter::Ne(field.to_string(), operand.clone()),
                "$in" => Filter::In(
                    field.to_string(),
                    operand
                        .as_array()
                        .ok_or_else(|| {
                            QueryError::InvalidFilter(format!("'$in' on '{}' expects an array", field))
                        })?
                        .clone(),
                ),
                other => {
                    return Err(QueryError::InvalidFilter(format!(
                        "unsupported operator '{}' on '{}'",
                        other, field
                    )))
                }
            };
            filter = filter.and(clause);
        }
        Ok(filter)
    }

    /// Render back to Mongo-style JSON
    pub fn to_json(&self) -> Value {
        match self {
            Filter::All => Value::Object(Map::new()),
            Filter::Nothing => serde_json::json!({ "$or": [] }),
            Filter::Eq(field, v) => single(field, v.clone()),
            Filter::Ne(field, v) => single(field, single("$ne", v.clone())),
            Filter::In(field, vs) => single(field, single("$in", Value::Array(vs.clone()))),
            Filter::And(fs) => {
                serde_json::json!({ "$and": fs.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Or(fs) => {
                serde_json::json!({ "$or": fs.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut obj = Map::new();
    obj.insert(key.to_string(), value);
    Value::Object(obj)
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(|i| i == expected),
        Some(value) => value == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_eq_matches_array_membership() {
        let doc = json!({"owners": ["u1", "u2"], "status": "open"});
        assert!(Filter::eq("owners", "u2").matches(&doc));
        assert!(Filter::eq("status", "open").matches(&doc));
        assert!(!Filter::eq("owners", "u3").matches(&doc));
    }

    #[test]
    fn test_fields_walks_nested_clauses() {
        let filter = Filter::from_json(&json!({
            "title": "t",
            "$or": [{"salary": {"$ne": 1}}, {"profile.age": {"$in": [30]}}]
        }))
        .unwrap();
        let mut fields = filter.fields();
        fields.sort();
        assert_eq!(fields, vec!["profile.age", "salary", "title"]);
        assert!(Filter::All.fields().is_empty());
    }

    #[test]
    fn test_in_intersects_arrays() {
        let doc = json!({"roles": ["editor"]});
        assert!(Filter::in_list("roles", vec!["dev", "editor"]).matches(&doc));
        assert!(!Filter::in_list::<&str>("roles", vec![]).matches(&doc));
    }

    #[test]
    fn test_and_identity_and_absorption() {
        let f = Filter::eq("a", 1);
        assert_eq!(Filter::All.and(f.clone()), f);
        assert_eq!(f.clone().and(Filter::Nothing), Filter::Nothing);
        let both = f.clone().and(Filter::eq("b", 2)).and(Filter::eq("c", 3));
        assert_eq!(
            both,
            Filter::And(vec![f, Filter::eq("b", 2), Filter::eq("c", 3)])
        );
    }

    #[test]
    fn test_from_json() {
        let filter = Filter::from_json(&json!({
            "status": "open",
            "meta.kind": {"$in": ["a", "b"]},
            "$or": [{"priority": 1}, {"priority": {"$ne": 3}}]
        }))
        .unwrap();
        assert!(filter.matches(&json!({"status": "open", "meta": {"kind": "b"}, "priority": 2})));
        assert!(!filter.matches(&json!({"status": "open", "meta": {"kind": "c"}, "priority": 1})));
    }

    #[test]
    fn test_from_json_rejects_unknown_operators() {
        assert!(Filter::from_json(&json!({"$where": "1"})).is_err());
        assert!(Filter::from_json(&json!({"a": {"$regex": "x"}})).is_err());
        assert!(Filter::from_json(&json!([1])).is_err());
        assert_eq!(Filter::from_json(&Value::Null).unwrap(), Filter::All);
    }

    #[test]
    fn test_to_json_parses_back() {
        let filter = Filter::eq("a", 1).and(Filter::Or(vec![
            Filter::Ne("b".to_string(), json!(2)),
            Filter::in_list("c", vec!["x"]),
        ]));
        assert_eq!(Filter::from_json(&filter.to_json()).unwrap(), filter);
    }

    #[test]
    fn test_nested_object_without_operators_is_equality() {
        let filter = Filter::from_json(&json!({"meta": {"kind": "a"}})).unwrap();
        assert!(filter.matches(&json!({"meta": {"kind": "a"}})));
    }
}
