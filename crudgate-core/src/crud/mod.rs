//! CRUD request orchestration
//!
//! [`CrudController`] maps list/get/create/update/delete onto a
//! [`RecordStore`](crate::store::RecordStore), consulting the access engine
//! when the model is secured. Refusals come back as [`Outcome::Denied`] or
//! [`Outcome::NotFound`], failures as [`CrudError`].

mod controller;

pub use controller::CrudController;

use serde_json::{Map, Value};

use crate::access::AccessError;
use crate::config::PaginateKeys;
use crate::query::QueryError;
use crate::store::StoreError;

/// Result of an operation that ran to completion
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// The access decision was negative
    Denied,
    /// No such record, or not visible to the caller
    NotFound,
}

impl<T> Outcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Denied => Outcome::Denied,
            Outcome::NotFound => Outcome::NotFound,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CrudError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<QueryError> for CrudError {
    fn from(err: QueryError) -> Self {
        CrudError::BadRequest(err.to_string())
    }
}

/// One page of a list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub data: Vec<Value>,
    pub total: u64,
    pub last_page: u64,
    pub page: u64,
}

impl ListPage {
    pub fn to_json(&self, keys: &PaginateKeys) -> Value {
        let mut envelope = Map::new();
        envelope.insert(keys.total.clone(), Value::from(self.total));
        envelope.insert(keys.data.clone(), Value::Array(self.data.clone()));
        envelope.insert(keys.last_page.clone(), Value::from(self.last_page));
        envelope.insert(keys.current_page.clone(), Value::from(self.page));
        Value::Object(envelope)
    }
}

/// List response, wrapped or bare depending on the model's pagination mode
#[derive(Debug, Clone, PartialEq)]
pub enum ListResponse {
    Paginated { page: ListPage, keys: PaginateKeys },
    Bare(Vec<Value>),
}

impl ListResponse {
    pub fn to_json(&self) -> Value {
        match self {
            ListResponse::Paginated { page, keys } => page.to_json(keys),
            ListResponse::Bare(items) => Value::Array(items.clone()),
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            ListResponse::Paginated { page, .. } => &page.data,
            ListResponse::Bare(items) => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_uses_configured_keys() {
        let page = ListPage { data: vec![json!({"id": "a"})], total: 11, last_page: 2, page: 1 };
        let keys = PaginateKeys { data: "items".to_string(), ..Default::default() };
        assert_eq!(
            page.to_json(&keys),
            json!({"items": [{"id": "a"}], "total": 11, "lastPage": 2, "page": 1})
        );
    }

    #[test]
    fn test_outcome_map() {
        assert_eq!(Outcome::Ok(2).map(|v| v * 2), Outcome::Ok(4));
        assert_eq!(Outcome::<i32>::Denied.map(|v| v * 2), Outcome::Denied);
        assert_eq!(Outcome::<i32>::NotFound.ok(), None);
    }
}
