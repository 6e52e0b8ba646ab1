//! Group membership lookup

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FindOptions, RecordStore, StoreError};
use crate::query::Filter;

/// A group document: its members and the role tags it grants them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Group {
    /// Check a full or partial group document before it is stored
    ///
    /// `members` and `permissions` must be arrays of strings and `name` a
    /// string, whenever they are present.
    pub fn check_document(doc: &Value) -> Result<(), String> {
        let Some(obj) = doc.as_object() else {
            return Err("group must be a JSON object".to_string());
        };
        for key in ["members", "permissions"] {
            match obj.get(key) {
                None => {}
                Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
                Some(_) => return Err(format!("group '{}' must be an array of strings", key)),
            }
        }
        match obj.get("name") {
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
            Some(_) => Err("group 'name' must be a string".to_string()),
        }
    }
}

/// Source of group memberships for role aggregation
#[async_trait::async_trait]
pub trait GroupMembershipStore: Send + Sync {
    async fn find_groups_containing_member(&self, user_id: &str) -> Result<Vec<Group>, StoreError>;
}

/// Reads groups from any record store holding group documents
///
/// Lets the groups collection itself be served as a CRUD model.
#[derive(Clone)]
pub struct CollectionGroupStore {
    records: Arc<dyn RecordStore>,
}

impl CollectionGroupStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }
}

#[async_trait::async_trait]
impl GroupMembershipStore for CollectionGroupStore {
    async fn find_groups_containing_member(&self, user_id: &str) -> Result<Vec<Group>, StoreError> {
        let docs = self
            .records
            .find(&Filter::eq("members", user_id), &FindOptions::default())
            .await?;

        docs.into_iter()
            .map(|doc: Value| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}
