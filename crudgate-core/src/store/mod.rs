//! Storage collaborators
//!
//! The CRUD layer talks to persistence through [`RecordStore`] and resolves
//! group memberships through [`GroupMembershipStore`]. In-memory
//! implementations are provided for development and tests.

mod groups;
mod memory;

pub use groups::{CollectionGroupStore, Group, GroupMembershipStore};
pub use memory::MemoryRecordStore;

use serde_json::Value;

use crate::query::{Filter, SortKey};

/// Primary key field of every stored document
pub const ID_FIELD: &str = "id";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Window and ordering of a find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
}

/// Document store the CRUD handlers delegate to
///
/// Implement this trait to back models with a real database.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Documents matching `filter`, windowed and ordered by `options`
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    /// The document with `id`, if it also matches `filter`
    async fn find_by_id(&self, id: &str, filter: &Filter) -> Result<Option<Value>, StoreError>;

    /// Insert a document, assigning an id when it has none
    async fn create(&self, doc: Value) -> Result<Value, StoreError>;

    /// Merge `changes` into the document and return the updated version
    async fn find_one_and_update(&self, id: &str, changes: Value) -> Result<Option<Value>, StoreError>;

    /// Remove the document and return it
    async fn find_one_and_remove(&self, id: &str) -> Result<Option<Value>, StoreError>;
}

#[async_trait::async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, StoreError> {
        (**self).find(filter, options).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        (**self).count(filter).await
    }

    async fn find_by_id(&self, id: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        (**self).find_by_id(id, filter).await
    }

    async fn create(&self, doc: Value) -> Result<Value, StoreError> {
        (**self).create(doc).await
    }

    async fn find_one_and_update(&self, id: &str, changes: Value) -> Result<Option<Value>, StoreError> {
        (**self).find_one_and_update(id, changes).await
    }

    async fn find_one_and_remove(&self, id: &str) -> Result<Option<Value>, StoreError> {
        (**self).find_one_and_remove(id).await
    }
}
