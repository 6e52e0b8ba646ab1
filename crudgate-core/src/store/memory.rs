//! In-memory record storage
//!
//! Documents live in a `BTreeMap` behind a tokio `RwLock` and are lost on
//! restart. Unsorted finds return documents in insertion order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{FindOptions, RecordStore, StoreError, ID_FIELD};
use crate::query::{compare_documents, Filter};

#[derive(Default)]
struct Inner {
    next_seq: u64,
    /// id -> (insertion sequence, document)
    records: BTreeMap<String, (u64, Value)>,
}

#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordStore").finish_non_exhaustive()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn record_id(doc: &Value) -> Result<Option<String>, StoreError> {
        match doc.get(ID_FIELD) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(id)) if !id.is_empty() => Ok(Some(id.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(StoreError::InvalidRecord(format!("unusable id {}", other))),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>, StoreError> {
        let inner = self.inner.read().await;
        let mut matched: Vec<&(u64, Value)> =
            inner.records.values().filter(|(_, doc)| filter.matches(doc)).collect();

        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            compare_documents(a, b, &options.sort).then(seq_a.cmp(seq_b))
        });

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched.into_iter().skip(skip).take(limit).map(|(_, doc)| doc.clone()).collect())
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.records.values().filter(|(_, doc)| filter.matches(doc)).count() as u64)
    }

    async fn find_by_id(&self, id: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.records.get(id).map(|(_, doc)| doc).filter(|doc| filter.matches(doc)).cloned())
    }

    async fn create(&self, mut doc: Value) -> Result<Value, StoreError> {
        let id = match Self::record_id(&doc)? {
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let Some(obj) = doc.as_object_mut() else {
            return Err(StoreError::InvalidRecord("document must be a JSON object".to_string()));
        };
        obj.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&id) {
            return Err(StoreError::InvalidRecord(format!("duplicate id '{}'", id)));
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.records.insert(id, (seq, doc.clone()));
        Ok(doc)
    }

    async fn find_one_and_update(&self, id: &str, changes: Value) -> Result<Option<Value>, StoreError> {
        let Value::Object(changes) = changes else {
            return Err(StoreError::InvalidRecord("update must be a JSON object".to_string()));
        };

        let mut inner = self.inner.write().await;
        let Some((_, doc)) = inner.records.get_mut(id) else {
            return Ok(None);
        };
        if let Some(obj) = doc.as_object_mut() {
            for (key, value) in changes {
                if key != ID_FIELD {
                    obj.insert(key, value);
                }
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn find_one_and_remove(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.records.remove(id).map(|(_, doc)| doc))
    }
}
