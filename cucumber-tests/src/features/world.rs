use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use crudgate_core::access::{AccessContext, AuthenticatedCreate, JwtDecoder, PermissionFields};
use crudgate_core::config::CrudgateConfig;
use crudgate_core::http::Router;
use crudgate_core::model::{ModelDefinition, ModelSecurity};
use crudgate_core::store::{
    CollectionGroupStore, Group, GroupMembershipStore, MemoryRecordStore, RecordStore, StoreError,
};
use crudgate_core::CrudServer;
use cucumber::World;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};

pub const SECRET: &str = "bdd-secret";
pub const RECORDS_PATH: &str = "/api/records";

/// Group store standing in for an unreachable group collection
pub struct UnavailableGroups;

#[async_trait::async_trait]
impl GroupMembershipStore for UnavailableGroups {
    async fn find_groups_containing_member(&self, _user_id: &str) -> Result<Vec<Group>, StoreError> {
        Err(StoreError::Unavailable("group collection unreachable".to_string()))
    }
}

#[derive(Debug, Default, World)]
pub struct CrudgateWorld {
    pub groups: Arc<MemoryRecordStore>,
    pub records: Arc<MemoryRecordStore>,
    pub properties_roles: BTreeMap<String, Vec<String>>,
    pub group_store_down: bool,

    /// Scenario names of records mapped to their ids
    pub aliases: HashMap<String, String>,

    pub last_status: Option<StatusCode>,
    pub last_body: Value,

    // Engine-level scenarios
    pub fields: PermissionFields,
    pub context: AccessContext,
    pub masked: Vec<Value>,
}

impl CrudgateWorld {
    fn router(&self) -> Router {
        let mut config = CrudgateConfig::default();
        config.security.jwt_secret = Some(SECRET.to_string());

        let groups: Arc<dyn GroupMembershipStore> = if self.group_store_down {
            Arc::new(UnavailableGroups)
        } else {
            Arc::new(CollectionGroupStore::new(self.groups.clone()))
        };
        let records = ModelDefinition::new("records", RECORDS_PATH).secured(
            ModelSecurity::enabled()
                .with_properties_roles(self.properties_roles.clone())
                .with_overrides(Arc::new(AuthenticatedCreate)),
        );

        CrudServer::with_config(config)
            .with_group_store(groups)
            .with_model(records, self.records.clone())
            .into_router()
            .expect("router builds")
    }

    pub async fn add_group(&mut self, name: &str, permissions: &[&str], members: &[&str]) {
        self.groups
            .create(json!({"name": name, "members": members, "permissions": permissions}))
            .await
            .expect("group stored");
    }

    /// Store a record directly, bypassing the access engine
    pub async fn add_record(&mut self, alias: &str, mut doc: Value) {
        doc["id"] = Value::String(alias.to_string());
        self.records.create(doc).await.expect("record stored");
        self.aliases.insert(alias.to_string(), alias.to_string());
    }

    pub fn record_path(&self, alias: &str) -> String {
        let id = self.aliases.get(alias).map(String::as_str).unwrap_or(alias);
        format!("{}/{}", RECORDS_PATH, urlencoding::encode(id))
    }

    pub async fn send(&mut self, method: Method, path: &str, user: Option<&str>, body: Option<Value>) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(user) = user {
            let token = JwtDecoder::encode(SECRET, &json!({"_id": user})).expect("token signs");
            builder = builder.header("cookie", format!("Authorization={}", token));
        }
        let bytes = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Bytes::from(body.to_string())
            }
            None => Bytes::new(),
        };
        let request = builder.body(bytes).expect("request builds");

        let response = self.router().dispatch(request).await;
        self.last_status = Some(response.status());
        let collected = response.into_body().collect().await.expect("body collects").to_bytes();
        self.last_body = serde_json::from_slice(&collected).unwrap_or(Value::Null);
    }

    pub fn listed_ids(&self) -> Vec<String> {
        self.last_body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
