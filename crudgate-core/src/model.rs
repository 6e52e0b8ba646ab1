//! Model definitions
//!
//! A model is declared once, either in code with [`ModelDefinition`] or in the
//! config file with [`ModelConfig`], and the server derives its CRUD routes
//! and access rules from it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::{AuthenticatedCreate, DecisionOverride, OwnerSeed};
use crate::config::PaginateKeys;
use crate::query::{Filter, SortKey};
use crate::store::Group;

/// Class-level roles seeded into every new record of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticRoles {
    pub read_roles: Vec<String>,
    pub write_roles: Vec<String>,
    pub delete_roles: Vec<String>,
}

/// Rewrites a request body before it reaches the store
pub type BodyTransform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Rejects a create or update body; the message is returned to the caller
pub type BodyValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Access rules of one model
#[derive(Clone, Default)]
pub struct ModelSecurity {
    /// When false the engine is skipped entirely
    pub enabled: bool,
    pub static_roles: Option<StaticRoles>,
    /// field -> roles required to see it
    pub properties_roles: BTreeMap<String, Vec<String>>,
    owner_seed: Option<OwnerSeed>,
    pub overrides: Option<Arc<dyn DecisionOverride>>,
}

impl ModelSecurity {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self { enabled: true, ..Self::default() }
    }

    pub fn with_static_roles(mut self, roles: StaticRoles) -> Self {
        self.static_roles = Some(roles);
        self
    }

    pub fn with_properties_roles(mut self, properties_roles: BTreeMap<String, Vec<String>>) -> Self {
        self.properties_roles = properties_roles;
        self
    }

    pub fn with_property_roles<S: Into<String>>(
        mut self,
        field: impl Into<String>,
        roles: impl IntoIterator<Item = S>,
    ) -> Self {
        self.properties_roles.insert(field.into(), roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_owner_seed(mut self, seed: OwnerSeed) -> Self {
        self.owner_seed = Some(seed);
        self
    }

    pub fn with_overrides(mut self, overrides: Arc<dyn DecisionOverride>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Explicit seed, else `Creator` without static roles and `Nobody` with them
    pub fn owner_seed(&self) -> OwnerSeed {
        self.owner_seed.unwrap_or(if self.static_roles.is_some() {
            OwnerSeed::Nobody
        } else {
            OwnerSeed::Creator
        })
    }
}

impl fmt::Debug for ModelSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSecurity")
            .field("enabled", &self.enabled)
            .field("static_roles", &self.static_roles)
            .field("properties_roles", &self.properties_roles)
            .field("owner_seed", &self.owner_seed())
            .field("overrides", &self.overrides.is_some())
            .finish()
    }
}

/// How list responses are shaped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PaginationMode {
    /// Use the `[pagination]` section
    #[default]
    Global,
    /// Envelope with model-specific key names
    Keys(PaginateKeys),
    /// Bare array
    Disabled,
}

/// Defaults applied when the caller leaves a query option out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDefaults {
    pub filter: Filter,
    pub limit: Option<u64>,
    pub sort: Vec<SortKey>,
    pub pagination: PaginationMode,
    pub find_one_filter: Filter,
    pub find_one_select: Option<String>,
}

/// A model served under `base_path`
#[derive(Clone)]
pub struct ModelDefinition {
    pub name: String,
    pub base_path: String,
    pub security: ModelSecurity,
    pub routes: RouteDefaults,
    pub create_transform: Option<BodyTransform>,
    pub update_transform: Option<BodyTransform>,
    /// Runs on create and update bodies after the transforms
    pub validator: Option<BodyValidator>,
    /// Served as-is at `GET {base_path}/config`
    pub client_config: Value,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, base_path: impl AsRef<str>) -> Self {
        Self {
            name: name.into(),
            base_path: normalize_path(base_path.as_ref()),
            security: ModelSecurity::disabled(),
            routes: RouteDefaults::default(),
            create_transform: None,
            update_transform: None,
            validator: None,
            client_config: Value::Object(Default::default()),
        }
    }

    /// Group collection writable only by `admin_roles`, with typed group documents
    pub fn groups<S: Into<String>>(base_path: impl AsRef<str>, admin_roles: impl IntoIterator<Item = S>) -> Self {
        let admins: Vec<String> = admin_roles.into_iter().map(Into::into).collect();
        let roles = StaticRoles {
            read_roles: admins.clone(),
            write_roles: admins.clone(),
            delete_roles: admins,
        };
        Self::new("groups", base_path)
            .secured(
                ModelSecurity::enabled()
                    .with_static_roles(roles)
                    .with_owner_seed(OwnerSeed::Nobody),
            )
            .with_validator(Group::check_document)
    }

    pub fn secured(mut self, security: ModelSecurity) -> Self {
        self.security = security;
        self
    }

    pub fn with_routes(mut self, routes: RouteDefaults) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_create_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.create_transform = Some(Arc::new(f));
        self
    }

    pub fn with_update_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.update_transform = Some(Arc::new(f));
        self
    }

    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn with_client_config(mut self, config: Value) -> Self {
        self.client_config = config;
        self
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("base_path", &self.base_path)
            .field("security", &self.security)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// `/api/posts/` and `api/posts` both become `/api/posts`
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{}", trimmed)
}

/// `paginate = false` or a table of key names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaginateSetting {
    Enabled(bool),
    Keys(PaginateKeys),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindRouteConfig {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub limit: Option<u64>,
    pub sort: Option<Value>,
    pub paginate: Option<PaginateSetting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FindOneRouteConfig {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub select: Option<String>,
}

/// `[[models]]` entry of the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub path: String,
    /// Route requests through the access engine
    pub security: bool,
    pub owner_seed: Option<OwnerSeed>,
    pub static_roles: Option<StaticRoles>,
    pub properties_roles: BTreeMap<String, Vec<String>>,
    /// Grant create to any authenticated caller
    pub allow_authenticated_create: bool,
    pub find: FindRouteConfig,
    pub find_one: FindOneRouteConfig,
    pub client_config: Option<Value>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: String::new(),
            security: true,
            owner_seed: None,
            static_roles: None,
            properties_roles: BTreeMap::new(),
            allow_authenticated_create: false,
            find: FindRouteConfig::default(),
            find_one: FindOneRouteConfig::default(),
            client_config: None,
        }
    }
}

impl ModelConfig {
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Invalid model: name cannot be empty");
        }
        if self.normalized_path() == "/" {
            bail!("Invalid model '{}': path cannot be empty or '/'", self.name);
        }
        if self.find.limit == Some(0) {
            bail!("Invalid model '{}': find.limit must be greater than 0", self.name);
        }
        if let Some(PaginateSetting::Keys(keys)) = &self.find.paginate {
            keys.validate().with_context(|| format!("model '{}'", self.name))?;
        }
        self.routes().map(|_| ())
    }

    fn routes(&self) -> Result<RouteDefaults> {
        let parse_filter = |value: &Option<Value>, what: &str| -> Result<Filter> {
            value
                .as_ref()
                .map(Filter::from_json)
                .transpose()
                .with_context(|| format!("model '{}': invalid {}", self.name, what))
                .map(Option::unwrap_or_default)
        };

        let sort = self
            .find
            .sort
            .as_ref()
            .map(SortKey::parse_all)
            .transpose()
            .with_context(|| format!("model '{}': invalid find.sort", self.name))?
            .unwrap_or_default();

        let pagination = match &self.find.paginate {
            None | Some(PaginateSetting::Enabled(true)) => PaginationMode::Global,
            Some(PaginateSetting::Enabled(false)) => PaginationMode::Disabled,
            Some(PaginateSetting::Keys(keys)) => PaginationMode::Keys(keys.clone()),
        };

        Ok(RouteDefaults {
            filter: parse_filter(&self.find.filter, "find.where")?,
            limit: self.find.limit,
            sort,
            pagination,
            find_one_filter: parse_filter(&self.find_one.filter, "find_one.where")?,
            find_one_select: self.find_one.select.clone(),
        })
    }

    pub fn into_definition(self) -> Result<ModelDefinition> {
        let routes = self.routes()?;

        let base = if self.security { ModelSecurity::enabled() } else { ModelSecurity::disabled() };
        let mut security = base.with_properties_roles(self.properties_roles.clone());
        if let Some(roles) = self.static_roles.clone() {
            security = security.with_static_roles(roles);
        }
        if let Some(seed) = self.owner_seed {
            security = security.with_owner_seed(seed);
        }
        if self.allow_authenticated_create {
            security = security.with_overrides(Arc::new(AuthenticatedCreate));
        }

        let mut definition = ModelDefinition::new(self.name, &self.path)
            .secured(security)
            .with_routes(routes);
        if let Some(client_config) = self.client_config {
            definition = definition.with_client_config(client_config);
        }
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_seed_defaults() {
        assert_eq!(ModelSecurity::enabled().owner_seed(), OwnerSeed::Creator);
        let with_roles = ModelSecurity::enabled().with_static_roles(StaticRoles::default());
        assert_eq!(with_roles.owner_seed(), OwnerSeed::Nobody);
        assert_eq!(with_roles.with_owner_seed(OwnerSeed::Record).owner_seed(), OwnerSeed::Record);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("api/posts/"), "/api/posts");
        assert_eq!(normalize_path("/api/posts"), "/api/posts");
        assert_eq!(ModelDefinition::new("p", "/p/").base_path, "/p");
    }

    #[test]
    fn test_model_config_into_definition() {
        let config: ModelConfig = toml::from_str(
            r#"
name = "employees"
path = "/api/employees"
allow_authenticated_create = true

[static_roles]
write_roles = ["hr"]

[properties_roles]
salary = ["hr"]

[find]
where = { active = true }
limit = 25
sort = "-hired"
paginate = false

[find_one]
select = "-notes"
"#,
        )
        .unwrap();
        assert!(config.validate().is_ok());

        let def = config.into_definition().unwrap();
        assert_eq!(def.base_path, "/api/employees");
        assert!(def.security.enabled);
        assert!(def.security.overrides.is_some());
        assert_eq!(def.security.owner_seed(), OwnerSeed::Nobody);
        assert_eq!(def.routes.filter, Filter::eq("active", true));
        assert_eq!(def.routes.limit, Some(25));
        assert_eq!(def.routes.sort, vec![SortKey::desc("hired")]);
        assert_eq!(def.routes.pagination, PaginationMode::Disabled);
        assert_eq!(def.routes.find_one_select.as_deref(), Some("-notes"));
    }

    #[test]
    fn test_paginate_keys_table() {
        let config: ModelConfig = toml::from_str(
            r#"
name = "posts"
path = "/posts"
[find.paginate]
data = "items"
"#,
        )
        .unwrap();
        let def = config.into_definition().unwrap();
        match def.routes.pagination {
            PaginationMode::Keys(keys) => assert_eq!(keys.data, "items"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_model_config() {
        let bad_where = ModelConfig {
            name: "x".into(),
            path: "/x".into(),
            find: FindRouteConfig { filter: Some(json!({"$where": 1})), ..Default::default() },
            ..Default::default()
        };
        assert!(bad_where.validate().is_err());

        let no_path = ModelConfig { name: "x".into(), ..Default::default() };
        assert!(no_path.validate().is_err());
    }

    #[test]
    fn test_groups_model_is_admin_only() {
        let def = ModelDefinition::groups("/api/groups/", ["admin"]);
        assert_eq!(def.base_path, "/api/groups");
        assert!(def.security.enabled);
        assert_eq!(def.security.owner_seed(), OwnerSeed::Nobody);
        let roles = def.security.static_roles.clone().unwrap();
        assert_eq!(roles.write_roles, vec!["admin"]);
        assert_eq!(roles.delete_roles, vec!["admin"]);

        let validate = def.validator.unwrap();
        assert!(validate(&json!({"members": ["u1"], "permissions": ["hr"]})).is_ok());
        assert!(validate(&json!({"permissions": "hr"})).is_err());
    }

    #[test]
    fn test_transforms() {
        let def = ModelDefinition::new("p", "/p").with_create_transform(|mut v| {
            v["slug"] = json!("generated");
            v
        });
        let transform = def.create_transform.unwrap();
        assert_eq!(transform(json!({}))["slug"], "generated");
    }
}
