//! Crudgate - Core
//!
//! Declare a model once and get REST-shaped CRUD endpoints whose records and
//! fields are filtered by the caller's identity and group roles.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use crudgate_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let groups = Arc::new(MemoryRecordStore::new());
//!     let articles = ModelDefinition::new("articles", "/api/articles")
//!         .secured(ModelSecurity::enabled().with_property_roles("salary", ["hr"]));
//!
//!     CrudServer::new()
//!         .with_port(3000)
//!         .with_model(ModelDefinition::groups("/api/groups", ["admin"]), groups.clone())
//!         .with_group_store(Arc::new(CollectionGroupStore::new(groups)))
//!         .with_model(articles, Arc::new(MemoryRecordStore::new()))
//!         .serve()
//!         .await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`access`] - principal resolution, role aggregation and access decisions
//! - [`crud`] - list/get/create/update/delete orchestration
//! - [`http`] - hyper server exposing the models
//! - [`store`] - record and group storage collaborators
//! - [`query`] - filter expressions, list parameters, pagination
//! - [`model`] - model declarations and their security settings
//! - [`config`] / [`logging`] - layered configuration and log setup
//!
//! Every record of a secured model carries six permission fields: owner ids
//! and role tags for read, write and delete. A caller may act on a record when
//! their id is among the owners or one of their roles is among the role tags.

pub mod access;
pub mod config; // Layered TOML/env configuration
pub mod crud;
pub mod http;
pub mod logging; // env_logger setup with human/json/logfmt output
pub mod model;
pub mod query;
pub mod store;

pub mod prelude;

pub use crate::access::{AccessContext, AccessEngine, AccessError, Operation, Principal};
pub use crate::config::CrudgateConfig;
pub use crate::crud::{CrudController, CrudError, Outcome};
pub use crate::http::{CrudHttpHandler, CrudServer, Router};
pub use crate::model::{ModelDefinition, ModelSecurity, StaticRoles};
