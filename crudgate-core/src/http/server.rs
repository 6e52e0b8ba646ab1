//! Server builder, path routing and the hyper accept loop

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::{Method, Request, StatusCode};
use serde_json::json;

use super::error::{bad_request, not_found, payload_too_large};
use super::handler::{CrudHttpHandler, ModelHandler, Req};
use super::response::{json_response, Resp};
use crate::access::AccessEngine;
use crate::config::CrudgateConfig;
use crate::crud::CrudController;
use crate::model::{BodyValidator, ModelDefinition};
use crate::store::{CollectionGroupStore, Group, GroupMembershipStore, MemoryRecordStore, RecordStore};

/// Declarative server builder
///
/// ```rust,ignore
/// CrudServer::with_config(config)
///     .with_configured_models()?
///     .serve()
///     .await?;
/// ```
pub struct CrudServer {
    config: CrudgateConfig,
    groups: Option<Arc<dyn GroupMembershipStore>>,
    models: Vec<(ModelDefinition, Arc<dyn RecordStore>)>,
}

impl Default for CrudServer {
    fn default() -> Self {
        Self::new()
    }
}

impl CrudServer {
    pub fn new() -> Self {
        Self::with_config(CrudgateConfig::default())
    }

    pub fn with_config(config: CrudgateConfig) -> Self {
        Self { config, groups: None, models: Vec::new() }
    }

    pub fn config(&self) -> &CrudgateConfig {
        &self.config
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_group_store(mut self, groups: Arc<dyn GroupMembershipStore>) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn with_model(mut self, model: ModelDefinition, store: Arc<dyn RecordStore>) -> Self {
        self.models.push((model, store));
        self
    }

    /// Register every `[[models]]` entry on its own in-memory store
    pub fn with_configured_models(mut self) -> Result<Self> {
        for model in self.config.models.clone() {
            let name = model.name.clone();
            let definition = model
                .into_definition()
                .with_context(|| format!("Invalid model '{}'", name))?;
            self.models.push((definition, Arc::new(MemoryRecordStore::new())));
        }
        Ok(self)
    }

    /// Group store to use: the explicit one, else the model served at `security.groups_path`
    ///
    /// A groups model that backs the store must be secured, and its writes are
    /// checked as group documents.
    fn resolve_group_store(&mut self) -> Result<Option<Arc<dyn GroupMembershipStore>>> {
        if let Some(groups) = &self.groups {
            return Ok(Some(groups.clone()));
        }
        let groups_path = crate::model::normalize_path(&self.config.security.groups_path);
        let Some((model, store)) = self.models.iter_mut().find(|(model, _)| model.base_path == groups_path)
        else {
            return Ok(None);
        };
        if !model.security.enabled {
            bail!(
                "The groups model '{}' at {} grants roles and must be secured",
                model.name,
                groups_path
            );
        }
        if model.validator.is_none() {
            let check: BodyValidator = Arc::new(Group::check_document);
            model.validator = Some(check);
        }
        log::debug!("Using the model at {} as group membership store", groups_path);
        let groups: Arc<dyn GroupMembershipStore> = Arc::new(CollectionGroupStore::new(store.clone()));
        Ok(Some(groups))
    }

    /// Validate the configuration and build the request router
    pub fn into_router(mut self) -> Result<Router> {
        self.config.validate()?;

        let resolved = self.resolve_group_store()?;
        let secured: Vec<&str> = self
            .models
            .iter()
            .filter(|(model, _)| model.security.enabled)
            .map(|(model, _)| model.name.as_str())
            .collect();

        let groups: Arc<dyn GroupMembershipStore> = match resolved {
            Some(groups) => groups,
            None if secured.is_empty() => {
                Arc::new(CollectionGroupStore::new(Arc::new(MemoryRecordStore::new())))
            }
            None => bail!(
                "Secured models ({}) need a group store: call with_group_store or serve a model at {}",
                secured.join(", "),
                self.config.security.groups_path
            ),
        };

        let engine = Arc::new(AccessEngine::from_config(&self.config.security, groups));
        let mut handlers: Vec<Arc<dyn ModelHandler>> = Vec::with_capacity(self.models.len());
        for (model, store) in self.models {
            if handlers.iter().any(|h| h.base_path() == model.base_path) {
                bail!("Duplicate model path '{}'", model.base_path);
            }
            log::info!(
                "   ✓ {} at {}{}",
                model.name,
                model.base_path,
                if model.security.enabled { " (secured)" } else { "" }
            );
            let controller = CrudController::new(model, store, engine.clone(), self.config.pagination.clone());
            handlers.push(Arc::new(CrudHttpHandler::new(controller)));
        }
        // Longest base path first so nested paths win
        handlers.sort_by(|a, b| b.base_path().len().cmp(&a.base_path().len()));

        Ok(Router { handlers, max_body_size: self.config.server.max_body_size })
    }

    /// Bind and serve until the process stops
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.bind_address();
        log::info!("🚀 Starting Crudgate server");
        let router = self.into_router()?;

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        log::info!("✅ Server listening on http://{}", addr);

        router.serve(listener).await
    }
}

/// Dispatches requests to the model handlers
#[derive(Clone)]
pub struct Router {
    handlers: Vec<Arc<dyn ModelHandler>>,
    max_body_size: usize,
}

impl Router {
    pub fn handlers(&self) -> &[Arc<dyn ModelHandler>] {
        &self.handlers
    }

    /// Route a request whose body has been collected
    pub async fn dispatch(&self, req: Req) -> Resp {
        let path = req.uri().path().to_string();
        log::debug!("{} {}", req.method(), path);

        if path == "/health" {
            return if req.method() == Method::GET {
                json_response(StatusCode::OK, &json!({ "status": "ok" }))
            } else {
                super::error::method_not_allowed("GET")
            };
        }

        for handler in &self.handlers {
            let Some(rest) = strip_base(&path, handler.base_path()) else {
                continue;
            };
            let segments: Vec<String> = rest
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
                .collect();
            let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
            return handler.handle_request(req, &segments).await;
        }

        not_found(&format!("No route for {}", path))
    }

    /// Collect a streaming body under the size limit, then dispatch
    pub async fn handle(&self, req: Request<Incoming>) -> Result<Resp, Infallible> {
        let declared = req
            .headers()
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > self.max_body_size) {
            return Ok(payload_too_large(self.max_body_size));
        }

        let (parts, body) = req.into_parts();
        let bytes: Bytes = match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                return Ok(payload_too_large(self.max_body_size));
            }
            Err(err) => {
                log::debug!("Failed to read request body: {}", err);
                return Ok(bad_request("Invalid body"));
            }
        };

        Ok(self.dispatch(Request::from_parts(parts, bytes)).await)
    }

    /// Accept connections on `listener` forever
    pub async fn serve(self, listener: tokio::net::TcpListener) -> Result<()> {
        let router = Arc::new(self);
        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let router = router.clone();

            tokio::spawn(async move {
                let io = hyper_util::rt::TokioIo::new(stream);

                let service = hyper::service::service_fn(move |req| {
                    let router = router.clone();
                    async move { router.handle(req).await }
                });

                if let Err(err) = hyper::server::conn::http1::Builder::new()
                    .serve_connection(io, service)
                    .await
                {
                    log::error!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }
}

/// Remainder of `path` below `base`, if `path` is `base` or nested under it
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') || base == "/" {
        Some(rest)
    } else {
        None
    }
}
