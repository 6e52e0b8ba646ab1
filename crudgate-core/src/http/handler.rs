//! Per-model HTTP handler

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde_json::Value;

use super::error::{bad_request, crud_error, method_not_allowed, not_found, unsupported_media_type};
use super::response::{json_response, outcome_response, Resp};
use crate::crud::{CrudController, CrudError};
use crate::query::ListQuery;

/// Request with its body already collected
pub type Req = Request<Bytes>;

/// Type-erased handler for one model's routes
#[async_trait::async_trait]
pub trait ModelHandler: Send + Sync {
    /// Handle a request; `path_segments` are relative to [`base_path`](Self::base_path)
    async fn handle_request(&self, req: Req, path_segments: &[&str]) -> Resp;

    fn model_name(&self) -> &str;

    fn base_path(&self) -> &str;
}

/// REST routes of a [`CrudController`]
///
/// - `GET    {base}`          list
/// - `GET    {base}/config`   client configuration
/// - `GET    {base}/{id}`     read one
/// - `POST   {base}`          create
/// - `PUT    {base}/{id}`     update
/// - `DELETE {base}/{id}`     delete
pub struct CrudHttpHandler {
    controller: CrudController,
}

impl CrudHttpHandler {
    pub fn new(controller: CrudController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &CrudController {
        &self.controller
    }

    fn has_json_content_type(req: &Req) -> bool {
        req.headers()
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false)
    }

    fn list_query(req: &Req) -> Result<ListQuery, CrudError> {
        Ok(ListQuery::from_query_string(req.uri().query())?)
    }

    fn json_body(req: &Req) -> Result<Value, Resp> {
        if !Self::has_json_content_type(req) {
            return Err(unsupported_media_type());
        }
        if req.body().is_empty() {
            return Err(bad_request("Request body is empty"));
        }
        serde_json::from_slice(req.body()).map_err(|e| bad_request(&format!("Invalid JSON: {}", e)))
    }

    async fn handle_list(&self, req: Req) -> Resp {
        let query = match Self::list_query(&req) {
            Ok(q) => q,
            Err(e) => return crud_error(&e),
        };
        let result = self.controller.list(req.headers(), query).await;
        outcome_response(result.map(|o| o.map(|list| list.to_json())), StatusCode::OK)
    }

    async fn handle_get(&self, req: Req, id: &str) -> Resp {
        let query = match Self::list_query(&req) {
            Ok(q) => q,
            Err(e) => return crud_error(&e),
        };
        outcome_response(self.controller.get(req.headers(), id, query).await, StatusCode::OK)
    }

    async fn handle_create(&self, req: Req) -> Resp {
        let body = match Self::json_body(&req) {
            Ok(body) => body,
            Err(resp) => return resp,
        };
        outcome_response(self.controller.create(req.headers(), body).await, StatusCode::CREATED)
    }

    async fn handle_update(&self, req: Req, id: &str) -> Resp {
        let body = match Self::json_body(&req) {
            Ok(body) => body,
            Err(resp) => return resp,
        };
        outcome_response(self.controller.update(req.headers(), id, body).await, StatusCode::OK)
    }
}

#[async_trait::async_trait]
impl ModelHandler for CrudHttpHandler {
    async fn handle_request(&self, req: Req, path_segments: &[&str]) -> Resp {
        let method = req.method().clone();
        match (&method, path_segments) {
            (&Method::GET, []) => self.handle_list(req).await,
            (&Method::POST, []) => self.handle_create(req).await,
            (_, []) => method_not_allowed("GET, POST"),

            (&Method::GET, ["config"]) => {
                json_response(StatusCode::OK, &self.controller.client_config())
            }
            (_, ["config"]) => method_not_allowed("GET"),

            (&Method::GET, [id]) => self.handle_get(req, id).await,
            (&Method::PUT, [id]) => self.handle_update(req, id).await,
            (&Method::DELETE, [id]) => outcome_response(
                self.controller.delete(req.headers(), id).await,
                StatusCode::OK,
            ),
            (_, [_]) => method_not_allowed("GET, PUT, DELETE"),

            _ => not_found("No such route"),
        }
    }

    fn model_name(&self) -> &str {
        &self.controller.model().name
    }

    fn base_path(&self) -> &str {
        &self.controller.model().base_path
    }
}

