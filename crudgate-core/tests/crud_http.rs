//! End-to-end tests of the HTTP surface over in-memory stores

use std::sync::Arc;

use bytes::Bytes;
use crudgate_core::access::{AuthenticatedCreate, JwtDecoder};
use crudgate_core::config::CrudgateConfig;
use crudgate_core::http::{Resp, Router};
use crudgate_core::model::{ModelDefinition, ModelSecurity};
use crudgate_core::store::{Group, GroupMembershipStore, MemoryRecordStore, RecordStore, StoreError};
use crudgate_core::CrudServer;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};

const SECRET: &str = "integration-secret";

struct DownGroups;

#[async_trait::async_trait]
impl GroupMembershipStore for DownGroups {
    async fn find_groups_containing_member(&self, _user_id: &str) -> Result<Vec<Group>, StoreError> {
        Err(StoreError::Unavailable("group collection offline".to_string()))
    }
}

struct Fixture {
    router: Router,
    groups: Arc<MemoryRecordStore>,
    posts: Arc<MemoryRecordStore>,
}

fn config() -> CrudgateConfig {
    let mut config = CrudgateConfig::default();
    config.security.jwt_secret = Some(SECRET.to_string());
    config
}

fn posts_model() -> ModelDefinition {
    ModelDefinition::new("posts", "/api/posts").secured(
        ModelSecurity::enabled()
            .with_property_roles("salary", ["hr"])
            .with_overrides(Arc::new(AuthenticatedCreate)),
    )
}

async fn fixture() -> Fixture {
    let groups = Arc::new(MemoryRecordStore::new());
    for group in [
        json!({"name": "g1", "members": ["u3"], "permissions": ["editor"]}),
        json!({"name": "hr", "members": ["u4"], "permissions": ["hr"]}),
        json!({"name": "devs", "members": ["u5", "u4"], "permissions": ["dev"]}),
        json!({"name": "admins", "members": ["root"], "permissions": ["admin"]}),
    ] {
        groups.create(group).await.unwrap();
    }

    let posts = Arc::new(MemoryRecordStore::new());
    let router = CrudServer::with_config(config())
        .with_model(ModelDefinition::groups("/api/groups", ["admin"]), groups.clone())
        .with_model(posts_model(), posts.clone())
        .with_model(ModelDefinition::new("notes", "/api/notes"), Arc::new(MemoryRecordStore::new()))
        .into_router()
        .unwrap();
    Fixture { router, groups, posts }
}

fn token(user: &str) -> String {
    JwtDecoder::encode(SECRET, &json!({"_id": user})).unwrap()
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Bytes> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("cookie", format!("theme=dark; Authorization={}", token(user)));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Bytes::from(body.to_string())
        }
        None => Bytes::new(),
    };
    builder.body(body).unwrap()
}

async fn send(router: &Router, req: Request<Bytes>) -> (StatusCode, Value) {
    let resp: Resp = router.dispatch(req).await;
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn list_uri(query: &Value) -> String {
    format!("/api/posts?query={}", urlencoding::encode(&query.to_string()))
}

#[tokio::test]
async fn test_creator_owns_new_record() {
    let fx = fixture().await;
    let (status, body) = send(
        &fx.router,
        request(
            Method::POST,
            "/api/posts",
            Some("u1"),
            Some(json!({"title": "hello", "permissionReaderRoles": ["everyone"]})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "hello");
    assert!(body["id"].as_str().is_some());
    assert_eq!(body["permissionReaderUserId"], json!(["u1"]));
    assert_eq!(body["permissionWriterUserId"], json!(["u1"]));
    assert_eq!(body["permissionDeleteUserId"], json!(["u1"]));
    // Client-supplied permission fields are discarded
    assert_eq!(body["permissionReaderRoles"], json!([]));
}

#[tokio::test]
async fn test_anonymous_create_denied() {
    let fx = fixture().await;
    let (status, body) =
        send(&fx.router, request(Method::POST, "/api/posts", None, Some(json!({"title": "x"})))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");
    assert!(fx.posts.is_empty().await);
}

#[tokio::test]
async fn test_stranger_cannot_read_record() {
    let fx = fixture().await;
    let (_, created) =
        send(&fx.router, request(Method::POST, "/api/posts", Some("u1"), Some(json!({"title": "t"})))).await;
    let uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&fx.router, request(Method::GET, &uri, Some("u2"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&fx.router, request(Method::GET, &uri, Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "t");
}

#[tokio::test]
async fn test_group_role_grants_update() {
    let fx = fixture().await;
    fx.posts
        .create(json!({
            "id": "r1",
            "title": "draft",
            "permissionReaderRoles": [],
            "permissionWriterRoles": ["editor"],
            "permissionDeleteRoles": [],
            "permissionReaderUserId": [],
            "permissionWriterUserId": [],
            "permissionDeleteUserId": [],
        }))
        .await
        .unwrap();

    let (status, body) = send(
        &fx.router,
        request(
            Method::PUT,
            "/api/posts/r1",
            Some("u3"),
            Some(json!({"title": "edited", "permissionWriterRoles": ["anyone"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "edited");
    assert_eq!(body["permissionWriterRoles"], json!(["editor"]));

    let (status, _) = send(
        &fx.router,
        request(Method::PUT, "/api/posts/r1", Some("u2"), Some(json!({"title": "nope"}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &fx.router,
        request(Method::PUT, "/api/posts/missing", Some("u3"), Some(json!({"title": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_field_masked_in_list() {
    let fx = fixture().await;
    fx.posts
        .create(json!({
            "id": "p1",
            "name": "Ada",
            "salary": 100,
            "permissionReaderRoles": ["dev"],
        }))
        .await
        .unwrap();

    let (status, body) = send(&fx.router, request(Method::GET, "/api/posts", Some("u5"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["lastPage"], 1);
    assert_eq!(body["page"], 1);
    assert_eq!(body["data"][0]["name"], "Ada");
    assert!(body["data"][0].get("salary").is_none());

    // Asking for the field explicitly does not help
    let (_, body) =
        send(&fx.router, request(Method::GET, "/api/posts?select=name,salary", Some("u5"), None)).await;
    assert!(body["data"][0].get("salary").is_none());
    assert_eq!(body["data"][0]["name"], "Ada");

    let (_, body) = send(&fx.router, request(Method::GET, "/api/posts", Some("u4"), None)).await;
    assert_eq!(body["data"][0]["salary"], 100);
}

#[tokio::test]
async fn test_caller_filter_cannot_widen_visibility() {
    let fx = fixture().await;
    fx.posts
        .create(json!({"id": "s1", "title": "secret", "permissionReaderUserId": ["u1"]}))
        .await
        .unwrap();

    let escape = json!({"where": {"$or": [{"title": "secret"}, {"title": {"$ne": "secret"}}]}});
    let (status, body) = send(&fx.router, request(Method::GET, &list_uri(&escape), Some("u2"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (_, body) = send(&fx.router, request(Method::GET, &list_uri(&escape), Some("u1"), None)).await;
    assert_eq!(body["total"], 1);

    let (_, body) = send(&fx.router, request(Method::GET, "/api/posts", None, None)).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_pagination_envelope() {
    let fx = fixture().await;
    for i in 0..5 {
        fx.posts
            .create(json!({"id": format!("n{}", i), "rank": i, "permissionReaderUserId": ["u1"]}))
            .await
            .unwrap();
    }

    let query = json!({"limit": 2, "page": 2, "sort": {"rank": -1}});
    let (status, body) = send(&fx.router, request(Method::GET, &list_uri(&query), Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["lastPage"], 3);
    assert_eq!(body["page"], 2);
    let ranks: Vec<i64> = body["data"].as_array().unwrap().iter().map(|d| d["rank"].as_i64().unwrap()).collect();
    assert_eq!(ranks, vec![2, 1]);
}

#[tokio::test]
async fn test_delete_requires_delete_permission() {
    let fx = fixture().await;
    let (_, created) =
        send(&fx.router, request(Method::POST, "/api/posts", Some("u1"), Some(json!({"title": "bye"})))).await;
    let uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let (status, _) = send(&fx.router, request(Method::DELETE, &uri, Some("u2"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&fx.router, request(Method::DELETE, &uri, Some("u1"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "bye");

    let (status, _) = send(&fx.router, request(Method::DELETE, &uri, Some("u1"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(fx.posts.is_empty().await);
}

#[tokio::test]
async fn test_group_store_outage_fails_request() {
    let posts = Arc::new(MemoryRecordStore::new());
    posts.create(json!({"id": "x", "permissionReaderRoles": ["dev"]})).await.unwrap();
    let router = CrudServer::with_config(config())
        .with_group_store(Arc::new(DownGroups))
        .with_model(posts_model(), posts)
        .into_router()
        .unwrap();

    let (status, body) = send(&router, request(Method::GET, "/api/posts", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "dependency_unavailable");

    // Anonymous callers have no groups to look up
    let (status, _) = send(&router, request(Method::GET, "/api/posts", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unsecured_model_skips_permissions() {
    let fx = fixture().await;
    for title in ["a", "b"] {
        let (status, _) =
            send(&fx.router, request(Method::POST, "/api/notes", None, Some(json!({"title": title})))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&fx.router, request(Method::GET, "/api/notes", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let uri = format!("/api/notes/{}", body["data"][0]["id"].as_str().unwrap());
    let (status, _) = send(&fx.router, request(Method::DELETE, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_only_admins_manage_groups() {
    let fx = fixture().await;
    fx.posts
        .create(json!({"id": "hr1", "title": "secret", "permissionReaderRoles": ["hr"]}))
        .await
        .unwrap();

    let (status, _) = send(&fx.router, request(Method::GET, "/api/posts/hr1", Some("mallory"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let self_grant = json!({"name": "mine", "members": ["mallory"], "permissions": ["hr"]});
    let (status, body) =
        send(&fx.router, request(Method::POST, "/api/groups", Some("mallory"), Some(self_grant.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");
    let (status, _) =
        send(&fx.router, request(Method::POST, "/api/groups", None, Some(self_grant))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(fx.groups.len().await, 4);

    let (status, _) = send(&fx.router, request(Method::GET, "/api/posts/hr1", Some("mallory"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An admin may grant the role
    let grant = json!({"name": "audit", "members": ["mallory"], "permissions": ["hr"]});
    let (status, _) = send(&fx.router, request(Method::POST, "/api/groups", Some("root"), Some(grant))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&fx.router, request(Method::GET, "/api/posts/hr1", Some("mallory"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "secret");
}

#[tokio::test]
async fn test_malformed_group_rejected() {
    let fx = fixture().await;
    let (status, body) = send(
        &fx.router,
        request(
            Method::POST,
            "/api/groups",
            Some("root"),
            Some(json!({"members": ["u4"], "permissions": "oops"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert_eq!(fx.groups.len().await, 4);

    // Members of the rejected group keep working
    let (status, _) = send(&fx.router, request(Method::GET, "/api/posts", Some("u4"), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_masked_field_cannot_be_queried() {
    let fx = fixture().await;
    fx.posts
        .create(json!({"id": "p1", "name": "Ada", "salary": 123456, "permissionReaderRoles": ["dev"]}))
        .await
        .unwrap();

    for query in [
        json!({"where": {"salary": 123456}}),
        json!({"where": {"$or": [{"name": "x"}, {"salary": {"$ne": 0}}]}}),
        json!({"sort": {"salary": 1}}),
    ] {
        let (status, body) = send(&fx.router, request(Method::GET, &list_uri(&query), Some("u5"), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(body["error"], "bad_request");
    }
    let get_uri = format!("/api/posts/p1?query={}", urlencoding::encode(r#"{"where":{"salary":123456}}"#));
    let (status, _) = send(&fx.router, request(Method::GET, &get_uri, Some("u5"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Holders of the field role may still filter on it
    let query = json!({"where": {"salary": 123456}});
    let (status, body) = send(&fx.router, request(Method::GET, &list_uri(&query), Some("u4"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_selecting_only_masked_field_returns_id() {
    let fx = fixture().await;
    fx.posts
        .create(json!({"id": "p1", "name": "Ada", "salary": 100, "permissionReaderRoles": ["dev"]}))
        .await
        .unwrap();

    let (status, body) = send(&fx.router, request(Method::GET, "/api/posts?select=salary", Some("u5"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0], json!({"id": "p1"}));
}

#[tokio::test]
async fn test_protocol_errors() {
    let fx = fixture().await;

    let (status, body) = send(&fx.router, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _) = send(&fx.router, request(Method::GET, "/api/unknown", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let resp = fx.router.dispatch(request(Method::PATCH, "/api/posts/r1", Some("u1"), None)).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, PUT, DELETE");

    let plain = Request::builder()
        .method(Method::POST)
        .uri("/api/posts")
        .header("content-type", "text/plain")
        .body(Bytes::from_static(b"{}"))
        .unwrap();
    let (status, _) = send(&fx.router, plain).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let forged = Request::builder()
        .uri("/api/posts")
        .header("cookie", "Authorization=not.a.token")
        .body(Bytes::new())
        .unwrap();
    let (status, body) = send(&fx.router, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let (status, _) = send(&fx.router, request(Method::GET, "/api/posts?query=%7Bnot-json", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_client_config_route() {
    let settings = Arc::new(MemoryRecordStore::new());
    let router = CrudServer::with_config(config())
        .with_model(
            ModelDefinition::new("settings", "/api/settings").with_client_config(json!({"columns": ["name"]})),
            settings,
        )
        .into_router()
        .unwrap();

    let (status, body) = send(&router, request(Method::GET, "/api/settings/config", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"columns": ["name"]}));
}
