use hyper::StatusCode;
use serde_json::json;

use super::response::{json_response, Resp};
use crate::access::AccessError;
use crate::crud::CrudError;
use crate::store::StoreError;

/// Build a JSON error response with a uniform shape
/// {
///   "error": "snake_code",
///   "message": "Human readable detail"
/// }
pub fn json_error(status: StatusCode, code: &str, message: &str) -> Resp {
    json_response(status, &json!({ "error": code, "message": message }))
}

/// 405 Method Not Allowed with Allow header
pub fn method_not_allowed(allowed: &'static str) -> Resp {
    let mut resp = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &json!({ "error": "method_not_allowed", "allow": allowed }),
    );
    resp.headers_mut()
        .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static(allowed));
    resp
}

pub fn not_found(message: &str) -> Resp {
    json_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn permission_denied() -> Resp {
    json_error(StatusCode::FORBIDDEN, "permission_denied", "Permission denied")
}

pub fn bad_request(message: &str) -> Resp {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

pub fn unsupported_media_type() -> Resp {
    json_error(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "unsupported_media_type",
        "Content-Type must be application/json",
    )
}

pub fn payload_too_large(limit: usize) -> Resp {
    json_error(
        StatusCode::PAYLOAD_TOO_LARGE,
        "payload_too_large",
        &format!("Request body exceeds {} bytes", limit),
    )
}

/// Status and code for a failed CRUD operation
pub fn error_status(err: &CrudError) -> (StatusCode, &'static str) {
    match err {
        CrudError::Access(AccessError::InvalidToken(_)) => (StatusCode::UNAUTHORIZED, "invalid_token"),
        CrudError::Access(AccessError::AuthenticationRequired) => {
            (StatusCode::UNAUTHORIZED, "authentication_required")
        }
        CrudError::Access(AccessError::DependencyUnavailable(_))
        | CrudError::Store(StoreError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "dependency_unavailable")
        }
        CrudError::Access(AccessError::PermissionDenied) => (StatusCode::FORBIDDEN, "permission_denied"),
        CrudError::Access(AccessError::RecordNotFound) => (StatusCode::NOT_FOUND, "not_found"),
        CrudError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        CrudError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    }
}

pub fn crud_error(err: &CrudError) -> Resp {
    let (status, code) = error_status(err);
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    } else {
        log::debug!("Request rejected ({}): {}", status, err);
    }
    json_error(status, code, &err.to_string())
}
