use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::Value;

use super::error::{crud_error, not_found, permission_denied};
use crate::crud::{CrudError, Outcome};

pub type RespBody = BoxBody<Bytes, Infallible>;
pub type Resp = Response<RespBody>;

#[inline]
pub(crate) fn body_from<T: Into<Bytes>>(data: T) -> RespBody {
    Full::new(data.into()).boxed()
}

pub fn json_response(status: StatusCode, body: &Value) -> Resp {
    let mut resp = Response::new(body_from(body.to_string()));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Map a controller result onto a response, `status` on success
pub fn outcome_response(result: Result<Outcome<Value>, CrudError>, status: StatusCode) -> Resp {
    match result {
        Ok(Outcome::Ok(body)) => json_response(status, &body),
        Ok(Outcome::Denied) => permission_denied(),
        Ok(Outcome::NotFound) => not_found("Record not found"),
        Err(err) => crud_error(&err),
    }
}
