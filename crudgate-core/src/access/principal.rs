//! Caller identity resolution

use std::sync::Arc;

use http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::cookie::cookie_value;
use super::error::AccessError;
use super::token::TokenDecoder;

/// The caller of a request, anonymous when no token was presented
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    user_id: Option<String>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// An empty id is treated as anonymous
    pub fn user(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.is_empty() {
            Self::anonymous()
        } else {
            Self { user_id: Some(id) }
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Where the token is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    #[default]
    Cookie,
    Header,
}

impl std::str::FromStr for TokenSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cookie" => Ok(TokenSource::Cookie),
            "header" => Ok(TokenSource::Header),
            other => Err(format!("unknown token source '{}'", other)),
        }
    }
}

/// Extracts the token from a request and decodes it into a [`Principal`]
#[derive(Clone)]
pub struct PrincipalResolver {
    source: TokenSource,
    key: String,
    decoder: Arc<dyn TokenDecoder>,
}

impl PrincipalResolver {
    pub fn new(source: TokenSource, key: impl Into<String>, decoder: Arc<dyn TokenDecoder>) -> Self {
        Self { source, key: key.into(), decoder }
    }

    /// Raw token for this request, if any
    pub fn extract_token(&self, headers: &HeaderMap) -> Option<String> {
        let token = match self.source {
            TokenSource::Cookie => headers
                .get_all(http::header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .filter_map(|raw| cookie_value(raw, &self.key))
                .last(),
            TokenSource::Header => headers
                .get(self.key.as_str())
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim())
                .map(|v| v.strip_prefix("Bearer ").unwrap_or(v).trim().to_string()),
        };
        token.filter(|t| !t.is_empty())
    }

    /// Anonymous when no token is present, an error when one is present but invalid
    pub fn resolve(&self, headers: &HeaderMap) -> Result<Principal, AccessError> {
        match self.extract_token(headers) {
            Some(token) => self.decoder.decode(&token),
            None => Ok(Principal::anonymous()),
        }
    }
}
