use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use crudgate_core::access::JwtDecoder;
use serde_json::{Map, Value};

/// Claims of a token for `user`, valid for `ttl` seconds
fn claims(user: &str, ttl: i64, claim: &str) -> Value {
    let now = Utc::now();
    let mut claims = Map::new();
    claims.insert(claim.to_string(), Value::String(user.to_string()));
    claims.insert("iat".to_string(), Value::from(now.timestamp()));
    claims.insert("exp".to_string(), Value::from((now + Duration::seconds(ttl)).timestamp()));
    Value::Object(claims)
}

pub fn run(user: &str, secret: &str, ttl: i64, claim: &str) -> Result<()> {
    if user.is_empty() {
        anyhow::bail!("user id cannot be empty");
    }
    if ttl <= 0 {
        anyhow::bail!("ttl must be positive");
    }
    let token = JwtDecoder::encode(secret, &claims(user, ttl, claim)).context("Failed to sign token")?;
    println!("{}", token);
    Ok(())
}
