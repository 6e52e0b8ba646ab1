//! Bearer token decoding
//!
//! Tokens are compact JWTs. With a secret configured the HS256 signature is
//! checked; without one the payload is decoded as-is, which is only safe
//! behind a gateway that already verified it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use super::error::AccessError;
use super::principal::Principal;

type HmacSha256 = Hmac<Sha256>;

/// Turns a raw token into a principal
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<Principal, AccessError>;
}

/// JWT decoder reading the user id from a configurable claim
#[derive(Clone)]
pub struct JwtDecoder {
    secret: Option<Vec<u8>>,
    claim: String,
}

impl JwtDecoder {
    /// Decoder that requires a valid HS256 signature
    pub fn verified(secret: impl AsRef<[u8]>, claim: impl Into<String>) -> Self {
        Self { secret: Some(secret.as_ref().to_vec()), claim: claim.into() }
    }

    /// Decoder that trusts the payload without checking the signature
    pub fn unverified(claim: impl Into<String>) -> Self {
        Self { secret: None, claim: claim.into() }
    }

    pub fn verifies_signature(&self) -> bool {
        self.secret.is_some()
    }

    /// Mint an HS256 token for `claims`
    pub fn encode(secret: impl AsRef<[u8]>, claims: &Value) -> Result<String, AccessError> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload_json = serde_json::to_vec(claims)
            .map_err(|e| AccessError::InvalidToken(format!("claims not serializable: {}", e)))?;
        let payload = URL_SAFE_NO_PAD.encode(payload_json);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = HmacSha256::new_from_slice(secret.as_ref())
            .map_err(|e| AccessError::InvalidToken(format!("bad secret: {}", e)))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    fn decode_segment(segment: &str) -> Result<Vec<u8>, AccessError> {
        URL_SAFE_NO_PAD
            .decode(segment.trim_end_matches('='))
            .map_err(|e| AccessError::InvalidToken(format!("base64 decode error: {}", e)))
    }

    fn verify_signature(
        secret: &[u8],
        header: &str,
        payload: &str,
        signature: &str,
    ) -> Result<(), AccessError> {
        let header_json: Value = serde_json::from_slice(&Self::decode_segment(header)?)
            .map_err(|_| AccessError::InvalidToken("malformed header".to_string()))?;
        if header_json.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Err(AccessError::InvalidToken("unsupported algorithm".to_string()));
        }

        let signature_bytes = Self::decode_segment(signature)?;
        let mut mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| AccessError::InvalidToken(format!("bad secret: {}", e)))?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature_bytes)
            .map_err(|_| AccessError::InvalidToken("signature mismatch".to_string()))
    }
}

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Principal, AccessError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(AccessError::InvalidToken("expected three segments".to_string()));
        };

        if let Some(secret) = &self.secret {
            Self::verify_signature(secret, header, payload, signature)?;
        }

        let claims: Value = serde_json::from_slice(&Self::decode_segment(payload)?)
            .map_err(|_| AccessError::InvalidToken("malformed payload".to_string()))?;

        if let Some(exp) = claims.get("exp").and_then(Value::as_i64) {
            if exp <= chrono::Utc::now().timestamp() {
                return Err(AccessError::InvalidToken("token expired".to_string()));
            }
        }

        let user_id = match claims.get(&self.claim) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AccessError::InvalidToken(format!(
                    "missing '{}' claim",
                    self.claim
                )))
            }
        };

        Ok(Principal::user(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_encode_and_verify() {
        let token = JwtDecoder::encode(SECRET, &json!({"_id": "u1"})).unwrap();
        let decoder = JwtDecoder::verified(SECRET, "_id");
        let principal = decoder.decode(&token).unwrap();
        assert_eq!(principal.user_id(), Some("u1"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtDecoder::encode("other", &json!({"_id": "u1"})).unwrap();
        let decoder = JwtDecoder::verified(SECRET, "_id");
        assert!(matches!(decoder.decode(&token), Err(AccessError::InvalidToken(_))));
    }

    #[test]
    fn test_unverified_ignores_signature() {
        let token = JwtDecoder::encode("whatever", &json!({"_id": "u2"})).unwrap();
        let decoder = JwtDecoder::unverified("_id");
        assert_eq!(decoder.decode(&token).unwrap().user_id(), Some("u2"));
    }

    #[test]
    fn test_numeric_claim() {
        let token = JwtDecoder::encode(SECRET, &json!({"sub": 42})).unwrap();
        let decoder = JwtDecoder::verified(SECRET, "sub");
        assert_eq!(decoder.decode(&token).unwrap().user_id(), Some("42"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let exp = chrono::Utc::now().timestamp() - 60;
        let token = JwtDecoder::encode(SECRET, &json!({"_id": "u1", "exp": exp})).unwrap();
        let decoder = JwtDecoder::verified(SECRET, "_id");
        assert!(decoder.decode(&token).is_err());
    }

    #[test]
    fn test_missing_claim_and_garbage() {
        let token = JwtDecoder::encode(SECRET, &json!({"name": "x"})).unwrap();
        let decoder = JwtDecoder::verified(SECRET, "_id");
        assert!(decoder.decode(&token).is_err());
        assert!(decoder.decode("not-a-token").is_err());
        assert!(JwtDecoder::unverified("_id").decode("a.b").is_err());
    }
}
