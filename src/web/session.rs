use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
}

/// Sign a bearer token for `user_id`. Token issuance belongs to the auth
/// subsystem; this lives here so the verification path has a counterpart
/// to test against.
pub fn sign_session(user_id: &str, key: &[u8]) -> Result<String, SessionError> {
    let exp = Utc::now() + Duration::hours(24);
    let payload = format!("{}|{}", user_id, exp.timestamp());
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

/// Verify a bearer token and return the authenticated public user id.
pub fn verify_session(token: &str, key: &[u8]) -> Result<String, SessionError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(SessionError::Invalid);
    }
    let payload_bytes = general_purpose::STANDARD
        .decode(parts[0])
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(parts[1])
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let (user_id, exp_raw) = payload.rsplit_once('|').ok_or(SessionError::Invalid)?;
    if user_id.is_empty() {
        return Err(SessionError::Invalid);
    }
    let exp: i64 = exp_raw.parse().map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(user_id.to_string())
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(axum::http::header::AUTHORIZATION)?;
    let val = auth.to_str().ok()?;
    let bearer = val.strip_prefix("Bearer ")?;
    Some(bearer.trim().to_string())
}

/// Axum extractor carrying the authenticated public user id.
pub struct AuthedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
    crate::state::SharedState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared = crate::state::SharedState::from_ref(state);

        let token = extract_bearer(&parts.headers).ok_or(ApiError::Unauthorized)?;
        let user_id = verify_session(&token, &shared.config.session_key).map_err(|e| {
            tracing::warn!("session verification failed: {}", e);
            ApiError::Unauthorized
        })?;

        Ok(AuthedUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn sign_then_verify_round_trips_the_user_id() {
        let token = sign_session("seoin2744", KEY).unwrap();
        assert_eq!(verify_session(&token, KEY).unwrap(), "seoin2744");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = sign_session("seoin2744", KEY).unwrap();
        let forged = format!("{}x", token);
        assert!(verify_session(&forged, KEY).is_err());

        let other_key = b"ffffffffffffffffffffffffffffffff";
        assert!(matches!(
            verify_session(&token, other_key),
            Err(SessionError::Signature)
        ));
    }

    #[test]
    fn garbage_tokens_are_invalid() {
        assert!(matches!(
            verify_session("not-a-token", KEY),
            Err(SessionError::Invalid)
        ));
        assert!(matches!(
            verify_session("a.b.c", KEY),
            Err(SessionError::Invalid)
        ));
    }

    #[test]
    fn bearer_extraction_requires_the_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def".parse().unwrap(),
        );
        assert_eq!(extract_bearer(&headers).unwrap(), "abc.def");

        let mut bare = HeaderMap::new();
        bare.insert(axum::http::header::AUTHORIZATION, "abc.def".parse().unwrap());
        assert!(extract_bearer(&bare).is_none());
    }
}
