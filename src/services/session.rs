// Session provider: signed session tokens mapped to an auth identity
// Tokens are HS256 JWTs carried either in the session cookie or as a Bearer header.

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

use crate::models::Customer;
use crate::store::{CustomerStore, StoreError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session expired")]
    Expired,

    #[error("Invalid session token")]
    Invalid,

    #[error("Session encoding error: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => SessionError::Expired,
            _ => SessionError::Invalid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    /// Auth identity of the caller
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl SessionService {
    pub fn new(secret: &str, cookie_name: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Sign a session for `identity` valid for `ttl_seconds`
    pub fn issue(&self, identity: &str, ttl_seconds: u64) -> Result<String, SessionError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| SessionError::Encoding(e.to_string()))?
            .as_secs();

        let claims = SessionClaims {
            sub: identity.to_string(),
            iat: now,
            exp: now + ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| SessionError::Encoding(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(SessionError::Invalid);
        }
        Ok(data.claims)
    }

    /// Current identity from the session cookie, falling back to a Bearer header.
    /// A missing or invalid session is `None`, not an error.
    pub fn identity_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        let token = jar
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| bearer_token(headers).map(str::to_string))?;

        match self.verify(&token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                debug!("Ignoring session token: {}", e);
                None
            },
        }
    }

    /// Customer linked to the caller's session. No session and no linked customer
    /// both resolve to `None`.
    pub async fn current_customer(
        &self,
        store: &dyn CustomerStore,
        headers: &HeaderMap,
    ) -> Result<Option<Customer>, StoreError> {
        match self.identity_from_headers(headers) {
            Some(identity) => store.find_by_auth_identity(&identity).await,
            None => Ok(None),
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
