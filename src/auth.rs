use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::response::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks the per-content anti-forgery token handed to page renders.
///
/// Format: `{expires_at_unix}.{hex(hmac_sha256("read:{content_id}:{expires_at_unix}"))}`.
/// A token is only valid for the content id it was minted for.
#[derive(Clone)]
pub struct ReadTokenSigner {
    mac: HmacSha256,
    ttl_secs: u64,
}

impl std::fmt::Debug for ReadTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadTokenSigner")
            .field("mac", &"***REDACTED***")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl ReadTokenSigner {
    pub fn new(secret: &str, ttl_secs: u64) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret.as_bytes())?,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn issue(&self, content_id: u64, now: DateTime<Utc>) -> String {
        let expires_at = now.timestamp().saturating_add(self.ttl_secs as i64);
        let mut mac = self.mac.clone();
        mac.update(Self::message(content_id, expires_at).as_bytes());
        format!("{expires_at}.{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of signature, scope and expiry.
    pub fn verify(&self, content_id: u64, token: &str, now: DateTime<Utc>) -> bool {
        let Some((expires_raw, signature_hex)) = token.trim().split_once('.') else {
            return false;
        };
        let Ok(expires_at) = expires_raw.parse::<i64>() else {
            return false;
        };
        if expires_at < now.timestamp() {
            return false;
        }
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };

        let mut mac = self.mac.clone();
        mac.update(Self::message(content_id, expires_at).as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn message(content_id: u64, expires_at: i64) -> String {
        format!("read:{content_id}:{expires_at}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub caps: Vec<String>,
}

/// Host session token for a signed-in reader; `caps` carries their capabilities.
pub fn sign_session_token(
    user_id: &str,
    capabilities: &[String],
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    sign_jwt(user_id, "session", capabilities, secret, expires_in_hours)
}

pub fn sign_admin_token(
    admin_id: &str,
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    sign_jwt(admin_id, "admin", &[], secret, expires_in_hours)
}

fn sign_jwt(
    subject_id: &str,
    token_type: &str,
    capabilities: &[String],
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expires_in_hours as i64);
    let claims = Claims {
        sub: subject_id.to_string(),
        token_type: token_type.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
        caps: capabilities.to_vec(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(&format!("jwt sign failed: {e}")))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.algorithms = vec![Algorithm::HS256];

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Whoever is making the request, as far as the host session says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub capabilities: Vec<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: &str, capabilities: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            capabilities,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|cap| cap == capability)
    }

    /// Missing or unverifiable session tokens yield an anonymous caller.
    pub fn from_headers(headers: &HeaderMap, session_secret: &str) -> Self {
        let Some(token) = extract_bearer_token(headers) else {
            return Self::anonymous();
        };
        match verify_jwt(&token, session_secret) {
            Ok(claims) if claims.token_type == "session" => {
                Self::authenticated(&claims.sub, claims.caps)
            }
            Ok(claims) => {
                tracing::debug!(token_type = %claims.token_type, "Ignoring non-session bearer token");
                Self::anonymous()
            }
            Err(_) => {
                tracing::debug!("Ignoring unverifiable session token");
                Self::anonymous()
            }
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Caller::from_headers(
            &parts.headers,
            &app_state.config().session_jwt_secret,
        ))
    }
}

/// Host integration credential for the catalog sync routes.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub admin_id: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Missing bearer token"))?;
        let claims = verify_jwt(&token, &app_state.config().admin_jwt_secret)?;

        if claims.token_type != "admin" {
            return Err(AppError::unauthorized("Invalid token type"));
        }

        Ok(AdminAuth {
            admin_id: claims.sub,
        })
    }
}
