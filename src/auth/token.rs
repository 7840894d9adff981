//! Bearer token management
//!
//! Uses HMAC-signed tokens carried in the Authorization header.
//! No server-side session storage needed; tokens are valid until expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

type HmacSha256 = hmac::Hmac<sha2::Sha256>;

/// Longest lifetime a token can be issued with (ten years)
pub const MAX_TOKEN_AGE_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Identity carried by a valid token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub username: String,
}

/// Signed token payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub username: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Claims for `identity` valid for `max_age_seconds` from now
    ///
    /// The age is clamped to [`MAX_TOKEN_AGE_SECONDS`] in either direction.
    pub fn new(identity: &Identity, max_age_seconds: i64) -> Self {
        let now = Utc::now();
        let max_age = max_age_seconds.clamp(-MAX_TOKEN_AGE_SECONDS, MAX_TOKEN_AGE_SECONDS);
        Self {
            email: identity.email.clone(),
            username: identity.username.clone(),
            issued_at: now,
            expires_at: now + Duration::seconds(max_age),
        }
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }
}

fn signer(secret: &str) -> Result<HmacSha256, AppError> {
    use hmac::Mac;

    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

/// Create a signed token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let payload = serde_json::to_string(claims)?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Issue a token for `identity` using the configured lifetime
pub fn issue_token(identity: &Identity, secret: &str, max_age_seconds: i64) -> Result<String, AppError> {
    create_token(&Claims::new(identity, max_age_seconds), secret)
}

/// Verify and decode a token
///
/// # Errors
/// Returns `Unauthorized` if the token is malformed, the signature does
/// not match, or the token has expired
pub fn verify_token(token: &str, secret: &str) -> Result<Identity, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::Mac;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(AppError::invalid_token)?;
    if signature_b64.contains('.') {
        return Err(AppError::invalid_token());
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::invalid_token())?;

    let mut mac = signer(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::invalid_token())?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::invalid_token())?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| AppError::invalid_token())?;

    if claims.is_expired() {
        return Err(AppError::invalid_token());
    }

    Ok(claims.identity())
}
