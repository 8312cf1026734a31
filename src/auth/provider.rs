//! ID token verification
//!
//! Tokens are HMAC-signed claim sets issued by the identity provider.
//! No server-side session storage needed.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by an ID token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// User ID
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expires at (unix seconds)
    pub exp: i64,
}

impl IdTokenClaims {
    /// Claims for `uid` valid for `max_age` seconds from now
    pub fn new(uid: impl Into<String>, max_age: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: uid.into(),
            email: None,
            name: None,
            picture: None,
            iat: now,
            exp: now + max_age,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Identity of a verified caller
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl From<IdTokenClaims> for VerifiedIdentity {
    fn from(claims: IdTokenClaims) -> Self {
        Self {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
            picture: claims.picture,
        }
    }
}

/// Verifies bearer tokens presented by clients
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a token and return the caller's identity
    ///
    /// # Errors
    /// `AppError::Unauthorized` for malformed, forged or expired tokens
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// Identity provider sharing an HMAC secret with the token issuer
pub struct HmacIdentityProvider {
    secret: String,
}

impl HmacIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HmacIdentityProvider {
    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, AppError> {
        verify_id_token(token, &self.secret).map(VerifiedIdentity::from)
    }
}

/// Create a signed ID token
///
/// Token format: base64url(claims_json).base64url(hmac_sha256(payload))
pub fn create_id_token(claims: &IdTokenClaims, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(claims).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Signing(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode an ID token
///
/// # Errors
/// Returns `Unauthorized` if the token is malformed, the signature does not
/// match, or the token has expired
pub fn verify_id_token(token: &str, secret: &str) -> Result<IdTokenClaims, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Signing(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: IdTokenClaims =
        serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if claims.sub.is_empty() || claims.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[tokio::test]
    async fn accepts_fresh_token() {
        let mut claims = IdTokenClaims::new("user-1", 3600);
        claims.email = Some("ada@example.com".to_string());
        let token = create_id_token(&claims, SECRET).unwrap();

        let identity = HmacIdentityProvider::new(SECRET)
            .verify_id_token(&token)
            .await
            .unwrap();
        assert_eq!(identity.uid, "user-1");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn rejects_expired_token() {
        let claims = IdTokenClaims::new("user-1", -10);
        let token = create_id_token(&claims, SECRET).unwrap();
        assert!(matches!(
            verify_id_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = create_id_token(&IdTokenClaims::new("user-1", 3600), SECRET).unwrap();
        assert!(verify_id_token(&token, "another-secret-another-secret-xx").is_err());
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = create_id_token(&IdTokenClaims::new("user-1", 3600), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged_claims = IdTokenClaims::new("admin", 3600);
        let forged_payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&forged_claims).unwrap());

        let forged = format!("{forged_payload}.{signature}");
        assert!(verify_id_token(&forged, SECRET).is_err());
    }

    #[test]
    fn rejects_malformed_tokens() {
        for token in ["", "no-dot", "a.b.c", "!!!.???"] {
            assert!(verify_id_token(token, SECRET).is_err(), "{token}");
        }
    }
}
