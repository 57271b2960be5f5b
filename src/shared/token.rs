//! HS256 JSON Web Tokens for access and refresh credentials.
//!
//! Claims: `{ user_id, exp, iat, type }`. Signature is HMAC-SHA256 over
//! `base64url(header).base64url(claims)` with the configured secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid token type")]
    WrongType,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies tokens. Cheap to clone behind an `Arc`.
pub struct TokenIssuer {
    secret: Vec<u8>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<Vec<u8>>, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.secret).expect("HMAC key of any size")
    }

    pub fn issue(&self, user_id: &str, kind: TokenKind, now: DateTime<Utc>) -> String {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl,
            kind,
        };
        // Claims hold only strings and integers; serialization cannot fail.
        let payload = serde_json::to_vec(&claims).unwrap_or_default();
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        let sig = mac.finalize().into_bytes();
        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(sig))
    }

    pub fn issue_pair(&self, user_id: &str, now: DateTime<Utc>) -> TokenPair {
        TokenPair {
            access_token: self.issue(user_id, TokenKind::Access, now),
            refresh_token: self.issue(user_id, TokenKind::Refresh, now),
        }
    }

    pub fn verify(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let (signing_input, sig_b64) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let (header_b64, payload_b64) = signing_input
            .split_once('.')
            .ok_or(TokenError::Malformed)?;

        let header = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header).map_err(|_| TokenError::Malformed)?;
        if header.get("alg").and_then(|a| a.as_str()) != Some("HS256") {
            return Err(TokenError::Malformed);
        }

        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac();
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.kind != expected {
            return Err(TokenError::WrongType);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 3600, 86_400)
    }

    #[test]
    fn access_token_verifies() {
        let now = Utc::now();
        let t = issuer().issue("user-1", TokenKind::Access, now);
        assert_eq!(t.split('.').count(), 3);
        let claims = issuer().verify(&t, TokenKind::Access, now).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let now = Utc::now();
        let pair = issuer().issue_pair("user-1", now);
        assert_eq!(
            issuer().verify(&pair.refresh_token, TokenKind::Access, now),
            Err(TokenError::WrongType)
        );
        assert!(issuer().verify(&pair.refresh_token, TokenKind::Refresh, now).is_ok());
    }

    #[test]
    fn expired_token_rejected() {
        let issued = Utc::now();
        let t = issuer().issue("user-1", TokenKind::Access, issued);
        let later = issued + Duration::seconds(3600);
        assert_eq!(
            issuer().verify(&t, TokenKind::Access, later),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn other_secret_rejected() {
        let now = Utc::now();
        let t = issuer().issue("user-1", TokenKind::Access, now);
        let other = TokenIssuer::new("another-secret", 3600, 86_400);
        assert_eq!(
            other.verify(&t, TokenKind::Access, now),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_rejected() {
        let now = Utc::now();
        let t = issuer().issue("user-1", TokenKind::Access, now);
        let parts: Vec<&str> = t.split('.').collect();
        let forged_claims = Claims {
            user_id: "admin".to_string(),
            exp: now.timestamp() + 10,
            iat: now.timestamp(),
            kind: TokenKind::Access,
        };
        let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let token = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(
            issuer().verify(&token, TokenKind::Access, now),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let now = Utc::now();
        assert_eq!(
            issuer().verify("not-a-token", TokenKind::Access, now),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            issuer().verify("a.b.c", TokenKind::Access, now),
            Err(TokenError::Malformed)
        );
    }
}
