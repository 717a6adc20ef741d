//! Stateless session tokens.
//!
//! Format: `base64url(claims_json) "." base64url(hmac_sha256(secret, claims_b64))`.
//! Nothing is stored server-side; a token is valid while its signature verifies
//! and the current time is before `exp`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

use crate::config::AuthConfig;

type HmacSha256 = Hmac<Sha256>;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest configurable token lifetime: one year.
const MAX_TTL_HOURS: u64 = 24 * 365;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("token secret must be at least 32 bytes, got {0}")]
    SecretTooShort(usize),

    #[error("token lifetime must be positive")]
    ZeroLifetime,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. The token is rejected at and after this instant.
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenConfigError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenConfigError::SecretTooShort(secret.len()));
        }
        if ttl <= Duration::zero() {
            return Err(TokenConfigError::ZeroLifetime);
        }
        Ok(Self {
            secret: secret.to_vec(),
            ttl,
        })
    }

    pub fn from_config(auth: &AuthConfig) -> Result<Self, TokenConfigError> {
        let secret = auth.token_secret()?;
        let hours = auth.token_ttl_hours.min(MAX_TTL_HOURS) as i64;
        Self::new(secret.as_bytes(), Duration::hours(hours))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64) -> String {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> String {
        let iat = now.timestamp();
        let claims = Claims {
            sub: user_id,
            iat,
            exp: iat + self.ttl.num_seconds(),
        };
        // Claims is plain integers; serialization cannot fail.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes()));
        format!("{}.{}", payload, signature)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        // verify_slice compares in constant time
        self.mac()
            .chain_update(payload.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        <HmacSha256 as Mac>::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        self.mac()
            .chain_update(payload)
            .finalize()
            .into_bytes()
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &[u8] = b"an-adequately-long-signing-secret!!";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::hours(24)).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn issued_token_verifies_and_carries_user_id() {
        let svc = service();
        let token = svc.issue_at(42, t0());
        let claims = svc.verify_at(&token, t0()).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(claims.exp, (t0() + Duration::hours(24)).timestamp());
    }

    #[test]
    fn token_is_valid_until_just_before_expiry() {
        let svc = service();
        let token = svc.issue_at(7, t0());
        for offset in [
            Duration::zero(),
            Duration::hours(1),
            Duration::hours(23),
            Duration::hours(24) - Duration::seconds(1),
        ] {
            assert!(svc.verify_at(&token, t0() + offset).is_ok(), "offset {offset}");
        }
    }

    #[test]
    fn token_is_rejected_at_and_after_expiry() {
        let svc = service();
        let token = svc.issue_at(7, t0());
        for offset in [Duration::hours(24), Duration::hours(25), Duration::days(30)] {
            assert_eq!(
                svc.verify_at(&token, t0() + offset),
                Err(TokenError::Expired),
                "offset {offset}"
            );
        }
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let other = TokenService::new(b"a-completely-different-secret-value", Duration::hours(24))
            .unwrap();
        let token = other.issue_at(1, t0());
        assert_eq!(service().verify_at(&token, t0()), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service();
        let token = svc.issue_at(1, t0());
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: 2,
            iat: t0().timestamp(),
            exp: t0().timestamp() + 86_400,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, signature);
        assert_eq!(svc.verify_at(&forged, t0()), Err(TokenError::BadSignature));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let svc = service();
        for token in ["", "no-dot-here", "abc.!!!", "."] {
            assert!(svc.verify_at(token, t0()).is_err(), "{token:?}");
        }
        assert_eq!(svc.verify_at("no-dot-here", t0()), Err(TokenError::Malformed));
    }

    #[test]
    fn short_secret_is_a_configuration_error() {
        assert_eq!(
            TokenService::new(b"anything_secret", Duration::hours(24)).unwrap_err(),
            TokenConfigError::SecretTooShort(15)
        );
    }

    #[test]
    fn missing_secret_in_config_is_fatal() {
        let auth = AuthConfig::default();
        assert_eq!(
            TokenService::from_config(&auth).unwrap_err(),
            TokenConfigError::Config(crate::config::ConfigError::MissingTokenSecret)
        );
    }

    #[test]
    fn from_config_uses_configured_lifetime() {
        let auth = AuthConfig {
            token_secret: Some(String::from_utf8(SECRET.to_vec()).unwrap()),
            token_ttl_hours: 2,
            ..AuthConfig::default()
        };
        let svc = TokenService::from_config(&auth).unwrap();
        assert_eq!(svc.ttl(), Duration::hours(2));
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("adequately"));
    }
}
