//! Auth gateway collaborator: opaque credential -> verified username.
//!
//! The relay carries no auth state beyond this seam and a shared signing
//! secret. Rejected credentials surface as `RelayError::AuthFailed` and the
//! connection is refused before any relay state is created.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use roomcast_core::error::{RelayError, Result};

/// Verifies a presented credential and yields a username, or issues a fresh
/// credential for one.
pub trait AuthGateway: Send + Sync {
    fn issue(&self, username: &str) -> Result<String>;
    fn verify(&self, token: &str) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Username.
    sub: String,
    /// Expiry, unix seconds.
    exp: i64,
}

/// HS256 JWT auth over a shared secret.
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtAuth {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }
}

impl AuthGateway for JwtAuth {
    fn issue(&self, username: &str) -> Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| RelayError::Internal(format!("token encode failed: {e}")))
    }

    fn verify(&self, token: &str) -> Result<String> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims.sub)
            .map_err(|_| RelayError::AuthFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips() {
        let auth = JwtAuth::new("testsecret", 24);
        let token = auth.issue("alice").unwrap();
        assert_eq!(auth.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = JwtAuth::new("testsecret", 24);
        assert!(matches!(
            auth.verify("not-a-token"),
            Err(RelayError::AuthFailed)
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let issuer = JwtAuth::new("secret-a", 24);
        let verifier = JwtAuth::new("secret-b", 24);
        let token = issuer.issue("alice").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(RelayError::AuthFailed)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = JwtAuth::new("testsecret", -1);
        let token = auth.issue("alice").unwrap();
        assert!(matches!(auth.verify(&token), Err(RelayError::AuthFailed)));
    }
}
