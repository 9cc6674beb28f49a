//! Caller authentication and session authorization.
//!
//! Callers present an HS256 session token either as a bearer token or in the
//! session cookie. A missing token means an anonymous caller; a token that
//! fails verification is always rejected.

mod extractor;
mod policy;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::SessionSettings;
use crate::models::AuthenticatedCaller;

pub use extractor::{OptionalCaller, RequiredCaller};
pub use policy::{authorize, authorize_delete};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Verifies (and, for tooling, issues) session tokens.
#[derive(Clone)]
pub struct SessionVerifier {
    secret: SecretString,
    issuer: String,
}

impl SessionVerifier {
    pub fn new(settings: &SessionSettings) -> Self {
        SessionVerifier {
            secret: settings.secret.clone(),
            issuer: settings.issuer.clone(),
        }
    }

    /// Verify a token and return the caller it identifies.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedCaller, String> {
        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_aud = false;

        let data = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| format!("Invalid session token: {}", e))?;

        if data.claims.sub.trim().is_empty() {
            return Err("Invalid session token: empty subject".to_string());
        }

        Ok(AuthenticatedCaller {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }

    /// Issue a token for `caller` valid for `ttl_secs`.
    pub fn issue(&self, caller: &AuthenticatedCaller, ttl_secs: u64) -> Result<String, String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(ttl_secs as i64);

        let claims = SessionClaims {
            sub: caller.id.clone(),
            iss: self.issuer.clone(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
            email: caller.email.clone(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        encode(&Header::default(), &claims, &key)
            .map_err(|e| format!("Failed to create session token: {}", e))
    }
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .finish()
    }
}
