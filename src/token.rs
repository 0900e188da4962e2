//! Signed session credentials.
//!
//! Credentials are HS256 JSON Web Tokens. The payload is whatever claims the
//! client asked for at `POST /jwt` (conventionally an `email`), plus `iat`
//! and `exp` stamped by the server:
//!
//! ```text
//! { "email": "a@x.com", ..., "iat": 1735686000, "exp": 1735689600 }
//! ```
//!
//! Tokens are stateless; nothing is stored server side. Verification checks
//! the signature and expiry with zero leeway.
//!
//! # Example
//!
//! ```rust
//! use group_study_server::token::{TokenClaims, TokenService};
//!
//! let tokens = TokenService::new("my-secret-key");
//! let claims = TokenClaims::for_email("a@x.com");
//!
//! let token = tokens.issue(&claims).unwrap();
//! assert_eq!(tokens.verify(&token).unwrap(), claims);
//! ```

use std::fmt;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use validator::{Validate, ValidationError as FieldError};

use crate::error::{AuthError, TokenError};

/// Lifetime of an issued credential (1 hour).
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Claim names the server stamps itself.
const RESERVED_CLAIMS: [&str; 3] = ["exp", "iat", "nbf"];

// =============================================================================
// Claims
// =============================================================================

/// Caller-supplied claims embedded in a credential.
///
/// `email` is the identity checked by owner-scoped routes; any other fields
/// ride along untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "no_reserved_claims"))]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            extra: Map::new(),
        }
    }

    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

fn no_reserved_claims(claims: &TokenClaims) -> Result<(), FieldError> {
    if RESERVED_CLAIMS.iter().any(|key| claims.extra.contains_key(*key)) {
        return Err(FieldError::new("reserved_claim")
            .with_message("Claims may not set exp, iat or nbf".into()));
    }
    Ok(())
}

/// Wire payload: caller claims plus the registered time claims.
#[derive(Serialize)]
struct SignedPayload<'a> {
    #[serde(flatten)]
    claims: &'a TokenClaims,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct VerifiedPayload {
    #[serde(flatten)]
    claims: TokenClaims,
    #[allow(dead_code)]
    #[serde(default)]
    iat: Option<u64>,
    #[allow(dead_code)]
    exp: u64,
}

// =============================================================================
// Token Service
// =============================================================================

/// Issues and verifies credentials with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: TOKEN_TTL,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign `claims` with an expiry one TTL from now.
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        self.issue_at(claims, jsonwebtoken::get_current_timestamp())
    }

    /// Sign `claims` as if issued at `issued_at` (Unix seconds).
    pub fn issue_at(&self, claims: &TokenClaims, issued_at: u64) -> Result<String, TokenError> {
        let payload = SignedPayload {
            claims,
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
        };
        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Check signature and expiry, returning the signed claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        match decode::<VerifiedPayload>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.claims),
            Err(err) => {
                match err.kind() {
                    ErrorKind::ExpiredSignature => warn!("Token expired"),
                    ErrorKind::InvalidSignature => warn!("Token signature mismatch"),
                    kind => warn!(?kind, "Token rejected"),
                }
                Err(AuthError::InvalidOrExpired)
            }
        }
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
