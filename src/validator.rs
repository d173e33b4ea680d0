//! ID Token Validation
//!
//! Signature verification against the provider JWKS, then issuer, audience,
//! expiry, and issued-at checks. The unverified token and the verified
//! claims are distinct types: `IdentityClaims` can only be produced by the
//! validator, after the signature check has passed, so claims are never
//! read from an unverified token.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, Validation};
use serde::Deserialize;
use tracing::warn;

use crate::config::ProviderConfig;
use crate::error::{AuthFlowError, Result};
use crate::jwks::JwksCache;

/// Tokens whose `iat` lies further in the future than this are rejected.
const MAX_ISSUED_AT_SKEW_SECONDS: i64 = 300;

/// A structurally parsed but cryptographically unverified ID token.
///
/// Only the compact form and the header key ID are accessible; claims can
/// be obtained solely through [`IdTokenValidator::validate`].
#[derive(Debug, Clone)]
pub struct UnverifiedIdToken {
    raw: String,
    kid: Option<String>,
}

impl UnverifiedIdToken {
    /// Parse the JWT structure (header.payload.signature).
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.split('.').count() != 3 {
            return Err(AuthFlowError::malformed_token(
                "expected three base64url segments",
            ));
        }

        let header = decode_header(raw)
            .map_err(|e| AuthFlowError::malformed_token(format!("invalid header: {}", e)))?;

        Ok(Self {
            raw: raw.to_string(),
            kid: header.kid,
        })
    }

    pub fn key_id(&self) -> Option<&str> {
        self.kid.as_deref()
    }
}

/// `aud` may be a single string or an array of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::Single(s) => s == value,
            Audience::Many(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Claims as they appear on the wire, deserialized only after signature
/// verification.
#[derive(Debug, Deserialize)]
struct RawIdClaims {
    iss: String,
    sub: String,
    aud: Audience,
    exp: i64,
    iat: Option<i64>,
    email: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

/// Verified identity claims. Ownership transfers to the caller; nothing is
/// retained by this crate.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub issuer: String,
    pub audience: Audience,
    pub expiry: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub extra: HashMap<String, serde_json::Value>,
}

/// Validates ID tokens against the provider's published keys.
pub struct IdTokenValidator {
    jwks: JwksCache,
}

impl IdTokenValidator {
    pub fn new(jwks: JwksCache) -> Self {
        Self { jwks }
    }

    /// Verify signature, issuer, audience, expiry, and issued-at, in that
    /// order, relative to the caller-supplied `now`.
    pub async fn validate(
        &self,
        token: &UnverifiedIdToken,
        config: &ProviderConfig,
        now: DateTime<Utc>,
    ) -> Result<IdentityClaims> {
        let key = self
            .jwks
            .decoding_key(&config.jwks_uri, token.key_id())
            .await?;

        // Signature first. Expiry and audience are checked manually below
        // against the injected clock, so jsonwebtoken's own checks are off.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<RawIdClaims>(&token.raw, &key, &validation).map_err(|e| {
            warn!(error = %e, "ID token signature verification failed");
            match e.kind() {
                ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::InvalidToken => {
                    AuthFlowError::malformed_token(format!("{}", e))
                }
                _ => AuthFlowError::invalid_signature(format!("{}", e)),
            }
        })?;
        let claims = data.claims;

        if claims.iss != config.issuer {
            return Err(AuthFlowError::claim_validation(
                "iss",
                format!("expected {}, got {}", config.issuer, claims.iss),
            ));
        }

        if !claims.aud.contains(&config.audience) {
            return Err(AuthFlowError::claim_validation(
                "aud",
                format!("audience does not include {}", config.audience),
            ));
        }

        let expiry = DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            AuthFlowError::claim_validation("exp", "timestamp out of range".to_string())
        })?;
        if expiry <= now {
            return Err(AuthFlowError::claim_validation(
                "exp",
                format!("token expired at {}", expiry),
            ));
        }

        let issued_at = match claims.iat {
            Some(iat) => {
                let issued_at = DateTime::from_timestamp(iat, 0).ok_or_else(|| {
                    AuthFlowError::claim_validation("iat", "timestamp out of range".to_string())
                })?;
                if issued_at > now + Duration::seconds(MAX_ISSUED_AT_SKEW_SECONDS) {
                    return Err(AuthFlowError::claim_validation(
                        "iat",
                        format!("token issued in the future at {}", issued_at),
                    ));
                }
                Some(issued_at)
            }
            None => None,
        };

        Ok(IdentityClaims {
            subject: claims.sub,
            email: claims.email,
            issuer: claims.iss,
            audience: claims.aud,
            expiry,
            issued_at,
            extra: claims.extra,
        })
    }
}
