//! JWKS Retrieval and Caching
//!
//! Fetches the provider's published signing keys and caches them per JWKS
//! URI. Cache reads are concurrent; refresh takes the write lock. A fetch
//! failure fails closed unless stale fallback is explicitly enabled.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{AuthFlowError, Result};

/// Per-request timeout for JWKS fetches.
const FETCH_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Cached key sets are refreshed after this interval, or earlier when a
/// token references an unknown key ID.
const CACHE_TTL_SECONDS: i64 = 3600;

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JwkKey>,
}

/// Individual JWK
#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

struct CachedJwks {
    jwks: Jwks,
    fetched_at: DateTime<Utc>,
}

/// Read-mostly cache of provider signing keys.
pub struct JwksCache {
    http: reqwest::Client,
    entries: RwLock<HashMap<String, CachedJwks>>,
    cache_ttl: Duration,
    allow_stale: bool,
}

impl JwksCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            entries: RwLock::new(HashMap::new()),
            cache_ttl: Duration::seconds(CACHE_TTL_SECONDS),
            allow_stale: false,
        }
    }

    /// Allow falling back to an expired cached key set when a refresh
    /// fails. Off by default: without it, key retrieval fails closed.
    pub fn with_stale_fallback(mut self, allow: bool) -> Self {
        self.allow_stale = allow;
        self
    }

    /// Override the refresh interval for cached key sets.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Resolve the decoding key for a token, identified by its header `kid`.
    ///
    /// A fresh cached set is consulted first; an unknown `kid` (or a stale
    /// or missing set) triggers one refetch before giving up.
    pub async fn decoding_key(&self, jwks_uri: &str, kid: Option<&str>) -> Result<DecodingKey> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(jwks_uri) {
                let fresh = Utc::now() - entry.fetched_at < self.cache_ttl;
                if fresh {
                    if let Some(key) = find_key(&entry.jwks, kid) {
                        return to_decoding_key(key);
                    }
                    // Unknown kid on a fresh set: fall through and refetch,
                    // the provider may have rotated keys.
                }
            }
        }

        match self.fetch(jwks_uri).await {
            Ok(jwks) => {
                let key = find_key(&jwks, kid).cloned();
                let mut entries = self.entries.write().await;
                entries.insert(
                    jwks_uri.to_string(),
                    CachedJwks {
                        jwks,
                        fetched_at: Utc::now(),
                    },
                );
                drop(entries);

                match key {
                    Some(ref k) => to_decoding_key(k),
                    None => Err(AuthFlowError::invalid_signature(
                        "no key in JWKS matches the token key ID",
                    )),
                }
            }
            Err(e) => {
                if self.allow_stale {
                    let entries = self.entries.read().await;
                    if let Some(entry) = entries.get(jwks_uri) {
                        if let Some(key) = find_key(&entry.jwks, kid) {
                            warn!(jwks_uri = %jwks_uri, error = %e, "JWKS refresh failed, using stale keys");
                            return to_decoding_key(key);
                        }
                    }
                }
                Err(e)
            }
        }
    }

    async fn fetch(&self, jwks_uri: &str) -> Result<Jwks> {
        info!(jwks_uri = %jwks_uri, "fetching JWKS");

        let response = self
            .http
            .get(jwks_uri)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthFlowError::jwks(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AuthFlowError::jwks(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthFlowError::jwks(format!("invalid JWKS document: {}", e)))
    }
}

/// Find the key matching the token's `kid`. A token without a `kid` matches
/// the first key usable for signatures (`use` absent or "sig"), so an
/// encryption key in a mixed JWKS is never picked up by accident.
fn find_key<'a>(jwks: &'a Jwks, kid: Option<&str>) -> Option<&'a JwkKey> {
    match kid {
        Some(kid) => jwks.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
        None => jwks
            .keys
            .iter()
            .find(|k| matches!(k.key_use.as_deref(), None | Some("sig"))),
    }
}

fn to_decoding_key(key: &JwkKey) -> Result<DecodingKey> {
    match key.kty.as_str() {
        "RSA" => {
            let n = key
                .n
                .as_ref()
                .ok_or_else(|| AuthFlowError::jwks("RSA key is missing 'n'"))?;
            let e = key
                .e
                .as_ref()
                .ok_or_else(|| AuthFlowError::jwks("RSA key is missing 'e'"))?;
            DecodingKey::from_rsa_components(n, e)
                .map_err(|err| AuthFlowError::jwks(format!("invalid RSA key components: {}", err)))
        }
        other => Err(AuthFlowError::jwks(format!(
            "unsupported key type: {}",
            other
        ))),
    }
}
