//! Login Flow Coordinator
//!
//! The two operations exposed to the HTTP layer: `begin` issues the
//! redirect URL for `GET /login`, `complete` turns the `(state, code)`
//! callback into verified identity claims.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::authorize::build_authorization_url;
use crate::config::ProviderConfig;
use crate::error::{AuthFlowError, Result};
use crate::jwks::JwksCache;
use crate::state::StateStore;
use crate::token::{TokenExchanger, TokenResponse};
use crate::validator::{IdTokenValidator, IdentityClaims, UnverifiedIdToken};

/// Timeout applied to all outbound provider calls.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinates the authorization code flow for one identity provider.
pub struct LoginFlow {
    config: ProviderConfig,
    store: Arc<StateStore>,
    exchanger: TokenExchanger,
    validator: IdTokenValidator,
}

impl LoginFlow {
    /// Build a flow with a fresh in-memory state store.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Self::with_store(config, Arc::new(StateStore::new()))
    }

    /// Build a flow around an externally owned state store.
    pub fn with_store(config: ProviderConfig, store: Arc<StateStore>) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                AuthFlowError::configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            store,
            exchanger: TokenExchanger::new(http.clone()),
            validator: IdTokenValidator::new(JwksCache::new(http)),
        })
    }

    /// The state store backing this flow, for sweeping or inspection.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Begin a login: register a new attempt and return the provider
    /// authorization URL the browser should be redirected to.
    pub fn begin(&self) -> Result<String> {
        let (state, verifier) = self.store.create()?;
        let url = build_authorization_url(&self.config, &state, &verifier)?;

        info!(
            endpoint = %self.config.authorization_endpoint,
            "login started, redirecting to provider"
        );
        Ok(url)
    }

    /// Complete a login from the provider callback.
    ///
    /// The state is consumed before any network call, so a replayed,
    /// forged, or expired state fails without touching the provider, and a
    /// cancelled completion cannot make the attempt resolvable again.
    pub async fn complete(&self, state: &str, code: &str) -> Result<IdentityClaims> {
        let verifier = self.store.resolve(state).ok_or_else(|| {
            warn!("callback with unknown or already-consumed state");
            AuthFlowError::InvalidState
        })?;

        let tokens: TokenResponse = self.exchanger.exchange(&self.config, code, &verifier).await?;

        let raw_id_token = tokens.id_token.as_deref().ok_or(AuthFlowError::MissingIdToken)?;
        let unverified = UnverifiedIdToken::parse(raw_id_token)?;

        let claims = self
            .validator
            .validate(&unverified, &self.config, Utc::now())
            .await?;

        info!(subject = %claims.subject, "login completed");
        Ok(claims)
    }
}
