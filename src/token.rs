//! Authorization Code Exchange
//!
//! Server-to-server POST to the provider token endpoint. Codes are single
//! use, so a failed exchange is surfaced to the caller and never retried
//! automatically.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{AuthFlowError, Result};

/// Token endpoint response. Held only for the duration of one completion.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Standard OAuth2 error body returned by token endpoints.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchanges authorization codes for tokens.
pub struct TokenExchanger {
    http: reqwest::Client,
}

impl TokenExchanger {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchange `code` for tokens, binding the exchange to this client via
    /// the PKCE `verifier`.
    pub async fn exchange(
        &self,
        config: &ProviderConfig,
        code: &str,
        verifier: &str,
    ) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &config.redirect_uri),
            ("client_id", &config.client_id),
            ("code_verifier", verifier),
        ];

        if let Some(ref secret) = config.client_secret {
            params.push(("client_secret", secret));
        }

        debug!(endpoint = %config.token_endpoint, "exchanging authorization code");

        let response = self
            .http
            .post(&config.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                AuthFlowError::exchange(None, Some(format!("token request failed: {}", e)))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let parsed: ProviderErrorBody =
                serde_json::from_str(&body).unwrap_or(ProviderErrorBody {
                    error: None,
                    error_description: None,
                });

            warn!(
                status = %status,
                error = parsed.error.as_deref().unwrap_or(""),
                "token endpoint rejected exchange"
            );

            return Err(AuthFlowError::exchange(
                parsed.error,
                parsed
                    .error_description
                    .or_else(|| Some(format!("token endpoint returned {}", status))),
            ));
        }

        response.json().await.map_err(|e| {
            AuthFlowError::exchange(None, Some(format!("invalid token response: {}", e)))
        })
    }
}
