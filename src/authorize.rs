//! Authorization Request Builder
//!
//! Composes the provider authorization URL for the front-channel redirect.
//! Pure function; the only failure mode is incomplete configuration.

use crate::config::ProviderConfig;
use crate::error::{AuthFlowError, Result};
use crate::pkce;

/// Build the authorization URL embedding the state and the S256 challenge
/// derived from `verifier`.
pub fn build_authorization_url(
    config: &ProviderConfig,
    state: &str,
    verifier: &str,
) -> Result<String> {
    if config.client_id.trim().is_empty() {
        return Err(AuthFlowError::configuration("client_id is not set"));
    }
    if config.redirect_uri.trim().is_empty() {
        return Err(AuthFlowError::configuration("redirect_uri is not set"));
    }

    let scope = config.scopes.join(" ");
    let code_challenge = pkce::code_challenge(verifier);

    Ok(format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}&code_challenge={}&code_challenge_method=S256",
        config.authorization_endpoint,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scope),
        urlencoding::encode(state),
        urlencoding::encode(&code_challenge),
    ))
}
