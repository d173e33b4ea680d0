//! Identity Provider Configuration
//!
//! All provider endpoints and credentials are injected explicitly at
//! construction; nothing in this crate reads the ambient environment.

use crate::error::{AuthFlowError, Result};

/// Configuration for a single OpenID Connect identity provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// OAuth2 client ID registered with the provider
    pub client_id: String,

    /// Client secret for confidential clients; public clients rely on PKCE alone
    pub client_secret: Option<String>,

    /// Authorization endpoint the browser is redirected to
    pub authorization_endpoint: String,

    /// Token endpoint for the server-to-server code exchange
    pub token_endpoint: String,

    /// Published signing keys (JWKS) endpoint
    pub jwks_uri: String,

    /// Redirect URI the provider calls back to
    pub redirect_uri: String,

    /// Scopes requested at login
    pub scopes: Vec<String>,

    /// Expected `iss` claim in ID tokens
    pub issuer: String,

    /// Expected `aud` claim in ID tokens (usually the client ID)
    pub audience: String,
}

impl ProviderConfig {
    /// Fail-fast validation of required fields, run once at startup.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("client_id", &self.client_id),
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("jwks_uri", &self.jwks_uri),
            ("redirect_uri", &self.redirect_uri),
            ("issuer", &self.issuer),
            ("audience", &self.audience),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AuthFlowError::configuration(format!(
                    "missing required provider config field: {}",
                    field
                )));
            }
        }

        if self.scopes.is_empty() {
            return Err(AuthFlowError::configuration(
                "at least one scope is required (OIDC logins need \"openid\")",
            ));
        }

        Ok(())
    }

    /// Default scope set for an OIDC login.
    pub fn default_scopes() -> Vec<String> {
        vec!["openid".to_string(), "email".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ProviderConfig {
        ProviderConfig {
            client_id: "client123".to_string(),
            client_secret: Some("secret".to_string()),
            authorization_endpoint: "https://idp.example.com/authorize".to_string(),
            token_endpoint: "https://idp.example.com/token".to_string(),
            jwks_uri: "https://idp.example.com/jwks".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scopes: ProviderConfig::default_scopes(),
            issuer: "https://idp.example.com".to_string(),
            audience: "client123".to_string(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_blank_client_id_rejected() {
        let mut config = valid_config();
        config.client_id = "  ".to_string();

        let err = config.validate().unwrap_err();
        match err {
            AuthFlowError::Configuration { message } => {
                assert!(message.contains("client_id"));
            }
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let mut config = valid_config();
        config.scopes.clear();
        assert!(matches!(
            config.validate(),
            Err(AuthFlowError::Configuration { .. })
        ));
    }
}
