//! Login Flow Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthFlowError {
    /// The callback state was never issued, already consumed, or expired.
    /// Indistinguishable on purpose; the caller must restart the login.
    #[error("invalid or expired login state")]
    InvalidState,

    /// Token endpoint returned an error or was unreachable. Authorization
    /// codes are single-use, so this is never retried automatically.
    #[error("token exchange failed: {} {}", code.as_deref().unwrap_or("(no error code)"), description.as_deref().unwrap_or(""))]
    Exchange {
        code: Option<String>,
        description: Option<String>,
    },

    #[error("malformed ID token: {message}")]
    MalformedToken { message: String },

    #[error("ID token signature verification failed: {message}")]
    InvalidSignature { message: String },

    #[error("ID token claim '{claim}' rejected: {message}")]
    ClaimValidation {
        claim: &'static str,
        message: String,
    },

    #[error("token response did not include an ID token")]
    MissingIdToken,

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("JWKS retrieval failed: {message}")]
    Jwks { message: String },

    /// Entropy source failure during state generation. Fatal: the process
    /// cannot issue login attempts without a working CSPRNG.
    #[error("entropy source failure: {message}")]
    Entropy { message: String },
}

impl AuthFlowError {
    pub fn exchange(code: Option<String>, description: Option<String>) -> Self {
        Self::Exchange { code, description }
    }

    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken { message: message.into() }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature { message: message.into() }
    }

    pub fn claim_validation(claim: &'static str, message: impl Into<String>) -> Self {
        Self::ClaimValidation { claim, message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn jwks(message: impl Into<String>) -> Self {
        Self::Jwks { message: message.into() }
    }

    pub fn entropy(message: impl Into<String>) -> Self {
        Self::Entropy { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, AuthFlowError>;
