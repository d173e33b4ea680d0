//! OIDC Login Core
//!
//! OAuth2 authorization code flow with PKCE and OpenID Connect ID token
//! verification, for a relying-party web service authenticating against a
//! single identity provider.
//!
//! The HTTP layer is a collaborator, not part of this crate: it calls
//! [`LoginFlow::begin`] behind its login route and [`LoginFlow::complete`]
//! behind its callback route, and owns sessions, redirects, and shutdown.
//!
//! ## Module Organization
//!
//! - `state` - single-use login attempt store (state -> PKCE verifier)
//! - `pkce` - verifier/challenge generation (RFC 7636, S256)
//! - `authorize` - authorization URL construction
//! - `token` - authorization code exchange
//! - `jwks` / `validator` - key retrieval and ID token verification
//! - `flow` - the begin/complete coordinator

pub mod authorize;
pub mod config;
pub mod error;
pub mod flow;
pub mod jwks;
pub mod pkce;
pub mod state;
pub mod token;
pub mod validator;

pub use authorize::build_authorization_url;
pub use config::ProviderConfig;
pub use error::{AuthFlowError, Result};
pub use flow::LoginFlow;
pub use jwks::{JwkKey, Jwks, JwksCache};
pub use state::StateStore;
pub use token::{TokenExchanger, TokenResponse};
pub use validator::{Audience, IdTokenValidator, IdentityClaims, UnverifiedIdToken};
