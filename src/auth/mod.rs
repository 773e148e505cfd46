//! OAuth2/OIDC authorization-code login, token storage and refresh.

pub mod agent;
pub mod claims;
pub mod flow;
pub mod refresh;
pub mod service;
pub mod store;
pub mod token;
pub(crate) mod token_endpoint;
pub mod url;

pub use agent::{AgentEvent, AgentOptions, AgentSession, UserAgent};
pub use claims::{decode_access_claims, AccessClaims};
pub use flow::{AuthorizationFlowController, AuthorizationRequestContext, CallbackVerification};
pub use refresh::TokenRefreshGuard;
pub use service::{AuthService, AuthStatus};
pub use store::TokenStore;
pub use token::{TokenResponse, TokenSet};
