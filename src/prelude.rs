//! Convenience re-exports for common use.

pub use crate::auth::{
    AgentEvent, AgentOptions, AgentSession, AuthService, AuthStatus, CallbackVerification,
    TokenSet, TokenStore, UserAgent,
};
pub use crate::config::{AuthConfig, AuthSettings, RealmConfig};
pub use crate::error::{AuthError, Result};
pub use crate::identity::{IdentityClient, Subject, SubjectRecord, UserInfo};
pub use crate::storage::{KeyValueStore, StorageKey};
