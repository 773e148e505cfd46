//! armt-auth: realm-based OAuth2/OIDC login for the aRMT questionnaire app.
//!
//! Drives the browser authorization-code flow against a Keycloak-style
//! realm, keeps the resulting token set in a key-value store, refreshes it
//! single-flight when it expires, and makes the authenticated identity and
//! subject-registration calls the app needs.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use armt_auth::prelude::*;
//! use armt_auth::storage::FileStore;
//!
//! # async fn example(agent: Arc<dyn UserAgent>) -> armt_auth::error::Result<()> {
//! let kv = Arc::new(FileStore::new_default());
//! let service = AuthService::initialize(&AuthSettings::from_env(), kv, agent).await?;
//! service.keycloak_login(true).await?;
//! let subject = service.identity().retrieve_subject().await?;
//! println!("{} in {}", subject.login, subject.project);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod prelude;
pub mod storage;

#[cfg(feature = "cli")]
pub mod cli;
