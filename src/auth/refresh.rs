//! Expiry check and single-flight refresh.
//!
//! Identity providers rotate refresh tokens on use, so two concurrent
//! refresh grants for the same set can invalidate each other. At most one
//! refresh is in flight per guard; concurrent callers await the same
//! [`Shared`] future and receive the same outcome.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::store::TokenStore;
use super::token::{now_epoch_seconds, TokenSet};
use super::token_endpoint::request_tokens;
use crate::config::RealmConfig;
use crate::error::AuthError;

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenSet, AuthError>>>;

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct RefreshSlot {
    next_id: u64,
    current: Option<InFlight>,
}

/// Hands out a non-expired token set, refreshing it when needed.
pub struct TokenRefreshGuard {
    client: reqwest::Client,
    config: Arc<RealmConfig>,
    store: Arc<TokenStore>,
    slot: Mutex<RefreshSlot>,
}

impl TokenRefreshGuard {
    pub fn new(client: reqwest::Client, config: Arc<RealmConfig>, store: Arc<TokenStore>) -> Self {
        Self {
            client,
            config,
            store,
            slot: Mutex::new(RefreshSlot::default()),
        }
    }

    /// Return the stored set if still valid, otherwise refresh it.
    ///
    /// On refresh failure the stale set stays in the store and the error is
    /// [`AuthError::TokenRefreshFailed`]; whether to log in again is the
    /// caller's decision. A refresh that finishes after the store was
    /// cleared or rewritten never overwrites it: the caller gets the newer set
    /// or [`AuthError::NotAuthenticated`].
    pub async fn ensure_fresh(&self) -> Result<TokenSet, AuthError> {
        let current = self.store.get().await?.ok_or(AuthError::NotAuthenticated)?;
        if !current.is_expired_at(now_epoch_seconds()) {
            return Ok(current);
        }

        let (id, future) = {
            let mut slot = self.slot.lock().await;
            // A finished future still in the slot belongs to a caller that
            // was dropped before clearing it; its result may be stale.
            let joined = slot
                .current
                .as_ref()
                .filter(|in_flight| in_flight.future.peek().is_none())
                .map(|in_flight| (in_flight.id, in_flight.future.clone()));
            match joined {
                Some((id, future)) => {
                    debug!(refresh_id = id, "joining in-flight token refresh");
                    (id, future)
                }
                None => {
                    // A refresh may have completed between the read above and
                    // taking the slot.
                    let latest = self.store.get().await?.ok_or(AuthError::NotAuthenticated)?;
                    if !latest.is_expired_at(now_epoch_seconds()) {
                        debug!("token set refreshed by an earlier caller");
                        return Ok(latest);
                    }
                    let id = slot.next_id;
                    slot.next_id += 1;
                    let future = refresh_tokens(
                        self.client.clone(),
                        self.config.clone(),
                        self.store.clone(),
                        latest.refresh_token,
                    )
                    .boxed()
                    .shared();
                    slot.current = Some(InFlight {
                        id,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let result = future.await;

        let mut slot = self.slot.lock().await;
        if slot.current.as_ref().is_some_and(|in_flight| in_flight.id == id) {
            slot.current = None;
        }
        result
    }
}

async fn refresh_tokens(
    client: reqwest::Client,
    config: Arc<RealmConfig>,
    store: Arc<TokenStore>,
    refresh_token: String,
) -> Result<TokenSet, AuthError> {
    let url = config.token_url()?;
    let basic = config
        .confidential_secret()
        .map(|secret| format!("{}:{secret}", config.client_id));
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", config.client_id.as_str()),
    ];

    let response = request_tokens(&client, &url, &form, basic.as_deref())
        .await
        .map_err(|err| {
            warn!(status = ?err.status(), "token refresh failed; keeping stored tokens");
            AuthError::TokenRefreshFailed(err.to_string())
        })?;
    let tokens = TokenSet::from_response(response, now_epoch_seconds());
    // A logout or login may have replaced the set while the request ran.
    match store.replace_if_current(&refresh_token, &tokens).await? {
        Some(stored) if stored == tokens => {
            info!(expires_in = tokens.expires_in, "access token refreshed");
            Ok(tokens)
        }
        Some(stored) => {
            debug!("token set replaced during refresh; discarding refreshed set");
            Ok(stored)
        }
        None => {
            debug!("logged out during refresh; discarding refreshed set");
            Err(AuthError::NotAuthenticated)
        }
    }
}
