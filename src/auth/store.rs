use std::sync::Arc;

use tokio::sync::Mutex;

use super::token::TokenSet;
use crate::error::AuthError;
use crate::storage::{KeyValueStore, StorageKey};

/// Durable holder of the current token set.
///
/// Reads go straight to the backing store. Every write (exchange, refresh,
/// registration, logout) is serialized through one mutex, and a token set is
/// always written as a single value, so a reader sees either the old set or
/// the new one.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use armt_auth::auth::TokenStore;
/// use armt_auth::storage::MemoryStore;
///
/// # async fn demo() -> armt_auth::error::Result<()> {
/// let store = TokenStore::new(Arc::new(MemoryStore::new()));
/// assert!(store.get().await?.is_none());
/// # Ok(())
/// # }
/// ```
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    pub async fn get(&self) -> Result<Option<TokenSet>, AuthError> {
        match self.backend.get(StorageKey::OauthTokens.as_ref()).await? {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| AuthError::Serialization(format!("stored token set: {err}"))),
        }
    }

    pub async fn set(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        let value = serde_json::to_value(tokens)?;
        let _guard = self.write_lock.lock().await;
        self.backend
            .set(StorageKey::OauthTokens.as_ref(), value)
            .await
    }

    /// Write `tokens` only if the stored set still carries
    /// `expected_refresh_token`, checked and written under the write lock.
    ///
    /// Returns what the store holds afterwards: `tokens` when written,
    /// otherwise the set that replaced the expected one, or `None` after a
    /// logout.
    pub async fn replace_if_current(
        &self,
        expected_refresh_token: &str,
        tokens: &TokenSet,
    ) -> Result<Option<TokenSet>, AuthError> {
        let value = serde_json::to_value(tokens)?;
        let _guard = self.write_lock.lock().await;
        match self.get().await? {
            Some(current) if current.refresh_token == expected_refresh_token => {
                self.backend
                    .set(StorageKey::OauthTokens.as_ref(), value)
                    .await?;
                Ok(Some(tokens.clone()))
            }
            other => Ok(other),
        }
    }

    pub async fn clear(&self) -> Result<(), AuthError> {
        let _guard = self.write_lock.lock().await;
        self.backend
            .set(StorageKey::OauthTokens.as_ref(), serde_json::Value::Null)
            .await
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
