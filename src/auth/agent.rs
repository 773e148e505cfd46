//! External user-agent collaborator (embedded or system browser).
//!
//! A session delivers navigation events over a channel obtained from
//! [`AgentSession::subscribe`]. The flow controller owns the subscription and
//! tears it down with [`AgentSession::unsubscribe`] exactly once, on the
//! first terminal event.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AuthError;

/// Display options passed to the agent when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentOptions {
    pub zoom: bool,
    pub location: bool,
    pub clear_session_cache: bool,
    pub clear_cache: bool,
}

impl Default for AgentOptions {
    /// No address bar or zoom controls, and no cookies left over from an
    /// earlier login.
    fn default() -> Self {
        Self {
            zoom: false,
            location: false,
            clear_session_cache: true,
            clear_cache: true,
        }
    }
}

impl AgentOptions {
    /// `zoom=no,location=no,clearsessioncache=yes,clearcache=yes`.
    pub fn feature_string(&self) -> String {
        fn flag(value: bool) -> &'static str {
            if value {
                "yes"
            } else {
                "no"
            }
        }
        format!(
            "zoom={},location={},clearsessioncache={},clearcache={}",
            flag(self.zoom),
            flag(self.location),
            flag(self.clear_session_cache),
            flag(self.clear_cache)
        )
    }
}

/// Events emitted by an open agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// The agent is about to load `url`.
    NavigationStarted(String),
    /// The user dismissed the agent.
    Closed,
}

/// Opens agent sessions.
#[async_trait]
pub trait UserAgent: Send + Sync {
    async fn open(
        &self,
        url: &str,
        options: &AgentOptions,
    ) -> Result<Box<dyn AgentSession>, AuthError>;
}

/// One open agent window.
///
/// A dropped event sender is treated the same as [`AgentEvent::Closed`].
#[async_trait]
pub trait AgentSession: Send {
    fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<AgentEvent>, AuthError>;
    fn unsubscribe(&mut self);
    async fn close(&mut self);
}
