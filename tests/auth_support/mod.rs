#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use armt_auth::auth::url::parse_url_params_to_object;
use armt_auth::auth::{AgentEvent, AgentOptions, AgentSession, AuthService, TokenSet, UserAgent};
use armt_auth::config::{ApiConfig, AuthConfig, RealmConfig};
use armt_auth::error::AuthError;
use armt_auth::identity::SourceRegistration;
use armt_auth::storage::MemoryStore;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;
use tokio::sync::mpsc;

pub const REDIRECT_URI: &str = "http://ucl-mighealth-app/callback/";
pub const TOKEN_PATH: &str = "/realms/mighealth/protocol/openid-connect/token";
pub const USERINFO_PATH: &str = "/realms/mighealth/protocol/openid-connect/userinfo";

/// One scripted step of a [`MockUserAgent`] session.
#[derive(Debug, Clone)]
pub enum Step {
    Event(AgentEvent),
    /// Navigate to the redirect URI carrying `code` and the request's own state.
    CallbackEchoingState { code: String },
}

pub fn navigate(url: &str) -> Step {
    Step::Event(AgentEvent::NavigationStarted(url.to_string()))
}

pub fn dismiss() -> Step {
    Step::Event(AgentEvent::Closed)
}

#[derive(Debug, Default)]
pub struct AgentCounters {
    pub opens: AtomicUsize,
    pub subscribes: AtomicUsize,
    pub unsubscribes: AtomicUsize,
    pub closes: AtomicUsize,
    pub opened: Mutex<Vec<(String, AgentOptions)>>,
}

impl AgentCounters {
    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn opened_url(&self) -> Option<String> {
        self.opened
            .lock()
            .expect("counter lock poisoned")
            .first()
            .map(|(url, _)| url.clone())
    }
}

/// User agent that replays a script of navigation events, then ends the
/// event stream.
pub struct MockUserAgent {
    script: Vec<Step>,
    pub counters: Arc<AgentCounters>,
}

impl MockUserAgent {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            counters: Arc::new(AgentCounters::default()),
        }
    }
}

#[async_trait]
impl UserAgent for MockUserAgent {
    async fn open(
        &self,
        url: &str,
        options: &AgentOptions,
    ) -> Result<Box<dyn AgentSession>, AuthError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.counters
            .opened
            .lock()
            .expect("counter lock poisoned")
            .push((url.to_string(), *options));

        let state = parse_url_params_to_object(url)
            .remove("state")
            .unwrap_or_default();
        let (tx, rx) = mpsc::unbounded_channel();
        for step in &self.script {
            let event = match step {
                Step::Event(event) => event.clone(),
                Step::CallbackEchoingState { code } => AgentEvent::NavigationStarted(format!(
                    "{REDIRECT_URI}?code={code}&state={state}"
                )),
            };
            let _ = tx.send(event);
        }
        Ok(Box::new(MockSession {
            events: Some(rx),
            counters: self.counters.clone(),
        }))
    }
}

struct MockSession {
    events: Option<mpsc::UnboundedReceiver<AgentEvent>>,
    counters: Arc<AgentCounters>,
}

#[async_trait]
impl AgentSession for MockSession {
    fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<AgentEvent>, AuthError> {
        self.counters.subscribes.fetch_add(1, Ordering::SeqCst);
        self.events
            .take()
            .ok_or_else(|| AuthError::UserAgent("already subscribed".to_string()))
    }

    fn unsubscribe(&mut self) {
        self.counters.unsubscribes.fetch_add(1, Ordering::SeqCst);
    }

    async fn close(&mut self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Config pointing both the realm and the management portal at `server_uri`.
pub fn auth_config(server_uri: &str) -> AuthConfig {
    AuthConfig {
        realm: RealmConfig::builder()
            .auth_server_url(server_uri)
            .realm("mighealth")
            .client_id("armt")
            .redirect_uri(REDIRECT_URI)
            .build(),
        api: ApiConfig {
            base_url: server_uri.to_string(),
            subjects_path: "managementportal/api/subjects/".to_string(),
            meta_token_path: "managementportal/api/meta-token/".to_string(),
            source_credentials: "aRMT:secret".to_string(),
            source_registration: SourceRegistration::default(),
        },
    }
}

pub fn service_with(config: AuthConfig, agent: Arc<dyn UserAgent>) -> AuthService {
    AuthService::new(
        config,
        Arc::new(MemoryStore::new()),
        agent,
        reqwest::Client::new(),
    )
}

/// Service whose user agent must never be opened.
pub fn service(server_uri: &str) -> AuthService {
    service_with(auth_config(server_uri), Arc::new(MockUserAgent::new(Vec::new())))
}

pub fn now() -> f64 {
    armt_auth::auth::token::now_epoch_seconds()
}

pub fn valid_tokens(access_token: &str) -> TokenSet {
    TokenSet {
        access_token: access_token.to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_in: 300,
        issued_at: now(),
    }
}

pub fn expired_tokens(access_token: &str) -> TokenSet {
    TokenSet {
        access_token: access_token.to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_in: 300,
        issued_at: now() - 1_000.0,
    }
}

/// Unsigned JWT with the given payload.
pub fn jwt(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn token_response(access_token: &str, refresh_token: &str) -> Value {
    serde_json::json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": 300,
        "token_type": "Bearer",
        "scope": "openid"
    })
}
