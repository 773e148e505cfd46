//! CLI command handlers and the terminal user agent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Cli, Commands};
use crate::auth::{AgentEvent, AgentOptions, AgentSession, AuthService, UserAgent};
use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::storage::FileStore;

/// User agent for terminals.
///
/// Prints the authorization URL and reads pasted URLs from stdin, one
/// navigation per line. EOF or a line `q` dismisses the agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinUserAgent;

#[async_trait]
impl UserAgent for StdinUserAgent {
    async fn open(
        &self,
        url: &str,
        _options: &AgentOptions,
    ) -> Result<Box<dyn AgentSession>, AuthError> {
        eprintln!("🔗 Open this URL in a browser:\n\n  {url}\n");
        eprintln!("📋 After signing in, paste the URL the browser was redirected to (q to cancel):");
        Ok(Box::new(LineSession::spawn(BufReader::new(tokio::io::stdin()))))
    }
}

/// Agent session fed by lines from an async reader.
struct LineSession {
    events: Option<mpsc::UnboundedReceiver<AgentEvent>>,
    reader: Option<JoinHandle<()>>,
}

impl LineSession {
    fn spawn<R>(input: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut lines = input.lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if line.eq_ignore_ascii_case("q") {
                            break;
                        }
                        if tx.send(AgentEvent::NavigationStarted(line.to_string())).is_err() {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            let _ = tx.send(AgentEvent::Closed);
        });
        Self {
            events: Some(rx),
            reader: Some(reader),
        }
    }

    fn stop_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

#[async_trait]
impl AgentSession for LineSession {
    fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<AgentEvent>, AuthError> {
        self.events
            .take()
            .ok_or_else(|| AuthError::UserAgent("already subscribed".to_string()))
    }

    fn unsubscribe(&mut self) {
        self.stop_reader();
    }

    async fn close(&mut self) {
        self.stop_reader();
    }
}

impl Drop for LineSession {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

/// Resolve settings and storage from the global flags and run `cli.command`.
pub async fn run(cli: Cli) -> Result<(), AuthError> {
    let settings_path = cli.config.unwrap_or_else(AuthSettings::default_path);
    let settings = AuthSettings::load_from_path(&settings_path)?.apply_env();
    let kv = Arc::new(match cli.store {
        Some(path) => FileStore::new(path),
        None => FileStore::new_default(),
    });
    let service = AuthService::initialize(&settings, kv, Arc::new(StdinUserAgent)).await?;

    match cli.command {
        Commands::Login(args) => handle_login(&service, !args.register).await,
        Commands::Status => handle_status(&service).await,
        Commands::Refresh => handle_refresh(&service).await,
        Commands::Whoami => handle_whoami(&service).await,
        Commands::Subject => handle_subject(&service).await,
        Commands::RegisterSource => handle_register_source(&service).await,
        Commands::Enrol(args) => handle_enrol(&service, &args.url).await,
        Commands::SetBaseUri(args) => {
            service.set_base_uri(&args.uri).await?;
            println!("✅ Base URI saved; it applies from the next command");
            Ok(())
        }
        Commands::Logout => {
            service.logout().await?;
            println!("✅ Logged out");
            Ok(())
        }
    }
}

/// Handle `armt-auth login [--register]`.
pub async fn handle_login(service: &AuthService, is_login: bool) -> Result<(), AuthError> {
    let tokens = service.keycloak_login(is_login).await?;
    let action = if is_login { "Login" } else { "Registration" };
    println!("✅ {action} successful (token valid for {}s)", tokens.expires_in);
    Ok(())
}

/// Handle `armt-auth status`.
pub async fn handle_status(service: &AuthService) -> Result<(), AuthError> {
    println!("🔐 Authentication Status\n");
    println!("  Realm: {}", service.config().realm.require_realm_url()?);
    match service.status().await? {
        Some(status) => {
            let expires = status
                .expires_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            if status.expired {
                println!("  Tokens: ⚠️  Access token expired at {expires} (will refresh on use)");
            } else {
                println!("  Tokens: ✅ Logged in (expires {expires})");
            }
        }
        None => println!("  Tokens: ❌ Not logged in"),
    }
    Ok(())
}

/// Handle `armt-auth refresh`.
pub async fn handle_refresh(service: &AuthService) -> Result<(), AuthError> {
    let tokens = service.ensure_fresh().await?;
    let expires = tokens
        .expires_at_utc()
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("✅ Access token valid until {expires}");
    Ok(())
}

/// Handle `armt-auth whoami`.
pub async fn handle_whoami(service: &AuthService) -> Result<(), AuthError> {
    let subject = service.identity().retrieve_subject().await?;
    println!("  Participant: {}", subject.participant_id);
    println!("  Login:       {}", subject.login);
    println!("  Project:     {}", subject.project);
    println!("  Enrolled:    {}", subject.enrolment_day());
    Ok(())
}

/// Handle `armt-auth subject`.
pub async fn handle_subject(service: &AuthService) -> Result<(), AuthError> {
    let record = service.identity().fetch_subject_information().await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Handle `armt-auth register-source`.
pub async fn handle_register_source(service: &AuthService) -> Result<(), AuthError> {
    let source = service.identity().register_as_data_source().await?;
    println!("✅ Registered source {}", source.source_id);
    Ok(())
}

/// Handle `armt-auth enrol <url>`.
pub async fn handle_enrol(service: &AuthService, url: &str) -> Result<(), AuthError> {
    let enrolment = service.identity().enrol_with_meta_token(url).await?;
    println!("✅ Enrolled (token valid for {}s)", enrolment.tokens.expires_in);
    println!("  Server: {}", enrolment.meta_token.base_url);
    if let Some(policy) = &enrolment.meta_token.privacy_policy_url {
        println!("  Privacy policy: {policy}");
    }
    Ok(())
}
