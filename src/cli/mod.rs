//! CLI entry point for armt-auth.

pub mod auth;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// aRMT realm login and enrolment
#[derive(Parser, Debug)]
#[command(name = "armt-auth", version, about = "aRMT realm login and enrolment CLI")]
pub struct Cli {
    /// Settings file (defaults to ~/.armt/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key-value store file (defaults to ~/.armt/store.json)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in through the browser (or self-register with --register)
    Login(LoginArgs),
    /// Show the stored token set
    Status,
    /// Refresh the access token if it has expired
    Refresh,
    /// Show the enrolled subject from userinfo
    Whoami,
    /// Fetch the management-portal subject record
    Subject,
    /// Register this app as a data source
    RegisterSource,
    /// Enrol by redeeming a meta-token URL
    Enrol(EnrolArgs),
    /// Persist a new deployment base URI
    SetBaseUri(SetBaseUriArgs),
    /// Remove stored tokens
    Logout,
}

/// Arguments for `armt-auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Open the self-registration page instead of the login page
    #[arg(long)]
    pub register: bool,
}

/// Arguments for `armt-auth enrol`.
#[derive(Parser, Debug)]
pub struct EnrolArgs {
    /// Meta-token URL (as encoded in the enrolment QR code)
    pub url: String,
}

/// Arguments for `armt-auth set-base-uri`.
#[derive(Parser, Debug)]
pub struct SetBaseUriArgs {
    pub uri: String,
}
