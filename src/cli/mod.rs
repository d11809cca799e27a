pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Parser)]
#[command(name = "wakaactl")]
#[command(about = "Wakaa CLI - command-line client for the Wakaa API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "API base URL (defaults to WAKAA_API_URL, then the saved session)")]
    pub url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Register, login and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "CRUD operations on API resources")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Server information and health")]
    Server {
        #[command(subcommand)]
        cmd: commands::server::ServerCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Resolved connection settings for one invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub base_url: String,
    pub token: Option<String>,
    pub output: OutputFormat,
}

impl Context {
    /// `--url`, then `WAKAA_API_URL`, then the saved session, then localhost.
    /// The saved token is only reused against the URL it was issued by.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let session = config::load_session()?;
        let base_url = cli
            .url
            .clone()
            .or_else(|| std::env::var("WAKAA_API_URL").ok())
            .or_else(|| session.as_ref().map(|s| s.url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let token = session
            .filter(|s| s.url.trim_end_matches('/') == base_url.trim_end_matches('/'))
            .map(|s| s.token);

        Ok(Self { base_url, token, output: OutputFormat::from_cli(cli) })
    }

    pub fn client(&self) -> anyhow::Result<ApiClient> {
        Ok(ApiClient::new(&self.base_url)?.with_token(self.token.clone()))
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::resolve(&cli)?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx).await,
        Commands::Data { cmd } => commands::data::handle(cmd, &ctx).await,
        Commands::Server { cmd } => commands::server::handle(cmd, &ctx).await,
    }
}
