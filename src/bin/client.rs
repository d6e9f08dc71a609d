//! podnotify inbox client
//!
//! Command-line interface for subscribing to a server and watching the inbox.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podnotify::client::{subscribe, InboxPoller, InboxWatch};
use podnotify::types::{ClientConfig, Credentials, ReconnectPolicy, DEFAULT_OIDC_ISSUER};
use podnotify::{PodClient, SolidSession};

#[derive(Parser)]
#[command(name = "podnotify-client")]
#[command(about = "Subscribe a pod inbox to a notifying server and watch it")]
#[command(version)]
struct Cli {
    /// Base URL of the notifying server
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:4000")]
    server_url: String,

    /// Inbox container on the client's pod
    #[arg(long, env = "CLIENT_INBOX_URL")]
    inbox: Option<String>,

    /// OIDC issuer of the client's identity
    #[arg(long, env = "OIDC_ISSUER", default_value = DEFAULT_OIDC_ISSUER)]
    oidc_issuer: String,

    /// Client-credentials token identifier
    #[arg(long, env = "CLIENT_TOKEN_ID", hide_env_values = true)]
    token_id: String,

    /// Client-credentials token secret
    #[arg(long, env = "CLIENT_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print the WebID
    Login,
    /// Register the inbox with the server and grant it access
    Subscribe,
    /// List the inbox once
    List,
    /// Watch the inbox (poll + WebSocket pings) until interrupted
    Watch {
        /// Polling interval in milliseconds
        #[arg(long, env = "POLL_INTERVAL_MS", default_value = "10000")]
        poll_interval_ms: u64,
        /// Reconnect delay for the WebSocket in milliseconds (0 = no reconnect)
        #[arg(long, env = "RECONNECT_BACKOFF_MS", default_value = "0")]
        reconnect_backoff_ms: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let credentials = Credentials::new(&cli.token_id, &cli.token_secret, &cli.oidc_issuer);
    let session: Arc<dyn PodClient> = Arc::new(
        SolidSession::login(&credentials)
            .await
            .context("Client login failed")?,
    );

    match cli.command {
        Commands::Login => {
            println!("{}", session.web_id());
        }

        Commands::Subscribe => {
            let inbox = require_inbox(&cli.inbox)?;
            let sub = subscribe(session.as_ref(), &cli.server_url, inbox).await?;
            println!("Subscribed; {} has {:?} access", sub.server_id, sub.grant);
        }

        Commands::List => {
            let inbox = require_inbox(&cli.inbox)?;
            InboxPoller::new(session, inbox).refresh().await?;
        }

        Commands::Watch {
            poll_interval_ms,
            reconnect_backoff_ms,
        } => {
            let config = ClientConfig {
                server_url: cli.server_url.clone(),
                inbox_url: require_inbox(&cli.inbox)?.to_string(),
                poll_interval: Duration::from_millis(poll_interval_ms),
                reconnect: ReconnectPolicy::from_millis(reconnect_backoff_ms),
            };
            let watch = InboxWatch::start(session, &config).await?;
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            watch.stop();
            println!("Bye");
        }
    }

    Ok(())
}

fn require_inbox(inbox: &Option<String>) -> anyhow::Result<&str> {
    match inbox.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => bail!("No inbox configured; set CLIENT_INBOX_URL or pass --inbox"),
    }
}
