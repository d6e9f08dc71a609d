//! podnotify notifying server
//!
//! Run with: podnotify-server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podnotify::server::NotifyServer;
use podnotify::types::{Credentials, ServerConfig, DEFAULT_OIDC_ISSUER};
use podnotify::SolidSession;

#[derive(Parser, Debug)]
#[command(name = "podnotify-server")]
#[command(about = "Watches a local artifact and notifies a subscriber's pod inbox")]
#[command(version)]
struct Args {
    /// Port for HTTP routes and the /ws endpoint
    #[arg(long, env = "SERVER_PORT", default_value = "4000")]
    port: u16,

    /// Root container on the server's pod
    #[arg(long, env = "SERVER_POD_ROOT", default_value = "https://server.example/files/")]
    pod_root: String,

    /// Local artifact to watch and mirror
    #[arg(long, env = "ARTIFACT_PATH", default_value = "weights.bin")]
    artifact: String,

    /// OIDC issuer of the server's identity
    #[arg(long, env = "OIDC_ISSUER", default_value = DEFAULT_OIDC_ISSUER)]
    oidc_issuer: String,

    /// Client-credentials token identifier
    #[arg(long, env = "SERVER_TOKEN_ID", hide_env_values = true)]
    token_id: String,

    /// Client-credentials token secret
    #[arg(long, env = "SERVER_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,

    /// Log output: `text` or `json`
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }

    let credentials = Credentials::new(args.token_id, args.token_secret, args.oidc_issuer);
    // Without an identity the server cannot notify anyone
    let session = SolidSession::login(&credentials)
        .await
        .context("Server pod login failed")?;

    let config = ServerConfig {
        port: args.port,
        pod_root: args.pod_root,
        artifact_path: PathBuf::from(shellexpand::tilde(&args.artifact).to_string()),
    };

    NotifyServer::new(config, Arc::new(session))
        .run(shutdown_signal())
        .await
        .context("Server stopped with an error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
