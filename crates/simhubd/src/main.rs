//! simhubd — the simhub session broker.
//!
//! # Usage
//!
//! ```text
//! simhubd serve --config /etc/simhub/simhubd.toml --listen 0.0.0.0:8700
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use simhub_transport::HttpChannel;
use simhubd::config::{BrokerConfig, Overrides};

#[derive(Parser)]
#[command(name = "simhubd", about = "simhub session broker")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the broker.
    Serve {
        /// Path to a simhubd.toml file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address the REST API listens on.
        #[arg(long)]
        listen: Option<String>,

        /// Address the broker reports as the sender of its messages.
        #[arg(long)]
        advertise_url: Option<String>,

        /// Wait between health passes ("60s", "500ms", "2m").
        #[arg(long)]
        health_interval: Option<String>,

        /// Deadline for a single probe.
        #[arg(long)]
        probe_timeout: Option<String>,
    },
}

const DEFAULT_FILTER: &str = "info,simhubd=debug,simhub_registry=debug,simhub_health=debug";

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Serve {
            config,
            listen,
            advertise_url,
            health_interval,
            probe_timeout,
        } => {
            let file = match config {
                Some(path) => BrokerConfig::from_file(&path)?,
                None => BrokerConfig::default(),
            };
            let overrides = Overrides {
                listen,
                advertise_url,
                health_interval,
                probe_timeout,
            };
            serve(file, overrides).await
        }
    }
}

async fn serve(file: BrokerConfig, overrides: Overrides) -> anyhow::Result<()> {
    let settings = file.resolve(overrides)?;
    info!(
        listen = %settings.listen,
        advertise_url = %settings.advertise_url,
        health_interval = ?settings.health_interval,
        probe_timeout = ?settings.probe_timeout,
        "simhub broker starting"
    );

    let broker = simhubd::assemble(&settings, Arc::new(HttpChannel::new()));

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    info!(addr = %settings.listen, "API server starting");

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, broker.router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    broker.registry.shutdown().await;
    info!("simhub broker stopped");
    Ok(())
}
