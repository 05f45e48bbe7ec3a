use std::{future::Future, net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pictor_core::{Config, Storage};
use pictor_vision::Vision;
use tokio::net::TcpListener;

use crate::{api::ApiState, server, telemetry};

#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Cli {
    #[arg(short, long, value_name = "FILE", help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(short, long, value_name = "ADDR", help = "Address to bind the HTTP server to")]
    pub bind: Option<SocketAddr>,
    #[arg(long, value_name = "DIR", help = "Directory uploads are stored in")]
    pub upload_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR", help = "Directory transform results are written to")]
    pub processed_dir: Option<PathBuf>,
    #[arg(long, help = "Enable debug logging", default_value_t = false)]
    pub debug: bool,
}

impl Cli {
    /// The config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(dir) = &self.upload_dir {
            config.storage.upload_dir = dir.clone();
        }
        if let Some(dir) = &self.processed_dir {
            config.storage.processed_dir = dir.clone();
        }
        Ok(config)
    }
}

pub async fn build_state(config: &Config) -> Result<ApiState> {
    let storage = Storage::open(config.storage.clone())
        .await
        .context("Failed to prepare storage directories")?;
    let vision = Vision::from_config(config);
    Ok(ApiState::new(storage, vision, config.limits.clone()))
}

/// Binds `config.server.bind` and serves until `shutdown` resolves.
pub async fn serve(
    config: Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let state = build_state(&config).await?;
    let router = server::build_router(state, config.server.max_upload_bytes);

    let listener = TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    server::serve_with_listener(listener, router, shutdown).await
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.debug)?;

    let config = cli.resolve_config()?;
    serve(config, ctrl_c()).await
}
