//! Entry point for a single KrushiAI recommender service

use anyhow::{Context, Result};
use clap::Parser;
use krushi_ai_core::bundle::artifact_paths;
use krushi_ai_core::{load_pipeline_with, LoadOptions, RecommenderKind};
use krushi_ai_service::{serve, AppState, ConfigManager, ConfigOverrides, ModelState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve a KrushiAI recommender over HTTP")]
struct Cli {
    /// Recommender to serve: crop, fertilizer or disease
    #[arg(long, env = "KRUSHI_SERVICE")]
    service: RecommenderKind,

    /// TOML configuration file (defaults to config/<service>.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Directory holding the model artifacts
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Frontend assets served for unknown paths
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Comma-separated CORS origins, `*` for any
    #[arg(long)]
    allowed_origins: Option<String>,

    /// Enable debug mode (exposes POST /shutdown)
    #[arg(long, conflicts_with = "no_debug")]
    debug: bool,

    #[arg(long)]
    no_debug: bool,

    /// Number of ranked alternatives in responses
    #[arg(long)]
    top_k: Option<usize>,

    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let debug = match (self.debug, self.no_debug) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ConfigOverrides {
            config_path: self.config.clone(),
            host: self.host.clone(),
            port: self.port,
            model_dir: self.model_dir.clone(),
            static_dir: self.static_dir.clone(),
            allowed_origins: self.allowed_origins.clone(),
            debug,
            top_k: self.top_k,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = ConfigManager::from_process_env(cli.service, &cli.overrides())
        .context("failed to load configuration")?;
    let config = manager.get_config().clone();

    init_logging(&config.log_level);

    info!(
        "Starting KrushiAI {} service v{}",
        config.kind,
        krushi_ai_service::VERSION
    );
    info!("Running in {} environment", manager.get_environment().as_str());

    let options = LoadOptions {
        top_k: config.top_k,
    };
    let model = match load_pipeline_with(config.kind, &config.model_dir, &options) {
        Ok(pipeline) => ModelState::Ready(Arc::new(pipeline)),
        Err(err) => {
            error!(
                model_dir = %config.model_dir.display(),
                "Failed to load model artifacts: {}", err
            );
            for path in artifact_paths(config.kind, &config.model_dir) {
                warn!(path = %path.display(), present = path.exists(), "artifact");
            }
            ModelState::Unavailable {
                reason: err.to_string(),
            }
        }
    };

    let state = AppState::new(config.kind, model)
        .with_debug(config.debug)
        .with_static_dir(config.static_dir.clone())
        .with_allowed_origins(config.allowed_origins.clone());

    serve(Arc::new(state), &config.listen_addr()).await?;

    info!("KrushiAI {} service shutdown complete", config.kind);
    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
