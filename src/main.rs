//! Caption Server
//!
//! Burns short word-chunk captions into videos. An upload is transcribed,
//! split into two-word captions, each caption is rendered to a transparent
//! PNG and FFmpeg overlays them onto the original video, one time window
//! per caption.
//!
//! Usage:
//!   caption-server [config.toml]                        run the HTTP server
//!   caption-server caption <input> <output> [config]    caption one file
//!   caption-server init-config <path>                   write default config

mod caption;
mod compositor;
mod config;
mod config_file;
mod error;
mod http;
#[cfg(test)]
mod integration;
mod media;
mod overlay;
mod pipeline;
mod render;
mod state;
mod transcript;
mod workspace;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::error::{CaptionError, Result};
use crate::http::create_router;
use crate::pipeline::CaptionPipeline;
use crate::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "caption-server";

/// Seconds between job eviction sweeps
const EVICTION_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("init-config") => {
            let path = args.get(1).map(String::as_str).unwrap_or("config.toml");
            crate::config_file::generate_default_config(path)?;
            println!("Wrote default configuration to {}", path);
            Ok(())
        }
        Some("caption") => {
            let (Some(input), Some(output)) = (args.get(1), args.get(2)) else {
                eprintln!("usage: {} caption <input> <output> [config.toml]", APP_NAME);
                std::process::exit(2);
            };
            let config = load_config(args.get(3).map(String::as_str).unwrap_or("config.toml"));
            run_once(config, PathBuf::from(input), PathBuf::from(output)).await
        }
        other => {
            let config = load_config(other.unwrap_or("config.toml"));
            serve(config).await
        }
    }
}

/// Caption a single file and exit
async fn run_once(config: AppConfig, input: PathBuf, output: PathBuf) -> Result<()> {
    crate::media::init()?;

    let result = tokio::task::spawn_blocking(move || {
        let pipeline = CaptionPipeline::from_config(&config)?;
        pipeline.run(&input, &output, |stage| {
            tracing::info!("Stage: {}", stage);
        })
    })
    .await
    .map_err(|e| CaptionError::Io(std::io::Error::other(e)))?;

    match result {
        Ok(report) => {
            println!("{}", report.output.display());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Captioning failed: {}", e);
            eprintln!("error [{}]: {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

/// Run the HTTP server
async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    crate::media::init()?;

    if !config.style.font_path.exists() {
        tracing::warn!(
            "Caption font {} not found; runs will fail until it is installed",
            config.style.font_path.display()
        );
    }

    let pipeline = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || CaptionPipeline::from_config(&config))
            .await
            .map_err(|e| CaptionError::Io(std::io::Error::other(e)))??
    };

    // Create application state
    let state = Arc::new(AppState::new(config.clone(), pipeline));

    // Background task: evict expired jobs
    {
        let state_bg = Arc::clone(&state);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(EVICTION_INTERVAL_SECS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let state = state_bg.clone();
                let removed = tokio::task::spawn_blocking(move || state.cleanup_expired_jobs())
                    .await
                    .unwrap_or(0);
                if removed > 0 {
                    tracing::info!("Evicted {} expired job(s)", removed);
                }
            }
        });
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| CaptionError::Config(format!("invalid listen address: {}", e)))?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Load configuration and initialise logging from it.
///
/// A missing or unreadable file falls back to defaults.
fn load_config(path: &str) -> AppConfig {
    let loaded = if Path::new(path).exists() {
        Some(crate::config_file::ConfigFile::from_file(path).map(|cf| cf.into_app_config()))
    } else {
        None
    };

    let config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => AppConfig::default(),
    };

    init_logging(&config.log_level, config.log_json);

    if let Some(Err(e)) = &loaded {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            path,
            e
        );
    }
    tracing::info!("Configuration loaded: {:?}", config);

    config
}

/// Initialize logging with tracing
fn init_logging(default_filter: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
