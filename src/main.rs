//! # WePress — Scheduled Publishing Service
//!
//! Boot order matters: load config, open the durable stores, recover
//! scheduled jobs from history, then start the dispatch and token-refresh
//! loops and finally the HTTP gateway. Recovery completes before the
//! listener binds so no request ever sees a half-recovered scheduler.
//!
//! Usage:
//!   wepress                         # Start with ~/.wepress/config.toml
//!   wepress --config ./dev.toml    # Custom config file
//!   wepress --port 8080            # Override the gateway port

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wepress_core::WePressConfig;
use wepress_gateway::AppState;
use wepress_history::HistoryStore;
use wepress_scheduler::{PublishAction, PublishScheduler, recover_jobs, run_dispatch_loop};
use wepress_wechat::{TokenCache, WeChatClient, spawn_token_refresh_loop};

#[derive(Parser)]
#[command(
    name = "wepress",
    version,
    about = "Scheduled article publishing for WeChat Official Accounts"
)]
struct Cli {
    /// Config file path (default: ~/.wepress/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the gateway port
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "wepress=debug,wepress_scheduler=debug,wepress_gateway=debug,tower_http=debug"
    } else {
        "wepress=info,wepress_scheduler=info,wepress_gateway=info,wepress_wechat=info,wepress_history=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = match &cli.config {
        Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
        None => WePressConfig::default_path(),
    };
    let mut config = if config_path.exists() {
        WePressConfig::load_from(&config_path)?
    } else {
        tracing::info!("No config at {}, using defaults", config_path.display());
        WePressConfig::default()
    };
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    if !config.wechat_configured() {
        tracing::warn!("WeChat credentials not configured — publish calls will be rejected");
    }

    let data_dir = config.scheduler.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let history = Arc::new(HistoryStore::new(&data_dir));
    let wechat = Arc::new(WeChatClient::new(&config.wechat)?);
    let token_cache = Arc::new(TokenCache::new(&data_dir));
    let tick_secs = config.scheduler.tick_secs;
    let token_refresh_secs = config.scheduler.token_refresh_secs;
    let shared_config = Arc::new(Mutex::new(config));

    let mut scheduler = PublishScheduler::open(&data_dir.join("publish_jobs.db"))?;
    let recovered = recover_jobs(&history, &mut scheduler);
    tracing::info!(
        "Scheduler ready: {} pending job(s) ({recovered} recovered from history)",
        scheduler.job_count()
    );
    let scheduler = Arc::new(tokio::sync::Mutex::new(scheduler));

    let action = Arc::new(PublishAction::new(
        wechat.clone(),
        history.clone(),
        shared_config.clone(),
    ));

    tokio::spawn(run_dispatch_loop(
        scheduler.clone(),
        action.clone(),
        tick_secs,
    ));
    spawn_token_refresh_loop(
        token_cache.clone(),
        wechat.clone(),
        shared_config.clone(),
        token_refresh_secs,
    );

    let state = AppState {
        config: shared_config,
        config_path,
        history,
        scheduler,
        action,
        wechat,
        token_cache,
        start_time: std::time::Instant::now(),
    };
    wepress_gateway::start(state).await
}
