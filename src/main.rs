mod auth;
mod collectors;
mod config;
mod history;
mod http;
mod metrics;
mod monitor;
mod snapshot;

use auth::Authenticator;
use axum::serve;
use clap::Parser;
use config::Config;
use metrics::Metrics;
use monitor::Monitor;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostmond")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(
        listen = %cfg.listen,
        interval_secs = cfg.interval_secs,
        history_size = cfg.history_size,
        "starting hostmond"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialize metrics");
            std::process::exit(1);
        }
    };

    let system_type = collectors::detect_system_type();
    let facts = collectors::detect_facts();
    let collector = collectors::bind(&system_type, Duration::from_millis(cfg.cpu_sample_ms));
    info!(
        system_type = %system_type,
        collector = collector.name(),
        "platform collector bound"
    );

    let monitor = Monitor::new(
        collector,
        facts,
        Duration::from_secs(cfg.interval_secs),
        cfg.history_size,
        metrics.clone(),
    );

    let users: HashMap<String, String> = cfg
        .auth
        .users
        .iter()
        .map(|u| (u.username.clone(), u.password.clone()))
        .collect();
    let authenticator = Arc::new(Authenticator::new(users, cfg.auth.token_ttl_secs));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor_task = monitor.start();

    let http_task = {
        let cfg = cfg.clone();
        let monitor = Arc::clone(&monitor);
        let authenticator = Arc::clone(&authenticator);
        let metrics = metrics.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(monitor, authenticator, metrics);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "invalid listen address");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "failed to start the HTTP server");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "HTTP server error");
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("received Ctrl+C, shutting down");

    let _ = shutdown_tx.send(true);
    monitor.stop();

    if let Some(task) = monitor_task {
        let _ = task.await;
    }
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
