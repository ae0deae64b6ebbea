//! # Agency Server
//!
//! ```bash
//! # Defaults, or server.toml from the platform config directory
//! cargo run -p agency-server
//!
//! # Explicit config file, environment override
//! AGENCY_PORT=9000 cargo run -p agency-server -- --config ./server.toml
//! ```

use anyhow::Context;
use std::env;
use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agency_server::{build_app, open_database, AppState, ServerConfig};

fn config_path_arg() -> anyhow::Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args.next().context("--config needs a path")?;
                path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                println!("Parts Agency API Server");
                println!();
                println!("Usage: agency-server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>    TOML config file (or AGENCY_CONFIG)");
                println!("  -h, --help             Show this help message");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other} (see --help)"),
        }
    }
    Ok(path)
}

fn init_tracing(config: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load(config_path_arg()?).context("loading configuration")?;
    init_tracing(&config);

    info!(
        addr = %format!("{}:{}", config.host, config.port),
        database = %config.database_path.display(),
        "Starting Parts Agency API server"
    );

    let db = open_database(&config)
        .await
        .context("opening database")?;
    info!("Database ready");

    let addr = config.socket_addr()?;
    let app = build_app(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
