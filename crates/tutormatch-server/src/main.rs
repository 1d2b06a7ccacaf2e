//! tutormatch server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, resolves matches left over from a previous run, and serves the
//! matchmaking API over HTTP until interrupted.

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tutormatch_engine::{LogNotifier, Matchmaker};
use tutormatch_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Tutor matchmaking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = settings::load(&cli.config)?;

  let store_path = settings::expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Matchmaker::new(
    Arc::new(store),
    Arc::new(LogNotifier),
    server_cfg.engine.clone(),
  );
  engine
    .recover()
    .await
    .context("failed to recover pending matches")?;

  let app = axum::Router::new().nest("/api", tutormatch_api::api_router(engine.clone()));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  engine.shutdown();
  tracing::info!("Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("Shutdown signal received");
}
