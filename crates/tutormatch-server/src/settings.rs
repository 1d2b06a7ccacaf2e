//! Server configuration: `config.toml` layered with `TUTORMATCH_*` env vars.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tutormatch_engine::EngineConfig;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub engine:     EngineConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("tutormatch.db") }

/// Read `path` if it exists, then apply env overrides such as
/// `TUTORMATCH_PORT` or `TUTORMATCH_ENGINE__OFFER_WINDOW_MS`.
pub fn load(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("TUTORMATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
