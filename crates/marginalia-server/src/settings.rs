//! Server configuration, layered from an optional TOML file and
//! `MARGINALIA_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use marginalia_social::{DeleteMode, EngineConfig};
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                       String,
  pub port:                       u16,
  pub store_path:                 PathBuf,
  pub delete_mode:                DeleteMode,
  pub side_effect_throttle_ms:    u64,
  pub side_effect_queue_capacity: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let engine = EngineConfig::default();
    Self {
      host:                       "127.0.0.1".to_string(),
      port:                       8787,
      store_path:                 PathBuf::from("~/.local/share/marginalia/ledger.db"),
      delete_mode:                engine.delete_mode,
      side_effect_throttle_ms:    engine.side_effect_throttle_ms,
      side_effect_queue_capacity: engine.side_effect_queue_capacity,
    }
  }
}

impl ServerConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("MARGINALIA").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn engine(&self) -> EngineConfig {
    EngineConfig {
      delete_mode:                self.delete_mode,
      side_effect_throttle_ms:    self.side_effect_throttle_ms,
      side_effect_queue_capacity: self.side_effect_queue_capacity,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
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
