//! `lexnav.toml` plus `LEXNAV_*` environment overrides.
//!
//! ```toml
//! database = "~/.local/share/lexnav/statutes.db"
//!
//! [navigation]
//! gap_size = 100
//! reindex_strategy = "manual"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `LEXNAV_NAVIGATION__GAP_SIZE=1000`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use lexnav_core::config::NavigationConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file.
  pub database:   PathBuf,
  pub navigation: NavigationConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database:   PathBuf::from("lexnav.db"),
      navigation: NavigationConfig::default(),
    }
  }
}

impl Settings {
  /// Read the file (if present) and the environment. A missing file is not
  /// an error; every key has a default.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("LEXNAV")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Self = raw.try_deserialize().context("failed to deserialise settings")?;
    settings.database = expand_tilde(&settings.database);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
