//! Runtime server configuration.
//!
//! Layered from an optional TOML file and `SURVEY_*` environment variables,
//! the latter taking precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_database_path")]
  pub database_path:         PathBuf,
  #[serde(default = "default_admin_username")]
  pub admin_username:        String,
  /// PHC string produced by argon2; see `survey-server --hash-password`.
  pub admin_password_hash:   String,
  /// Allowed CORS origins. Empty allows any origin.
  #[serde(default)]
  pub cors_origins:          Vec<String>,
  /// Requests per client per minute on the public routes; `0` disables.
  #[serde(default = "default_rate_limit")]
  pub rate_limit_per_minute: u32,
  /// Take the client address from `X-Forwarded-For` instead of the socket.
  /// Only enable behind a reverse proxy that sets the header.
  #[serde(default)]
  pub trust_forwarded_for:   bool,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_database_path() -> PathBuf { PathBuf::from("survey.db") }

fn default_admin_username() -> String { "admin".to_owned() }

fn default_rate_limit() -> u32 { 30 }

impl ServerConfig {
  /// Read `path` (if present) and the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("SURVEY")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `database_path` with a leading `~` expanded.
  pub fn resolved_database_path(&self) -> PathBuf { expand_tilde(&self.database_path) }
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
