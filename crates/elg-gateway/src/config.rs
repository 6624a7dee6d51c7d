//! `server.yaml` configuration: the one piece of ambient startup state every
//! connection worker shares read-only.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Parsed contents of `server.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub api_url: String,
    /// Per-connection socket deadline, in seconds.
    pub conn_timeout: u64,
    /// Upstream HTTP deadline, in seconds. Falls back to `conn_timeout` when
    /// absent, matching the gateway's timeout-budget contract.
    #[serde(default)]
    pub upstream_timeout: Option<u64>,
    /// Opaque logging configuration handed to whatever log backend the
    /// deployment environment wires up; the gateway itself only consults
    /// `RUST_LOG` via `tracing_subscriber::EnvFilter`.
    #[serde(default)]
    pub log_config: Option<config::Value>,
    /// Path to the partner key directory, relative to the server config
    /// file's directory unless absolute.
    #[serde(default = "default_partner_keys_path")]
    pub partner_keys_path: String,
}

fn default_partner_keys_path() -> String {
    "partner_keys.yaml".to_string()
}

impl ServerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn conn_timeout(&self) -> Duration {
        Duration::from_secs(self.conn_timeout)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout.unwrap_or(self.conn_timeout))
    }
}
