//! Session configuration.
//!
//! Supports configuration from:
//! - TOML config files
//! - `GRAPHWIRE_*` environment variables

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GraphwireError, Result};

/// Tunables applied to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rows drained by a PULL or DISCARD that omits an explicit count.
    /// `-1` drains the remainder of the stream.
    #[serde(default = "default_fetch_size")]
    pub default_fetch_size: i64,

    /// Server identification reported in the HELLO response.
    #[serde(default = "default_server_agent")]
    pub server_agent: String,
}

fn default_fetch_size() -> i64 {
    1000
}

fn default_server_agent() -> String {
    format!("graphwire/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_fetch_size: default_fetch_size(),
            server_agent: default_server_agent(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| GraphwireError::Config(format!("Failed to read config file: {e}")))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("GRAPHWIRE_FETCH_SIZE") {
            if let Ok(val) = val.parse() {
                config.default_fetch_size = val;
            }
        }
        if let Ok(agent) = std::env::var("GRAPHWIRE_SERVER_AGENT") {
            config.server_agent = agent;
        }

        config
    }
}
