//! Configuration loading and representation.
//!
//! Everything comes from environment variables with dev-friendly defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `RELO_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `DATABASE_URL` | unset | Postgres URL; unset means in-memory stores |
//! | `RELO_STOCK_WRITES` | `read_modify_write` | `read_modify_write` or `atomic` |
//! | `RELO_LOG_FORMAT` | `json` | `json` or `text` |

use std::net::SocketAddr;

use thiserror::Error;

use crate::reconciliation::StockWriteMode;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

/// Log output format.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub stock_write_mode: StockWriteMode,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using an arbitrary variable lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = read("RELO_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "RELO_BIND_ADDR",
                message: e.to_string(),
            })?;

        let stock_write_mode = match read("RELO_STOCK_WRITES") {
            Some(v) => v.parse().map_err(|message| ConfigError::Invalid {
                var: "RELO_STOCK_WRITES",
                message,
            })?,
            None => StockWriteMode::default(),
        };

        let log_format = match read("RELO_LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::default(),
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) if v == "text" || v == "pretty" => LogFormat::Text,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    var: "RELO_LOG_FORMAT",
                    message: format!("unknown format {v:?} (expected json or text)"),
                });
            }
        };

        Ok(Self {
            bind_addr,
            database_url: read("DATABASE_URL"),
            stock_write_mode,
            log_format,
        })
    }
}
