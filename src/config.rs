//! Environment-driven configuration.
//!
//! Recognized variables:
//! - `PORT`: HTTP listen port, default 3000
//! - `MAX_CONCURRENT_TASKS`: positive integer, default 3
//! - `LOG_LEVEL`: one of error, warn, info, http, debug; default info
//! - `TASKS_DB`: database file path, default `tasks.db`

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Log verbosity, mirroring the API surface's five levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Http,
    Debug,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "http" => Some(LogLevel::Http),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    /// Map onto tracing's levels. `http` sits between info and debug in the
    /// source scheme, so it lands on DEBUG and `debug` on TRACE.
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Http => tracing::Level::DEBUG,
            LogLevel::Debug => tracing::Level::TRACE,
        }
    }
}

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_concurrent: usize,
    pub log_level: LogLevel,
    pub db_path: String,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => 3000,
        };

        let max_concurrent = match std::env::var("MAX_CONCURRENT_TASKS") {
            Ok(raw) => {
                let n = raw
                    .parse::<usize>()
                    .context("MAX_CONCURRENT_TASKS must be a positive integer")?;
                if n == 0 {
                    bail!("MAX_CONCURRENT_TASKS must be at least 1");
                }
                n
            }
            Err(_) => 3,
        };

        let log_level = match std::env::var("LOG_LEVEL") {
            Ok(raw) => LogLevel::parse(&raw)
                .with_context(|| format!("unknown LOG_LEVEL: {raw}"))?,
            Err(_) => LogLevel::Info,
        };

        let db_path = std::env::var("TASKS_DB").unwrap_or_else(|_| "tasks.db".to_string());

        Ok(Self {
            port,
            max_concurrent,
            log_level,
            db_path,
            poll_interval: Duration::from_millis(100),
        })
    }
}
