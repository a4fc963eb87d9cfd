//! Logging setup using `tracing` + `tracing-subscriber`.

use tracing_subscriber::fmt;

use crate::config::LogLevel;

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup; calling twice panics, which is fine since
/// main is the only caller.
pub fn init_logging(level: LogLevel) {
    fmt()
        .with_max_level(level.as_tracing_level())
        .with_target(true)
        .init();
}
