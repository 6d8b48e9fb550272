//! Logging infrastructure for the Trellis router.
//!
//! This crate provides:
//! - Structured JSON or pretty logging on stderr, filtered by level or `RUST_LOG`
//! - Standard event names and `log_*` macros that attach them
//!
//! # Usage
//!
//! ```ignore
//! use trellis_telemetry::{init_logging, TelemetryConfig, LogFormat};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("info")
//!     .with_log_format(LogFormat::Json);
//!
//! init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}
