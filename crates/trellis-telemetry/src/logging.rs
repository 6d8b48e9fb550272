//! Structured logging with JSON or pretty output.
//!
//! Events are written to stderr so command output on stdout stays
//! machine-readable.

use std::io;

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Build the env filter from config or RUST_LOG
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(io::stderr)
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// The process is starting up.
    pub const STARTUP: &str = "startup";

    /// A route table has been registered.
    pub const ROUTES_LOADED: &str = "routes_loaded";

    /// A route could not be registered.
    pub const ROUTE_REJECTED: &str = "route_rejected";

    /// A lookup result was stored in the result cache.
    pub const CACHE_PROMOTED: &str = "cache_promoted";

    /// The result cache was wiped.
    pub const CACHE_SWEPT: &str = "cache_swept";

    /// A handler panicked while serving a request.
    pub const HANDLER_PANICKED: &str = "handler_panicked";

    /// A request has been resolved to an outcome.
    pub const REQUEST_RESOLVED: &str = "request_resolved";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_routes_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ROUTES_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_rejected {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::ROUTE_REJECTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_cache_promoted {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::CACHE_PROMOTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_cache_swept {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::CACHE_SWEPT,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_handler_panicked {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::HANDLER_PANICKED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_resolved {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::REQUEST_RESOLVED,
            $($field)*
        )
    };
}
