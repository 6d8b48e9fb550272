//! Router error types.

use thiserror::Error;

/// A route pattern could not be registered.
///
/// Every variant carries the full pattern that was rejected so startup code
/// can report it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// R1001: Pattern does not begin with `/`.
    #[error("R1001: path must begin with '/' in path '{path}'")]
    PathMustStartWithSlash { path: String },

    /// R1002: A handler is already registered for the exact pattern.
    #[error("R1002: a handler is already registered for path '{path}'")]
    DuplicateRoute { path: String },

    /// R1003: A wildcard would shadow a static route, or the other way round.
    #[error(
        "R1003: '{segment}' in new path '{path}' conflicts with existing route '{existing}'"
    )]
    ConflictingWildcard {
        path: String,
        segment: String,
        existing: String,
    },

    /// R1004: `:` or `*` without a name.
    #[error("R1004: wildcards must be named with a non-empty name, found '{wildcard}' in path '{path}'")]
    NamelessWildcard { path: String, wildcard: String },

    /// R1005: More than one wildcard in one segment (e.g. `/:a:b`).
    #[error("R1005: only one wildcard per path segment is allowed, found '{segment}' in path '{path}'")]
    MultipleWildcardsInSegment { path: String, segment: String },

    /// R1006: Catch-all followed by more pattern.
    #[error("R1006: catch-all routes are only allowed at the end of the path in path '{path}'")]
    CatchAllMustBeLast { path: String },

    /// R1007: Catch-all placed where static routes already branch off.
    #[error("R1007: catch-all conflicts with existing route '{existing}' in path '{path}'")]
    CatchAllConflictsWithChildren { path: String, existing: String },

    /// R1008: Catch-all not directly preceded by `/`.
    #[error("R1008: no '/' before catch-all in path '{path}'")]
    NoSlashBeforeCatchAll { path: String },
}

impl RouteError {
    /// Stable diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            RouteError::PathMustStartWithSlash { .. } => "R1001",
            RouteError::DuplicateRoute { .. } => "R1002",
            RouteError::ConflictingWildcard { .. } => "R1003",
            RouteError::NamelessWildcard { .. } => "R1004",
            RouteError::MultipleWildcardsInSegment { .. } => "R1005",
            RouteError::CatchAllMustBeLast { .. } => "R1006",
            RouteError::CatchAllConflictsWithChildren { .. } => "R1007",
            RouteError::NoSlashBeforeCatchAll { .. } => "R1008",
        }
    }

    /// The pattern that was being registered.
    pub fn path(&self) -> &str {
        match self {
            RouteError::PathMustStartWithSlash { path }
            | RouteError::DuplicateRoute { path }
            | RouteError::ConflictingWildcard { path, .. }
            | RouteError::NamelessWildcard { path, .. }
            | RouteError::MultipleWildcardsInSegment { path, .. }
            | RouteError::CatchAllMustBeLast { path }
            | RouteError::CatchAllConflictsWithChildren { path, .. }
            | RouteError::NoSlashBeforeCatchAll { path } => path,
        }
    }
}

/// A request could not be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The matched handler panicked and no panic handler is installed.
    #[error("handler panicked: {message}")]
    HandlerPanicked { message: String },
}

/// The periodic cache sweep could not be started.
#[derive(Debug, Error)]
pub enum SweeperError {
    /// Called outside of a Tokio runtime.
    #[error("cache sweeper requires a Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
