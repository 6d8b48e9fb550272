//! Describe how a request resolves against a route table.

use std::fmt;

use serde::Serialize;
use trellis_router::{Params, RedirectKind, RouteMatch, Router};

use crate::route_table::RouteSpec;

/// What the router would do with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Found {
        status: u16,
        route: String,
        pattern: String,
        params: Vec<Param>,
        cached: bool,
    },
    Redirect {
        status: u16,
        location: String,
        reason: &'static str,
    },
    Options {
        status: u16,
        allow: String,
    },
    MethodNotAllowed {
        status: u16,
        allow: String,
    },
    NotFound {
        status: u16,
    },
}

/// One captured parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Resolution {
    /// HTTP status the router implies.
    pub fn status(&self) -> u16 {
        match self {
            Resolution::Found { status, .. }
            | Resolution::Redirect { status, .. }
            | Resolution::Options { status, .. }
            | Resolution::MethodNotAllowed { status, .. }
            | Resolution::NotFound { status } => *status,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Found {
                status,
                route,
                pattern,
                params,
                ..
            } => {
                write!(f, "{} {} ({})", status, route, pattern)?;
                for param in params {
                    write!(f, "\n  {} = {}", param.name, param.value)?;
                }
                Ok(())
            }
            Resolution::Redirect {
                status,
                location,
                reason,
            } => write!(f, "{} redirect to {} ({})", status, location, reason),
            Resolution::Options { status, allow } => write!(f, "{} options, Allow: {}", status, allow),
            Resolution::MethodNotAllowed { status, allow } => {
                write!(f, "{} method not allowed, Allow: {}", status, allow)
            }
            Resolution::NotFound { status } => write!(f, "{} not found", status),
        }
    }
}

/// Resolve `method` and `path` without running anything.
pub fn resolve(router: &Router<RouteSpec>, method: &str, path: &str) -> Resolution {
    let mut params = Params::new();

    match router.resolve(method, path, &mut params) {
        RouteMatch::Found { handler, cached } => Resolution::Found {
            status: 200,
            route: handler.label(),
            pattern: handler.path.clone(),
            params: params
                .iter()
                .map(|(name, value)| Param {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            cached,
        },
        RouteMatch::Redirect(redirect) => Resolution::Redirect {
            status: redirect.status.as_u16(),
            location: redirect.location,
            reason: match redirect.kind {
                RedirectKind::TrailingSlash => "trailing slash",
                RedirectKind::FixedPath => "fixed path",
            },
        },
        RouteMatch::Options { allow } => Resolution::Options { status: 200, allow },
        RouteMatch::MethodNotAllowed { allow } => Resolution::MethodNotAllowed { status: 405, allow },
        RouteMatch::NotFound => Resolution::NotFound { status: 404 },
    }
}
