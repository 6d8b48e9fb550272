//! Route table files.
//!
//! A route table is a YAML document with the router behaviour and the list
//! of routes to register:
//!
//! ```yaml
//! router:
//!   redirect_fixed_path: false
//!   cache:
//!     promotion_threshold: 64
//! routes:
//!   - method: GET
//!     path: /users/:id
//!     name: get_user
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis_router::{RouteError, Router, RouterConfig};
use trellis_telemetry::{log_route_rejected, log_routes_loaded};

/// Errors raised while loading or registering a route table.
#[derive(Debug, Error)]
pub enum RouteTableError {
    #[error("failed to read route table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse route table: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid method '{method}' for path '{path}'")]
    InvalidMethod { method: String, path: String },

    #[error("{method} {path}: {source}")]
    Registration {
        method: String,
        path: String,
        #[source]
        source: RouteError,
    },
}

impl RouteTableError {
    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            RouteTableError::Io(_) => "R1000",
            RouteTableError::Yaml(_) => "R1009",
            RouteTableError::InvalidMethod { .. } => "R1010",
            RouteTableError::Registration { source, .. } => source.code(),
        }
    }

    /// `METHOD path` of the route the error is about, if any.
    pub fn location(&self) -> Option<String> {
        match self {
            RouteTableError::InvalidMethod { method, path }
            | RouteTableError::Registration { method, path, .. } => {
                Some(format!("{} {}", method, path))
            }
            _ => None,
        }
    }
}

/// One route of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RouteSpec {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The route name, or `METHOD path` for unnamed routes.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A parsed route table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

impl RouteTable {
    /// Parse a route table from YAML. Methods are upper-cased.
    pub fn from_yaml(source: &str) -> Result<Self, RouteTableError> {
        let mut table: RouteTable = serde_yaml::from_str(source)?;
        for route in &mut table.routes {
            route.method.make_ascii_uppercase();
        }
        Ok(table)
    }

    /// Read and parse a route table file.
    pub fn load(path: &Path) -> Result<Self, RouteTableError> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Register every route into a new router, stopping at the first error.
    pub fn build(&self) -> Result<Router<RouteSpec>, RouteTableError> {
        let mut router = Router::with_config(self.router.clone());
        for route in &self.routes {
            register(&mut router, route)?;
        }

        log_routes_loaded!(
            routes = self.routes.len(),
            methods = router.methods().len(),
            "route table registered"
        );
        Ok(router)
    }

    /// Register every route into a scratch router and collect every error.
    ///
    /// A rejected route does not stop the check; routes registered after it
    /// are still checked against everything accepted so far.
    pub fn check(&self) -> Vec<RouteTableError> {
        let mut router: Router<RouteSpec> = Router::with_config(self.router.clone());
        self.routes
            .iter()
            .filter_map(|route| register(&mut router, route).err())
            .collect()
    }
}

fn register(router: &mut Router<RouteSpec>, route: &RouteSpec) -> Result<(), RouteTableError> {
    if Method::from_bytes(route.method.as_bytes()).is_err() {
        log_route_rejected!(method = %route.method, path = %route.path, "invalid method");
        return Err(RouteTableError::InvalidMethod {
            method: route.method.clone(),
            path: route.path.clone(),
        });
    }

    router
        .handle(&route.method, &route.path, route.clone())
        .map_err(|source| {
            log_route_rejected!(
                method = %route.method,
                path = %route.path,
                code = source.code(),
                error = %source,
                "route rejected"
            );
            RouteTableError::Registration {
                method: route.method.clone(),
                path: route.path.clone(),
                source,
            }
        })
}
