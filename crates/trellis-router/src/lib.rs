//! Compressed radix-trie HTTP request router.
//!
//! One trie per HTTP method maps route patterns to handlers. Patterns are
//! made of literal bytes, `:name` wildcards matching one path segment, and
//! an optional final `*name` catch-all matching the rest of the path:
//!
//! ```text
//! /                       only "/"
//! /user/:name             "/user/gopher", not "/user/gopher/x"
//! /src/*filepath          "/src/", "/src/a/b.go" (filepath = "/a/b.go")
//! ```
//!
//! Every request matches at most one route. Patterns that would make two
//! routes compete for the same request are rejected at registration.
//!
//! On a miss the router can propose a redirect: to the path with the
//! trailing slash toggled, or to the cleaned, case-corrected path. Lookups
//! of hot parameterized routes are served from a result cache that is
//! wiped periodically.
//!
//! # Usage
//!
//! ```ignore
//! use trellis_router::{Router, Params};
//!
//! let mut router = Router::new();
//! router.get("/user/:name", "user")?;
//!
//! let mut params = Params::new();
//! let found = router.lookup("GET", "/user/gopher", &mut params);
//! assert_eq!(params.get("name"), Some("gopher"));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod params;
pub mod path;
pub mod router;
mod tree;

pub use cache::{CacheStats, CacheSweeper, ResultCache};
pub use config::{CacheConfig, RouterConfig};
pub use error::{DispatchError, RouteError, SweeperError};
pub use handler::{Handler, Outcome, PanicHandler, PanicPayload, Redirect, RedirectKind};
pub use params::{Discard, ParamSink, Params};
pub use path::clean_path;
pub use router::{Lookup, RouteMatch, Router};
