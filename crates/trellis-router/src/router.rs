//! The router: one trie per HTTP method, the result cache, and the request
//! state machine around them.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::{Method, StatusCode};

use crate::cache::{CacheStats, CacheSweeper, ResultCache};
use crate::config::RouterConfig;
use crate::error::{DispatchError, RouteError, SweeperError};
use crate::handler::{panic_message, Handler, Outcome, PanicHandler, PanicPayload, Redirect, RedirectKind};
use crate::params::{Discard, ParamSink, Params};
use crate::path::clean_path;
use crate::tree::Node;
use trellis_telemetry::{log_cache_promoted, log_handler_panicked, log_request_resolved};

/// Result of a plain lookup.
#[derive(Debug)]
pub struct Lookup<H> {
    pub handler: Option<Arc<H>>,
    /// No route matched, but one exists with the trailing slash toggled.
    pub trailing_slash_redirect: bool,
    /// The result came from the result cache.
    pub cached: bool,
}

/// Resolution of a request, before any handler runs.
#[derive(Debug)]
pub enum RouteMatch<H> {
    /// A route matched; parameters have been written to the sink.
    Found { handler: Arc<H>, cached: bool },
    /// The request should be redirected.
    Redirect(Redirect),
    /// Automatic `OPTIONS` response with the `Allow` value.
    Options { allow: String },
    /// The path exists for other methods only.
    MethodNotAllowed { allow: String },
    /// No route matched.
    NotFound,
}

/// HTTP request router.
///
/// Routes are registered with [`Router::handle`] before the router is
/// shared; lookups only need `&self` and may run from any number of threads.
///
/// `H` is the handler type. `C` is the request context handed to handlers
/// by [`Router::serve`] and to the panic handler.
pub struct Router<H, C = ()> {
    trees: HashMap<String, Node<H>>,
    cache: Arc<ResultCache<H>>,
    sweeper: Option<CacheSweeper>,
    config: RouterConfig,

    not_found: Option<Arc<H>>,
    method_not_allowed: Option<Arc<H>>,
    global_options: Option<Arc<H>>,
    panic_handler: Option<PanicHandler<C>>,
}

impl<H, C> fmt::Debug for Router<H, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.methods())
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .field("sweeper_running", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}

impl<H, C> Default for Router<H, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, C> Router<H, C> {
    /// Create a router with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            trees: HashMap::new(),
            cache: Arc::new(ResultCache::new()),
            sweeper: None,
            config,
            not_found: None,
            method_not_allowed: None,
            global_options: None,
            panic_handler: None,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Methods that have at least one route, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.trees.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }

    /// Register `handler` for requests with `method` whose path matches
    /// `pattern`.
    ///
    /// Pattern syntax: literal bytes, `:name` for one path segment, and a
    /// final `*name` for the rest of the path. A rejected pattern does not
    /// change how any registered route resolves.
    pub fn handle(&mut self, method: &str, pattern: &str, handler: H) -> Result<(), RouteError> {
        let handler = Arc::new(handler);
        let counters = self.cache.counters();

        match self.trees.get_mut(method) {
            Some(root) => root.insert(pattern, handler, counters)?,
            None => {
                let mut root = Node::default();
                root.insert(pattern, handler, counters)?;
                self.trees.insert(method.to_string(), root);
            }
        }

        tracing::debug!(method, path = pattern, "route registered");
        Ok(())
    }

    pub fn get(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::GET.as_str(), pattern, handler)
    }

    pub fn head(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::HEAD.as_str(), pattern, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::OPTIONS.as_str(), pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::POST.as_str(), pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::PUT.as_str(), pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::PATCH.as_str(), pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: H) -> Result<(), RouteError> {
        self.handle(Method::DELETE.as_str(), pattern, handler)
    }

    /// Handler run by [`Router::serve`] when nothing matches.
    pub fn set_not_found(&mut self, handler: H) {
        self.not_found = Some(Arc::new(handler));
    }

    /// Handler run by [`Router::serve`] for 405 outcomes.
    pub fn set_method_not_allowed(&mut self, handler: H) {
        self.method_not_allowed = Some(Arc::new(handler));
    }

    /// Handler run by [`Router::serve`] for automatic `OPTIONS` responses.
    pub fn set_global_options(&mut self, handler: H) {
        self.global_options = Some(Arc::new(handler));
    }

    /// Callback run when a handler panics. Without one, [`Router::serve`]
    /// reports the panic as [`DispatchError::HandlerPanicked`].
    pub fn set_panic_handler<F>(&mut self, handler: F)
    where
        F: Fn(&mut C, PanicPayload) + Send + Sync + 'static,
    {
        self.panic_handler = Some(Arc::new(handler));
    }

    /// Look up the handler for `method` and `path`.
    ///
    /// The result cache is consulted first. On a match the captured
    /// parameters are written to `sink`; on a miss nothing is written.
    pub fn lookup<S>(&self, method: &str, path: &str, sink: &mut S) -> Lookup<H>
    where
        S: ParamSink + ?Sized,
    {
        let cache = &self.config.cache;

        if cache.enabled {
            if let Some(entry) = self.cache.get(method, path) {
                if entry.handler.is_some() {
                    entry.params.replay_into(sink);
                }
                return Lookup {
                    handler: entry.handler,
                    trailing_slash_redirect: entry.trailing_slash_redirect,
                    cached: true,
                };
            }
        }

        let Some(root) = self.trees.get(method) else {
            return Lookup {
                handler: None,
                trailing_slash_redirect: false,
                cached: false,
            };
        };

        let mut params = Params::new();
        let found = root.get_value(path, &mut params);
        let handler = found.handler.cloned();

        if handler.is_some() {
            params.replay_into(sink);

            if cache.enabled && found.hits > cache.promotion_threshold {
                log_cache_promoted!(method, path, hits = found.hits, "lookup result cached");
                self.cache.put(
                    method,
                    path,
                    handler.clone(),
                    found.trailing_slash_redirect,
                    params,
                );
            }
        }

        Lookup {
            handler,
            trailing_slash_redirect: found.trailing_slash_redirect,
            cached: false,
        }
    }

    /// Case-insensitive lookup in the tree of `method`; see
    /// [`Router::resolve`] for how it is used.
    pub fn find_case_insensitive_path(
        &self,
        method: &str,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        self.trees
            .get(method)?
            .find_case_insensitive_path(path, fix_trailing_slash)
    }

    /// `Allow` header value for `path`: every method other than `exclude`
    /// and `OPTIONS` with a route matching it, sorted, followed by
    /// `OPTIONS`. Empty when no method matches.
    ///
    /// The path `*` with `exclude == "OPTIONS"` asks for the server-wide
    /// list: every method with a route at all.
    pub fn allowed(&self, path: &str, exclude: &str) -> String {
        let options = Method::OPTIONS.as_str();
        let mut allowed: Vec<&str> = Vec::new();

        if path == "*" {
            if exclude == options {
                allowed.extend(
                    self.trees
                        .keys()
                        .map(String::as_str)
                        .filter(|method| *method != options),
                );
            }
        } else {
            for method in self.trees.keys().map(String::as_str) {
                if method == exclude || method == options {
                    continue;
                }
                if self.lookup(method, path, &mut Discard).handler.is_some() {
                    allowed.push(method);
                }
            }
        }

        if allowed.is_empty() {
            return String::new();
        }

        allowed.sort_unstable();
        allowed.push(options);
        allowed.join(", ")
    }

    /// Resolve a request without running any handler.
    ///
    /// In order: an exact match; a trailing-slash redirect; a fixed-path
    /// redirect; an automatic `OPTIONS` response; a 405 with the methods
    /// that would match; not found. Redirects are never proposed for
    /// `CONNECT` requests or for the path `/`.
    pub fn resolve<S>(&self, method: &str, path: &str, sink: &mut S) -> RouteMatch<H>
    where
        S: ParamSink + ?Sized,
    {
        if self.trees.contains_key(method) {
            let found = self.lookup(method, path, sink);
            if let Some(handler) = found.handler {
                return RouteMatch::Found {
                    handler,
                    cached: found.cached,
                };
            }

            if Method::CONNECT != method && path != "/" {
                let status = if Method::GET == method {
                    StatusCode::MOVED_PERMANENTLY
                } else {
                    StatusCode::TEMPORARY_REDIRECT
                };

                if found.trailing_slash_redirect && self.config.redirect_trailing_slash {
                    let location = match path.strip_suffix('/') {
                        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
                        _ => format!("{path}/"),
                    };
                    return RouteMatch::Redirect(Redirect {
                        location,
                        status,
                        kind: RedirectKind::TrailingSlash,
                    });
                }

                if self.config.redirect_fixed_path {
                    if let Some(location) = self.find_case_insensitive_path(
                        method,
                        &clean_path(path),
                        self.config.redirect_trailing_slash,
                    ) {
                        return RouteMatch::Redirect(Redirect {
                            location,
                            status,
                            kind: RedirectKind::FixedPath,
                        });
                    }
                }
            }
        }

        if Method::OPTIONS == method && self.config.handle_options {
            let allow = self.allowed(path, method);
            if !allow.is_empty() {
                return RouteMatch::Options { allow };
            }
        } else if Method::OPTIONS != method && self.config.handle_method_not_allowed {
            let allow = self.allowed(path, method);
            if !allow.is_empty() {
                return RouteMatch::MethodNotAllowed { allow };
            }
        }

        RouteMatch::NotFound
    }

    /// Resolve a request and run the handler it leads to.
    ///
    /// Captured parameters are written to `ctx` before the handler runs.
    /// Fallback handlers run for not found, 405 and automatic `OPTIONS`
    /// outcomes when set. A panicking handler is caught: the panic handler
    /// runs if one is set, otherwise the panic is returned as an error.
    pub fn serve(&self, method: &str, path: &str, ctx: &mut C) -> Result<Outcome, DispatchError>
    where
        H: Handler<C>,
        C: ParamSink,
    {
        let (outcome, handler) = match self.resolve(method, path, ctx) {
            RouteMatch::Found { handler, .. } => (Outcome::Handled, Some(handler)),
            RouteMatch::Redirect(redirect) => (Outcome::Redirect(redirect), None),
            RouteMatch::Options { allow } => {
                (Outcome::Options { allow }, self.global_options.clone())
            }
            RouteMatch::MethodNotAllowed { allow } => (
                Outcome::MethodNotAllowed { allow },
                self.method_not_allowed.clone(),
            ),
            RouteMatch::NotFound => (Outcome::NotFound, self.not_found.clone()),
        };

        let outcome = match handler {
            Some(handler) => self.invoke(&*handler, method, path, ctx, outcome)?,
            None => outcome,
        };

        log_request_resolved!(
            method,
            path,
            status = outcome.status().as_u16(),
            "request resolved"
        );
        Ok(outcome)
    }

    fn invoke(
        &self,
        handler: &H,
        method: &str,
        path: &str,
        ctx: &mut C,
        outcome: Outcome,
    ) -> Result<Outcome, DispatchError>
    where
        H: Handler<C>,
    {
        let payload = match panic::catch_unwind(AssertUnwindSafe(|| handler.call(ctx))) {
            Ok(()) => return Ok(outcome),
            Err(payload) => payload,
        };

        let message = panic_message(payload.as_ref());
        log_handler_panicked!(
            method,
            path,
            message = %message,
            recovered = self.panic_handler.is_some(),
            "handler panicked"
        );

        match &self.panic_handler {
            Some(recover) => {
                recover(ctx, payload);
                Ok(Outcome::Recovered)
            }
            None => Err(DispatchError::HandlerPanicked { message }),
        }
    }

    /// Cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wipe the result cache and reset every hit counter now, exactly as
    /// the periodic sweep does. Returns the number of dropped entries.
    pub fn clear_cache(&self) -> usize {
        self.cache.wipe()
    }

    /// Start the periodic cache wipe on the current Tokio runtime.
    ///
    /// Does nothing if the sweeper is already running. The task stops on
    /// [`Router::shutdown`] or when the router is dropped.
    pub fn start_cache_sweeper(&mut self) -> Result<(), SweeperError>
    where
        H: Send + Sync + 'static,
    {
        if self.sweeper.is_some() {
            return Ok(());
        }

        let period = self.config.cache.sweep_interval();
        self.sweeper = Some(CacheSweeper::spawn(Arc::clone(&self.cache), period)?);
        tracing::debug!(period_ms = self.config.cache.sweep_interval_ms, "cache sweeper started");
        Ok(())
    }

    /// Stop the periodic cache wipe, if running.
    pub fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
    }
}
