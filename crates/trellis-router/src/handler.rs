//! Handler and dispatch outcome types.

use std::any::Any;
use std::sync::Arc;

use http::StatusCode;

/// A request handler invoked with the caller's request context.
///
/// Implemented for every `Fn(&mut C) + Send + Sync`, so closures and
/// boxed closures can be registered directly.
pub trait Handler<C>: Send + Sync {
    fn call(&self, ctx: &mut C);
}

impl<C, F> Handler<C> for F
where
    F: Fn(&mut C) + Send + Sync + ?Sized,
{
    fn call(&self, ctx: &mut C) {
        self(ctx)
    }
}

/// Value a handler panicked with.
pub type PanicPayload = Box<dyn Any + Send>;

/// Callback receiving the request context and the value of a handler panic.
pub type PanicHandler<C> = Arc<dyn Fn(&mut C, PanicPayload) + Send + Sync>;

/// Why a redirect was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Only the path with the trailing slash toggled is registered.
    TrailingSlash,
    /// The cleaned, case-corrected path is registered.
    FixedPath,
}

/// A proposed redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Value for the `Location` header.
    pub location: String,
    /// `301 Moved Permanently` for GET, `307 Temporary Redirect` otherwise.
    pub status: StatusCode,
    pub kind: RedirectKind,
}

/// Result of serving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The matched handler ran to completion.
    Handled,
    /// A handler panicked and the panic handler ran instead.
    Recovered,
    /// The request should be redirected.
    Redirect(Redirect),
    /// Automatic `OPTIONS` response.
    Options { allow: String },
    /// The path exists for other methods only.
    MethodNotAllowed { allow: String },
    /// No route matched.
    NotFound,
}

impl Outcome {
    /// Status code implied by the outcome. Handlers that ran are free to
    /// answer with another status; `Handled` reports `200 OK`.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Handled | Outcome::Options { .. } => StatusCode::OK,
            Outcome::Recovered => StatusCode::INTERNAL_SERVER_ERROR,
            Outcome::Redirect(redirect) => redirect.status,
            Outcome::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Outcome::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// `Allow` header value, when the outcome carries one.
    pub fn allow(&self) -> Option<&str> {
        match self {
            Outcome::Options { allow } | Outcome::MethodNotAllowed { allow } => Some(allow),
            _ => None,
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
