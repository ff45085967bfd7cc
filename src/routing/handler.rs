//! Route handlers and handler chains.
//!
//! A handler takes the call body and the call's [`Context`] and returns
//! either a result object, nothing (`Ok(None)`), or a [`HandlerError`].
//! Middleware and afterware use the same interface; in a chain exactly one
//! handler is expected to produce the result.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::dispatch::context::Context;
use crate::dispatch::error::HandlerError;

/// What a handler resolves to.
pub type HandlerResult = Result<Option<Value>, HandlerError>;

/// A `(body, context)` route handler.
///
/// Implemented for every `Fn(Value, Context) -> impl Future<Output = HandlerResult>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, body: Value, context: Context) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, body: Value, context: Context) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(body, context))
    }
}

/// Shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Box a closure as a handler.
///
/// Taking the closure through this function lets the compiler infer its
/// argument types.
pub fn handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Value, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// The built-in handler of unregistered routes.
pub(crate) fn not_found() -> BoxedHandler {
    handler(|_, _| async { Err(HandlerError::not_found()) })
}

/// Ordered handlers of one route: middleware, handlers, afterware.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<BoxedHandler>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<BoxedHandler>) -> Self {
        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxedHandler> {
        self.handlers.iter()
    }

    /// A new chain with `before` prepended and `after` appended.
    pub(crate) fn wrapped(&self, before: &[BoxedHandler], after: &[BoxedHandler]) -> Self {
        let mut handlers = Vec::with_capacity(before.len() + self.handlers.len() + after.len());
        handlers.extend(before.iter().cloned());
        handlers.extend(self.handlers.iter().cloned());
        handlers.extend(after.iter().cloned());
        Self { handlers }
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain").field("len", &self.handlers.len()).finish()
    }
}

impl From<BoxedHandler> for HandlerChain {
    fn from(handler: BoxedHandler) -> Self {
        Self::new(vec![handler])
    }
}

impl From<Vec<BoxedHandler>> for HandlerChain {
    fn from(handlers: Vec<BoxedHandler>) -> Self {
        Self::new(handlers)
    }
}

impl FromIterator<BoxedHandler> for HandlerChain {
    fn from_iter<I: IntoIterator<Item = BoxedHandler>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
