//! Middleware pipeline for processing a turn.
//!
//! Middleware wraps the application's [`TurnHandler`] with cross-cutting
//! concerns such as loading and saving state. Each middleware receives
//! a [`Next`] that it can call to continue the chain, or drop to
//! short-circuit.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use turnstate_core::{TurnContext, TurnError};

/// Boxed, sendable future used by the closure adapters.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The application logic at the end of the pipeline.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// Process one inbound turn.
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), TurnError>;
}

/// A pipeline stage that wraps the rest of the turn.
///
/// A middleware can:
/// - do work before calling `next.run(ctx)` (load state)
/// - skip the rest of the pipeline by not calling `next`
/// - do work after `next` returns (save state)
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a turn, optionally delegating to the rest of the pipeline.
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), TurnError>;
}

/// The remaining middleware chain plus the terminal handler.
///
/// Consumed on call to prevent double-invoke.
pub struct Next<'a> {
    handler: &'a dyn TurnHandler,
    middleware: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    /// Create a new Next from a handler and middleware slice.
    pub(crate) fn new(handler: &'a dyn TurnHandler, middleware: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            handler,
            middleware,
        }
    }

    /// Continue the chain, eventually calling the handler.
    pub async fn run(self, ctx: &mut TurnContext) -> Result<(), TurnError> {
        if let Some((head, tail)) = self.middleware.split_first() {
            let next = Next::new(self.handler, tail);
            head.on_turn(ctx, next).await
        } else {
            self.handler.on_turn(ctx).await
        }
    }
}

/// An ordered list of middleware. Registration order is execution order
/// on the way in, and reverse order on the way out.
#[derive(Clone, Default)]
pub struct MiddlewareSet {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the end of the pipeline.
    pub fn add(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Whether no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run a turn through every middleware and then `handler`.
    pub async fn run(&self, ctx: &mut TurnContext, handler: &dyn TurnHandler) -> Result<(), TurnError> {
        Next::new(handler, &self.middleware).run(ctx).await
    }
}

struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F> TurnHandler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut TurnContext) -> BoxFuture<'a, Result<(), TurnError>> + Send + Sync,
{
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), TurnError> {
        (self.f)(ctx).await
    }
}

/// Create a handler from a closure.
///
/// The closure must return a `Box::pin(async move { ... })` future.
///
/// ```ignore
/// let handler = handler_fn(|ctx| {
///     Box::pin(async move {
///         tracing::info!(text = ?ctx.activity().text, "got message");
///         Ok(())
///     })
/// });
/// ```
#[must_use]
pub fn handler_fn<F>(f: F) -> impl TurnHandler
where
    F: for<'a> Fn(&'a mut TurnContext) -> BoxFuture<'a, Result<(), TurnError>> + Send + Sync,
{
    HandlerFn { f }
}

struct MiddlewareFn<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    async fn on_turn(&self, ctx: &mut TurnContext, next: Next<'_>) -> Result<(), TurnError> {
        (self.f)(ctx, next).await
    }
}

/// Create middleware from a closure (like axum's `from_fn`).
///
/// ```ignore
/// let logging = middleware_fn(|ctx, next| {
///     Box::pin(async move {
///         tracing::debug!("turn start");
///         let result = next.run(ctx).await;
///         tracing::debug!("turn end");
///         result
///     })
/// });
/// ```
#[must_use]
pub fn middleware_fn<F>(f: F) -> impl Middleware
where
    F: for<'a> Fn(&'a mut TurnContext, Next<'a>) -> BoxFuture<'a, Result<(), TurnError>>
        + Send
        + Sync,
{
    MiddlewareFn { f }
}
