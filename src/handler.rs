//! Handlers and their type-erased form.
//!
//! Routes, grafted copies of routes and middleware chains all store the
//! same thing: a [`BoxedHandler`], an `Arc<dyn ErasedHandler>`. Anything
//! implementing [`Handler`] converts into one:
//!
//! - `async fn(Request) -> impl IntoResponse` and equivalent closures;
//! - a whole [`Router`], which then dispatches with its own fallbacks.
//!
//! Cloning a route clones the `Arc`, never the handler, so mounting a
//! router copies its tree without duplicating user state.
//!
//! Middleware maps one `BoxedHandler` to another:
//!
//! ```rust
//! use std::sync::Arc;
//! use sprig::{boxed, BoxedHandler, Request};
//!
//! fn server_header(next: BoxedHandler) -> BoxedHandler {
//!     boxed(move |req: Request| {
//!         let next = Arc::clone(&next);
//!         async move {
//!             let mut res = next.call(req).await;
//!             res.set_header("server", "sprig");
//!             res
//!         }
//!     })
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface shared by handlers and middleware output.
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by any `async fn` (or
/// closure returning a future) with the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by [`Router`], which lets a whole router be mounted as an opaque
/// handler with [`Router::mount_handler`].
///
/// The trait is **sealed**: only the impls in this module can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl private::Sealed for Router {}

/// A router boxed as a handler dispatches with its own fallbacks; the path
/// it sees is whatever the outer router left in the request.
impl Handler for Router {
    fn into_boxed_handler(self) -> BoxedHandler {
        let router = Arc::new(self);
        boxed(move |req: Request| {
            let router = Arc::clone(&router);
            async move { router.dispatch(req).await }
        })
    }
}

/// Erases `handler` into a [`BoxedHandler`].
///
/// This is what middleware uses to build the handler it returns.
pub fn boxed(handler: impl Handler) -> BoxedHandler {
    handler.into_boxed_handler()
}

/// Newtype that bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;

    #[tokio::test]
    async fn boxed_fn_converts_into_response() {
        let handler = boxed(|_req: Request| async { "hello" });
        let res = handler.call(Request::new(Method::GET, "/")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"hello");
    }

    #[tokio::test]
    async fn boxed_router_dispatches() {
        let router = Router::new().get("/ping", |_req: Request| async { "pong" });
        let handler = boxed(router);

        let res = handler.call(Request::new(Method::GET, "/ping")).await;
        assert_eq!(res.body(), b"pong");

        let res = handler.call(Request::new(Method::GET, "/nope")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
