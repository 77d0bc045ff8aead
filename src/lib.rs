//! # sprig
//!
//! An embeddable HTTP router: a trie of path templates per method, with
//! priority-ordered middleware at the router, method and route level.
//!
//! ## Templates
//!
//! Templates are `/`-separated segments. Empty segments are ignored, so
//! `/a//b/` and `/a/b` are the same route.
//!
//! - `users`: a literal, matched exactly;
//! - `{id}`: a wildcard, binds any one segment to `id`;
//! - `{id:[0-9]+}`: a regex wildcard, binds one segment the pattern matches
//!   in full.
//!
//! At each segment a literal child beats a regex child, which beats the
//! plain wildcard. Regex children are tried in registration order. Once a
//! child is chosen the match never backtracks.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sprig::{middleware, Method, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sprig::Error> {
//!     let users = Router::new()
//!         .get("/{id:[0-9]+}", get_user)
//!         .post("/", create_user);
//!
//!     let app = Router::new()
//!         .with_middleware(middleware::trace)
//!         .mount("/users", users)
//!         .handle(Method::GET, "/{lang:en|pl}/about", about);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or_default();
//!     Response::json(format!(r#"{{"id":{id}}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .no_body()
//! }
//!
//! async fn about(req: Request) -> String {
//!     format!("about ({})", req.param("lang").unwrap_or_default())
//! }
//! ```

mod error;
mod files;
mod handler;
mod params;
mod request;
mod response;
mod route;
mod router;
mod server;
mod trie;

pub mod middleware;

pub use error::Error;
pub use handler::{boxed, BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use http::{Method, StatusCode};
pub use params::{Param, Params};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::{Router, Scope};
pub use server::Server;
