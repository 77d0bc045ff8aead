//! sprig example: nested routers, regex segments, middleware and fallbacks.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/alice          # 404, id must be numeric
//!   curl -X PUT http://localhost:3000/users/42      # 405, Allow: DELETE, GET
//!   curl -X OPTIONS http://localhost:3000/users/42
//!   curl http://localhost:3000/pl/blog/hello
//!   curl http://localhost:3000/legacy/anything/below

use std::sync::Arc;

use sprig::{
    boxed, middleware, BoxedHandler, Request, Response, Router, Server, StatusCode,
};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), sprig::Error> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let users = Router::new()
        .get("/{id:[0-9]+}", get_user)
        .delete("/{id:[0-9]+}", delete_user)
        .post("/", create_user);

    let app = Router::new()
        .with_middleware(middleware::trace)
        .with_middleware(server_header)
        .mount("/users", users)
        .get("/{lang:en|pl}/blog/{slug}", blog_post)
        .mount_handler("/legacy", legacy)
        .not_found(|req: Request| async move {
            (StatusCode::NOT_FOUND, format!("nothing at {}\n", req.path()))
        });

    for (method, template) in app.routes() {
        tracing::info!(%method, %template, "route");
    }

    Server::bind("0.0.0.0:3000").serve(app).await
}

fn server_header(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let mut res = next.call(req).await;
            res.set_header("server", "sprig");
            res
        }
    })
}

async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or_default();
    Response::json(format!(r#"{{"id":{id},"name":"alice"}}"#).into_bytes())
}

async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(br#"{"id":99,"name":"new_user"}"#.to_vec())
}

async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn blog_post(req: Request) -> String {
    let params = req.params().cloned().unwrap_or_default();
    format!("[{}] {}\n", params.value("lang"), params.value("slug"))
}

/// Receives the path below `/legacy`.
async fn legacy(req: Request) -> String {
    format!("legacy app saw {}\n", req.path())
}
