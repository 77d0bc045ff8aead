use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, Instrument};

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;

/// Opens an `http.request` span around the wrapped handler and logs the
/// status and latency once it returns.
///
/// ```rust
/// use sprig::{middleware, Router};
///
/// let app = Router::new().with_middleware(middleware::trace);
/// ```
pub fn trace(next: BoxedHandler) -> BoxedHandler {
    boxed(move |req: Request| {
        let next = Arc::clone(&next);
        async move {
            let span = info_span!("http.request", method = %req.method(), path = %req.path());
            let started = Instant::now();
            let res = next.call(req).instrument(span.clone()).await;
            span.in_scope(|| {
                info!(
                    status = res.status_code().as_u16(),
                    latency_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                    "request completed"
                );
            });
            res
        }
    })
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::router::Router;

    #[tokio::test]
    async fn passes_response_through() {
        let router = Router::new()
            .with_middleware(trace)
            .get("/ok", |_req: Request| async { (StatusCode::ACCEPTED, "done") });

        let res = router.dispatch(Request::new(Method::GET, "/ok")).await;
        assert_eq!(res.status_code(), StatusCode::ACCEPTED);
        assert_eq!(res.body(), b"done");
    }
}
