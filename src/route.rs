//! A registered handler and the middleware scoped to it.

use crate::handler::BoxedHandler;
use crate::middleware::Collection;

#[derive(Clone)]
pub(crate) struct Route {
    handler: Option<BoxedHandler>,
    middleware: Collection<BoxedHandler>,
    mounted: bool,
}

impl Route {
    pub(crate) fn new(handler: Option<BoxedHandler>) -> Self {
        Self { handler, middleware: Collection::default(), mounted: false }
    }

    /// An opaque handler grafted at a mount prefix. It receives the request
    /// path with the prefix stripped.
    pub(crate) fn mounted(handler: BoxedHandler) -> Self {
        Self { handler: Some(handler), middleware: Collection::default(), mounted: true }
    }

    pub(crate) fn is_mounted(&self) -> bool { self.mounted }
    pub(crate) fn has_handler(&self) -> bool { self.handler.is_some() }

    pub(crate) fn append_middleware(&mut self, middleware: &Collection<BoxedHandler>) {
        self.middleware = self.middleware.merge(middleware);
    }

    pub(crate) fn prepend_middleware(&mut self, middleware: &Collection<BoxedHandler>) {
        self.middleware = middleware.merge(&self.middleware);
    }

    /// `outer` followed by the route's own entries, sorted once and composed
    /// over the handler. `None` when the route has no handler.
    pub(crate) fn handler(&self, outer: &Collection<BoxedHandler>) -> Option<BoxedHandler> {
        self.handler.as_ref()?;
        outer.merge(&self.middleware).sort().compose(self.handler.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::handler::boxed;
    use crate::middleware::Middleware;
    use crate::request::Request;

    fn prefix(body: &'static str, priority: u32) -> Middleware<BoxedHandler> {
        Middleware::new(
            move |next: BoxedHandler| {
                boxed(move |req: Request| {
                    let next = Arc::clone(&next);
                    async move {
                        let mut res = next.call(req).await;
                        res.body_mut().splice(0..0, body.bytes());
                        res
                    }
                })
            },
            priority,
        )
    }

    async fn body_of(handler: BoxedHandler) -> String {
        let res = handler.call(Request::new(Method::GET, "/")).await;
        String::from_utf8(res.body().to_vec()).unwrap_or_default()
    }

    #[tokio::test]
    async fn composes_route_middleware_in_order() {
        let mut route = Route::new(Some(boxed(|_req: Request| async { "4" })));
        route.append_middleware(&Collection::new([prefix("1", 0), prefix("2", 0), prefix("3", 0)]));

        let handler = route.handler(&Collection::default()).expect("route has a handler");
        assert_eq!(body_of(handler).await, "1234");
    }

    #[tokio::test]
    async fn outer_entries_wrap_route_entries() {
        let mut route = Route::new(Some(boxed(|_req: Request| async { "h" })));
        route.append_middleware(&Collection::new([prefix("r", 0)]));
        route.prepend_middleware(&Collection::new([prefix("m", 0)]));

        let outer = Collection::new([prefix("g", 0)]);
        assert_eq!(body_of(route.handler(&outer).expect("handler")).await, "gmrh");
    }

    #[tokio::test]
    async fn priorities_apply_across_levels() {
        let mut route = Route::new(Some(boxed(|_req: Request| async { "h" })));
        route.append_middleware(&Collection::new([prefix("first", 0)]));

        let outer = Collection::new([prefix("last", 9)]);
        assert_eq!(body_of(route.handler(&outer).expect("handler")).await, "firstlasth");
    }

    #[test]
    fn missing_handler_composes_to_none() {
        let mut route = Route::new(None);
        route.append_middleware(&Collection::new([prefix("1", 0)]));
        assert!(route.handler(&Collection::default()).is_none());
    }
}
