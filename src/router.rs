//! Trie-based request router.
//!
//! One trie per HTTP method. Templates are split into `/`-separated
//! segments: literals, `{name}` wildcards and `{name:pattern}` regex
//! wildcards. Middleware is kept per route and composed on every dispatch,
//! so entries registered after a route still apply to it.
//!
//! Dispatch policy, in order:
//!
//! 1. `*` targets skip the trie and go straight to the method checks below.
//! 2. The method's trie resolves the path to a route with a handler: compose
//!    and call it. Opaque mounted handlers see only the path below their
//!    prefix.
//! 3. Another method's trie resolves the path: `OPTIONS` is answered with
//!    `200` and an `Allow` header, anything else goes to the not-allowed
//!    fallback (`405` + `Allow`).
//! 4. `GET`/`HEAD` requests try the file server, if one is configured.
//! 5. The not-found fallback (`404`).
//!
//! Every dispatch runs under a panic guard; a panicking handler or
//! middleware yields `500` for that request only.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use http::{Method, StatusCode};
use tracing::{debug, error, trace, warn};

use crate::files::FileServer;
use crate::handler::{boxed, BoxedHandler, Handler};
use crate::middleware::{Collection, Middleware, Wrapper};
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;
use crate::trie::Tree;

/// Methods an opaque handler is registered for by [`Router::mount_handler`].
const MOUNT_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::TRACE,
];

/// The application router.
///
/// Build it once at startup, then share it (it is `Send + Sync`) with
/// whatever serves requests: [`Server::serve`](crate::Server::serve), or
/// [`Router::dispatch`] directly. Every builder method returns `self` so
/// registrations chain naturally.
///
/// ```rust
/// use sprig::{Method, Request, Response, Router};
///
/// async fn get_user(req: Request) -> Response {
///     Response::text(req.param("id").unwrap_or_default().to_owned())
/// }
/// async fn list_posts(_: Request) -> Response { Response::text("[]") }
///
/// let app = Router::new()
///     .get("/users/{id:[0-9]+}", get_user)
///     .handle(Method::GET, "/users/{id}/posts", list_posts);
/// ```
///
/// # Panics
///
/// Registration methods panic on malformed templates (empty wildcard
/// names, unterminated braces, invalid patterns, two differently named
/// plain wildcards at the same position). These are programming errors in
/// route setup, not runtime conditions.
pub struct Router {
    trees: HashMap<Method, Tree>,
    middleware: Collection<BoxedHandler>,
    not_found: Option<BoxedHandler>,
    not_allowed: Option<BoxedHandler>,
    files: Option<FileServer>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            middleware: Collection::default(),
            not_found: None,
            not_allowed: None,
            files: None,
        }
    }

    /// Register a handler for a method + template pair.
    ///
    /// Registering the same template twice replaces the earlier handler.
    pub fn handle(self, method: Method, template: &str, handler: impl Handler) -> Self {
        self.add(method, template, Route::new(Some(handler.into_boxed_handler())))
    }

    pub fn get(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::GET, template, handler)
    }

    pub fn post(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::POST, template, handler)
    }

    pub fn put(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::PUT, template, handler)
    }

    pub fn delete(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::DELETE, template, handler)
    }

    pub fn patch(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::PATCH, template, handler)
    }

    pub fn head(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::HEAD, template, handler)
    }

    /// An explicit `OPTIONS` route disables the automatic `Allow` answer for
    /// its path.
    pub fn options(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::OPTIONS, template, handler)
    }

    pub fn connect(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::CONNECT, template, handler)
    }

    pub fn trace(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::TRACE, template, handler)
    }

    fn add(mut self, method: Method, template: &str, route: Route) -> Self {
        self.insert_route(method, template, route);
        self
    }

    fn insert_route(&mut self, method: Method, template: &str, route: Route) {
        let tree = self.trees.entry(method.clone()).or_insert_with(Tree::new);
        let id = tree
            .insert(template)
            .unwrap_or_else(|e| panic!("invalid route `{template}`: {e}"));

        let node = tree.node_mut(id);
        if node.route.is_some() {
            debug!(%method, template, "replacing existing route");
        }
        node.mount = route.is_mounted();
        node.route = Some(route);
        debug!(%method, template, "route registered");
    }

    /// Router-global middleware with priority `0`; wraps every dispatch,
    /// fallbacks included.
    pub fn with_middleware(self, wrapper: impl Wrapper<BoxedHandler> + 'static) -> Self {
        self.with_entry(Middleware::new(wrapper, 0))
    }

    /// Router-global middleware with an explicit priority.
    pub fn with_entry(mut self, entry: Middleware<BoxedHandler>) -> Self {
        self.middleware.push(entry);
        self
    }

    /// Middleware with priority `0` for `method`.
    ///
    /// An empty `path` applies it to every route of `method`, present and
    /// future. Otherwise `path` names a registered template prefix and the
    /// middleware is appended to every route currently under it.
    pub fn use_middleware(
        self,
        method: Method,
        path: &str,
        wrapper: impl Wrapper<BoxedHandler> + 'static,
    ) -> Self {
        self.use_entry(method, path, Middleware::new(wrapper, 0))
    }

    /// Like [`use_middleware`](Router::use_middleware) with an explicit priority.
    pub fn use_entry(mut self, method: Method, path: &str, entry: Middleware<BoxedHandler>) -> Self {
        self.apply_entry(method, path, entry);
        self
    }

    fn apply_entry(&mut self, method: Method, path: &str, entry: Middleware<BoxedHandler>) {
        let tree = self.trees.entry(method.clone()).or_insert_with(Tree::new);
        if path.is_empty() {
            tree.middleware.push(entry);
            debug!(%method, "method middleware registered");
            return;
        }

        let found = tree
            .find(path)
            .unwrap_or_else(|e| panic!("invalid middleware path `{path}`: {e}"));
        let Some(prefix) = found else {
            warn!(%method, path, "no routes under middleware path");
            return;
        };

        let entries = Collection::new([entry]);
        let mut applied = 0;
        for id in tree.subtree(prefix) {
            if let Some(route) = tree.node_mut(id).route.as_mut() {
                route.append_middleware(&entries);
                applied += 1;
            }
        }
        debug!(%method, path, routes = applied, "route middleware registered");
    }

    /// Grafts every route of `sub` below `prefix`.
    ///
    /// The sub-router's global and per-method middleware is placed ahead of
    /// each grafted route's own entries, so the composed order is: this
    /// router's globals, `sub`'s globals, middleware added later for the
    /// prefix, the route's own middleware. Keep configuring the grafted
    /// routes with sub-relative templates through [`at`](Router::at), or
    /// with full templates on this router.
    ///
    /// Fallbacks of `sub` are dropped; mount it with
    /// [`mount_handler`](Router::mount_handler) to keep them.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is malformed, or if a plain wildcard of `sub`
    /// lands on a position where this router already has a plain wildcard
    /// under another name. Mounting `/{userId}/posts` at `/users` next to an
    /// existing `/users/{id}` panics; name both `{id}`, or constrain one with
    /// a pattern (`{userId:[0-9]+}`), which makes it a separate child.
    pub fn mount(mut self, prefix: &str, sub: Router) -> Self {
        let Router { trees, middleware, not_found, not_allowed, files } = sub;
        if not_found.is_some() || not_allowed.is_some() || files.is_some() {
            warn!(prefix, "fallbacks of a mounted router are ignored");
        }

        for (method, sub_tree) in trees {
            let outer = middleware.merge(&sub_tree.middleware);
            let tree = self.trees.entry(method.clone()).or_insert_with(Tree::new);
            let at = tree
                .insert(prefix)
                .unwrap_or_else(|e| panic!("invalid mount prefix `{prefix}`: {e}"));
            tree.graft(at, &sub_tree, Tree::ROOT, &outer, prefix)
                .unwrap_or_else(|e| panic!("cannot mount at `{prefix}`: {e}"));
            debug!(%method, prefix, "router mounted");
        }
        self
    }

    /// Mounts an opaque handler at `prefix` for every standard method.
    ///
    /// Requests at or below the prefix reach `handler` with
    /// [`Request::path`] set to the remainder (`/` for the prefix itself).
    /// Passing a [`Router`] here keeps it whole, fallbacks included.
    pub fn mount_handler(mut self, prefix: &str, handler: impl Handler) -> Self {
        let handler = handler.into_boxed_handler();
        for method in MOUNT_METHODS {
            self.insert_route(method, prefix, Route::mounted(Arc::clone(&handler)));
        }
        self
    }

    /// A handle that registers routes and middleware below `prefix`, with
    /// templates relative to it.
    ///
    /// ```rust
    /// use sprig::{Method, Request, Router};
    ///
    /// let users = Router::new().get("/{id}", |_req: Request| async { "user" });
    /// let mut app = Router::new().mount("/users", users);
    ///
    /// app.at("/users")
    ///     .get("/{id}/posts", |_req: Request| async { "posts" })
    ///     .use_middleware(Method::GET, "/{id}", sprig::middleware::trace);
    /// ```
    pub fn at(&mut self, prefix: &str) -> Scope<'_> {
        Scope { router: self, prefix: prefix.trim_end_matches('/').to_owned() }
    }

    /// Replaces the default `404` response.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Replaces the default `405` response. The `Allow` header is added to
    /// whatever the handler returns unless it sets one itself.
    pub fn not_allowed(mut self, handler: impl Handler) -> Self {
        self.not_allowed = Some(handler.into_boxed_handler());
        self
    }

    /// Serves files under `root` for `GET`/`HEAD` requests no route matched.
    /// With `listing`, directories without an `index.html` are listed.
    ///
    /// # Panics
    ///
    /// Panics if `root` is empty.
    pub fn serve_files(mut self, root: impl Into<PathBuf>, listing: bool) -> Self {
        let root = root.into();
        assert!(!root.as_os_str().is_empty(), "serve_files requires a non-empty root directory");
        debug!(root = %root.display(), listing, "file server registered");
        self.files = Some(FileServer::new(root, listing));
        self
    }

    /// Every registered `(method, template)` pair, sorted by template.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<_> = self.trees.iter()
            .flat_map(|(method, tree)| {
                tree.templates().into_iter().map(move |t| (method.clone(), t))
            })
            .collect();
        routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Boxes the router so it can be stored or mounted as a plain handler.
    pub fn into_handler(self) -> BoxedHandler {
        boxed(self)
    }

    /// Routes one request and produces one response.
    ///
    /// Never fails: misses become `404`/`405`, panics become `500`.
    pub async fn dispatch(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.path().to_owned();

        match AssertUnwindSafe(self.route(req)).catch_unwind().await {
            Ok(res) => res,
            Err(panic) => {
                error!(%method, %path, panic = panic_message(panic.as_ref()), "request handler panicked");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    async fn route(&self, mut req: Request) -> Response {
        let path = req.path().to_owned();

        if path != "*" {
            if let Some(tree) = self.trees.get(req.method()) {
                if let Some(found) = tree.lookup(&path) {
                    let route = tree.node(found.node).route.as_ref();
                    let outer = self.middleware.merge(&tree.middleware);
                    if let Some(handler) = route.and_then(|r| r.handler(&outer)) {
                        trace!(
                            method = %req.method(),
                            %path,
                            template = %tree.template_of(found.node),
                            "route matched"
                        );
                        if route.is_some_and(Route::is_mounted) {
                            req.set_path(format!("/{}", found.rest));
                        }
                        req.extensions_mut().insert(found.params);
                        return handler.call(req).await;
                    }
                }
            }
        }

        let allowed = self.allowed(req.method(), &path);
        if !allowed.is_empty() {
            if *req.method() == Method::OPTIONS {
                return options_response(allowed);
            }
            return self.reject_method(req, &allowed.join(", ")).await;
        }

        if let Some(files) = &self.files {
            if *req.method() == Method::GET || *req.method() == Method::HEAD {
                if let Some(res) = files.serve(&path).await {
                    return res;
                }
            }
        }

        self.fallback(self.not_found.as_ref(), req, StatusCode::NOT_FOUND).await
    }

    /// Methods other than `method` under which `path` resolves, sorted.
    /// For `*`, every method with at least one route.
    fn allowed(&self, method: &Method, path: &str) -> Vec<&str> {
        let mut allowed: Vec<&str> = self.trees.iter()
            .filter(|&(m, tree)| {
                if path == "*" { tree.has_routes() } else { m != method && tree.resolves(path) }
            })
            .map(|(m, _)| m.as_str())
            .collect();
        allowed.sort_unstable();
        allowed
    }

    async fn reject_method(&self, req: Request, allow: &str) -> Response {
        let mut res = self
            .fallback(self.not_allowed.as_ref(), req, StatusCode::METHOD_NOT_ALLOWED)
            .await;
        if res.header("allow").is_none() {
            res.set_header("allow", allow);
        }
        res
    }

    /// Runs `custom` (or a bare `status` response) under the router-global
    /// middleware.
    async fn fallback(&self, custom: Option<&BoxedHandler>, req: Request, status: StatusCode) -> Response {
        trace!(method = %req.method(), path = req.path(), status = status.as_u16(), "no route");
        let terminal = custom
            .cloned()
            .unwrap_or_else(|| boxed(move |_req: Request| async move { status }));
        match self.middleware.sort().compose(Some(terminal)) {
            Some(handler) => handler.call(req).await,
            None => Response::status(status),
        }
    }
}

/// Registration below a fixed prefix of a [`Router`]; see [`Router::at`].
///
/// Templates given to a scope are joined onto its prefix, so a mounted
/// sub-router can keep being configured in its own terms after the mount.
pub struct Scope<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl Scope<'_> {
    pub fn handle(self, method: Method, template: &str, handler: impl Handler) -> Self {
        let template = self.template(template);
        self.router.insert_route(method, &template, Route::new(Some(handler.into_boxed_handler())));
        self
    }

    pub fn get(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::GET, template, handler)
    }

    pub fn post(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::POST, template, handler)
    }

    pub fn put(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::PUT, template, handler)
    }

    pub fn delete(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::DELETE, template, handler)
    }

    pub fn patch(self, template: &str, handler: impl Handler) -> Self {
        self.handle(Method::PATCH, template, handler)
    }

    /// Appends middleware to every route of `method` currently under
    /// `path`, relative to the scope. An empty `path` means the scope's
    /// whole subtree.
    pub fn use_middleware(
        self,
        method: Method,
        path: &str,
        wrapper: impl Wrapper<BoxedHandler> + 'static,
    ) -> Self {
        self.use_entry(method, path, Middleware::new(wrapper, 0))
    }

    pub fn use_entry(self, method: Method, path: &str, entry: Middleware<BoxedHandler>) -> Self {
        let path = self.template(path);
        self.router.apply_entry(method, &path, entry);
        self
    }

    fn template(&self, path: &str) -> String {
        format!("{}/{}", self.prefix, path.trim_start_matches('/'))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn options_response(mut allowed: Vec<&str>) -> Response {
    allowed.push(Method::OPTIONS.as_str());
    allowed.sort_unstable();
    allowed.dedup();
    Response::builder().header("allow", &allowed.join(", ")).no_body()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic.downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
