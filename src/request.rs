//! Incoming HTTP request type.

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

use crate::params::Params;

/// An incoming HTTP request with its body fully buffered.
///
/// The router attaches the [`Params`] of the matched route to the request's
/// extensions before calling the handler. Mounted opaque handlers see
/// [`path`](Request::path) rewritten to the part below their mount prefix;
/// [`uri`](Request::uri) always keeps the original target.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) extensions: Extensions,
}

impl Request {
    /// A body-less request for `method` and `target`, handy for tests and
    /// in-process dispatch.
    ///
    /// # Panics
    ///
    /// Panics if `target` is not a valid request target (`/path?query`,
    /// `*` or an absolute URI).
    pub fn new(method: Method, target: &str) -> Self {
        let uri: Uri = target
            .parse()
            .unwrap_or_else(|e| panic!("invalid request target `{target}`: {e}"));
        let path = uri.path().to_owned();
        Self {
            method,
            uri,
            path,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            extensions: Extensions::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let path = parts.uri.path().to_owned();
        Self {
            method: parts.method,
            uri: parts.uri,
            path,
            headers: parts.headers,
            body,
            extensions: parts.extensions,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parameters bound by the matched route.
    ///
    /// `None` means the request did not come through a trie match (a
    /// fallback handler, for instance). That is not an error.
    pub fn params(&self) -> Option<&Params> {
        self.extensions.get::<Params>()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params()?.get(key)
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}
