//! Middleware layer.
//!
//! A middleware is a [`Wrapper`]: a function from the handler it wraps to
//! the handler that should run instead. Each registered wrapper becomes a
//! [`Middleware`] entry with a priority, and entries are kept in a
//! [`Collection`].
//!
//! Ordering rules:
//!
//! - the first entry of a collection is the outermost wrapper, so it runs
//!   first at request time;
//! - [`Collection::sort`] orders by ascending priority and keeps
//!   registration order among equal priorities;
//! - [`Collection::merge`] concatenates without re-sorting.
//!
//! The router merges its global, per-method and per-route collections in
//! that order, sorts the result once and composes it over the route's
//! handler on every dispatch.
//!
//! Built-in middleware:
//! - [`trace`]: a per-request span carrying method, path, status and latency

mod trace;

pub use trace::trace;

use std::fmt;
use std::sync::Arc;

/// Wraps a handler of type `H` into another `H`.
///
/// Implemented for every `Fn(H) -> H`. Called once per composition, not
/// once per request.
pub trait Wrapper<H>: Send + Sync {
    fn wrap(&self, next: H) -> H;
}

impl<H, F> Wrapper<H> for F
where
    F: Fn(H) -> H + Send + Sync,
{
    fn wrap(&self, next: H) -> H {
        self(next)
    }
}

/// A wrapper together with its priority. Lower priorities run earlier.
pub struct Middleware<H> {
    wrapper: Arc<dyn Wrapper<H>>,
    priority: u32,
}

impl<H> Middleware<H> {
    pub fn new(wrapper: impl Wrapper<H> + 'static, priority: u32) -> Self {
        Self { wrapper: Arc::new(wrapper), priority }
    }

    pub fn priority(&self) -> u32 { self.priority }

    pub fn wrap(&self, next: H) -> H {
        self.wrapper.wrap(next)
    }
}

impl<H> Clone for Middleware<H> {
    fn clone(&self) -> Self {
        Self { wrapper: Arc::clone(&self.wrapper), priority: self.priority }
    }
}

impl<H> fmt::Debug for Middleware<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").field("priority", &self.priority).finish_non_exhaustive()
    }
}

/// An ordered list of [`Middleware`] entries.
pub struct Collection<H>(Vec<Middleware<H>>);

impl<H> Collection<H> {
    /// Keeps `entries` in the given order; duplicate priorities are fine.
    pub fn new(entries: impl IntoIterator<Item = Middleware<H>>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn push(&mut self, entry: Middleware<H>) {
        self.0.push(entry);
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Middleware<H>> {
        self.0.iter()
    }

    /// A copy ordered by ascending priority. The sort is stable.
    pub fn sort(&self) -> Self {
        let mut entries = self.0.clone();
        entries.sort_by_key(Middleware::priority);
        Self(entries)
    }

    /// This collection's entries followed by `other`'s, unsorted.
    pub fn merge(&self, other: &Self) -> Self {
        Self(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// Folds the entries over `terminal`, last entry innermost.
    ///
    /// `None` stays `None`: there is nothing to wrap, and callers treat a
    /// missing handler as "no route" rather than "run nothing".
    pub fn compose(&self, terminal: Option<H>) -> Option<H> {
        let terminal = terminal?;
        Some(self.0.iter().rev().fold(terminal, |next, entry| entry.wrap(next)))
    }
}

impl<H> Default for Collection<H> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<H> Clone for Collection<H> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<H> fmt::Debug for Collection<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(Middleware::priority)).finish()
    }
}

impl<H> FromIterator<Middleware<H>> for Collection<H> {
    fn from_iter<I: IntoIterator<Item = Middleware<H>>>(iter: I) -> Self {
        Self::new(iter)
    }
}
