//! Per-method routing trie.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to each other by
//! [`NodeId`]. Children are owned through their parent's child table; the
//! parent link is a plain index used to climb back to the root. The tree
//! only ever grows.
//!
//! Matching consumes one `/`-separated segment per level with a fixed
//! precedence: literal child, then regex children in registration order,
//! then the single plain wildcard. Once a child is chosen there is no
//! backtracking to its siblings.

mod node;

pub(crate) use node::{Kind, Node, NodeId, Segment};

use std::borrow::Cow;

use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::middleware::Collection;
use crate::params::Params;
use crate::route::Route;

/// Result of walking a path: the terminal node, the bound wildcards and the
/// part of the path left unconsumed below a mount boundary.
#[derive(Debug)]
pub(crate) struct Match<'p> {
    pub(crate) node: NodeId,
    pub(crate) params: Params,
    pub(crate) rest: &'p str,
}

#[derive(Clone)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
    /// Wraps every route of this tree, inside the router-global entries.
    pub(crate) middleware: Collection<BoxedHandler>,
}

/// Non-empty `/`-separated segments of a template.
fn segments(template: &str) -> impl Iterator<Item = &str> {
    template.split('/').filter(|s| !s.is_empty())
}

impl Tree {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn new() -> Self {
        Self { nodes: vec![Node::root()], middleware: Collection::default() }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Walks `template` from the root, creating missing nodes, and returns
    /// the terminal node.
    pub(crate) fn insert(&mut self, template: &str) -> Result<NodeId, Error> {
        self.add_child(Self::ROOT, template, template)
    }

    /// Walks `path` (template syntax) below `parent`, creating missing nodes.
    pub(crate) fn add_child(&mut self, parent: NodeId, path: &str, template: &str) -> Result<NodeId, Error> {
        segments(path).try_fold(parent, |id, segment| {
            let segment = Segment::parse(segment, template)?;
            self.child_for(id, &segment, template)
        })
    }

    /// Terminal node of `template` if every segment already exists.
    pub(crate) fn find(&self, template: &str) -> Result<Option<NodeId>, Error> {
        let mut id = Self::ROOT;
        for segment in segments(template) {
            let segment = Segment::parse(segment, template)?;
            match self.existing_child(id, &segment) {
                Some(child) => id = child,
                None => return Ok(None),
            }
        }
        Ok(Some(id))
    }

    fn existing_child(&self, id: NodeId, segment: &Segment<'_>) -> Option<NodeId> {
        let children = &self.node(id).children;
        match *segment {
            Segment::Literal(key) => children.literals.get(key).copied(),
            Segment::Wildcard(name) => children.wildcard.filter(|&c| self.node(c).key == name),
            Segment::Regex { .. } => children.regexps.iter()
                .copied()
                .find(|&c| self.node(c).segment() == *segment),
        }
    }

    fn child_for(&mut self, parent: NodeId, segment: &Segment<'_>, template: &str) -> Result<NodeId, Error> {
        if let Some(id) = self.existing_child(parent, segment) {
            return Ok(id);
        }

        let kind = match *segment {
            Segment::Literal(_) => Kind::Literal,
            Segment::Wildcard(_) if self.node(parent).children.wildcard.is_some() => {
                return Err(Error::template(template, "conflicts with a differently named wildcard"));
            }
            Segment::Wildcard(_) => Kind::Wildcard,
            Segment::Regex { pattern, .. } => Kind::compile(pattern, template)?,
        };

        let id = NodeId(self.nodes.len());
        let parent_slots = self.node(parent).slots;
        self.nodes.push(Node::child_of(parent, parent_slots, segment.name(), kind));

        let children = &mut self.node_mut(parent).children;
        match *segment {
            Segment::Literal(key) => {
                children.literals.insert(key.to_owned(), id);
            }
            Segment::Wildcard(_) => children.wildcard = Some(id),
            Segment::Regex { .. } => children.regexps.push(id),
        }
        Ok(id)
    }

    /// Picks the child matching the first segment of `path`.
    ///
    /// Returns the child, the percent-decoded segment it matched and the raw
    /// remainder after that segment. Decoding happens after the split, so an
    /// encoded `/` stays inside its segment. A segment that does not decode
    /// to UTF-8 is matched as written.
    fn child_by_path<'p>(&self, id: NodeId, path: &'p str) -> Option<(NodeId, Cow<'p, str>, &'p str)> {
        let (raw, rest) = path.split_once('/').unwrap_or((path, ""));
        if raw.is_empty() {
            return None;
        }
        let segment = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));

        let children = &self.node(id).children;
        let child = children.literals.get(&*segment).copied()
            .or_else(|| {
                children.regexps.iter().copied().find(|&c| match &self.node(c).kind {
                    Kind::Regex { regex, .. } => regex.is_match(&segment),
                    Kind::Literal | Kind::Wildcard => false,
                })
            })
            .or(children.wildcard)?;
        Some((child, segment, rest))
    }

    /// Matches a request path against the tree.
    ///
    /// `rest` stays percent-encoded so a mounted handler can decode it
    /// again on its own.
    pub(crate) fn lookup<'p>(&self, path: &'p str) -> Option<Match<'p>> {
        self.descend(Self::ROOT, path)
    }

    fn descend<'p>(&self, id: NodeId, path: &'p str) -> Option<Match<'p>> {
        let path = path.trim_start_matches('/');
        let node = self.node(id);
        if path.is_empty() {
            return Some(Match { node: id, params: Params::with_slots(node.slots), rest: "" });
        }

        let found = self.child_by_path(id, path).and_then(|(child_id, segment, rest)| {
            let mut found = self.descend(child_id, rest)?;
            let child = self.node(child_id);
            if child.is_wildcard() {
                found.params.set(child.slots - 1, &child.key, &segment);
            }
            Some(found)
        });

        // A mount boundary claims everything below it that has no handler
        // of its own, including intermediate nodes of nested routes.
        match found {
            Some(found) if !node.mount || self.has_handler(found.node) => Some(found),
            _ if node.mount => {
                Some(Match { node: id, params: Params::with_slots(node.slots), rest: path })
            }
            _ => None,
        }
    }

    fn has_handler(&self, id: NodeId) -> bool {
        self.node(id).route.as_ref().is_some_and(Route::has_handler)
    }

    /// Whether `path` resolves to a route with a handler.
    pub(crate) fn resolves(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(|found| self.has_handler(found.node))
    }

    pub(crate) fn has_routes(&self) -> bool {
        self.nodes.iter().any(|n| n.route.as_ref().is_some_and(Route::has_handler))
    }

    /// `id` and every node below it.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut stack = vec![id];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.ids());
        }
        out
    }

    /// Rebuilds the template that leads to `id` by climbing parent links.
    pub(crate) fn template_of(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut node = self.node(id);
        while let Some(parent) = node.parent {
            parts.push(node.segment().to_string());
            node = self.node(parent);
        }
        debug_assert!(node.is_root());
        parts.reverse();
        format!("/{}", parts.join("/"))
    }

    /// Templates of every route with a handler, in node creation order.
    pub(crate) fn templates(&self) -> Vec<String> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| self.has_handler(id))
            .map(|id| self.template_of(id))
            .collect()
    }

    /// Copies the subtree of `other` rooted at `from` onto `at`.
    ///
    /// Routes are cloned with `outer` placed ahead of their own middleware;
    /// a route already present on a target node is replaced.
    pub(crate) fn graft(
        &mut self,
        at: NodeId,
        other: &Self,
        from: NodeId,
        outer: &Collection<BoxedHandler>,
        template: &str,
    ) -> Result<(), Error> {
        let source = other.node(from);
        if let Some(route) = &source.route {
            let mut route = route.clone();
            route.prepend_middleware(outer);
            let target = self.node_mut(at);
            target.route = Some(route);
            target.mount = source.mount;
        }
        if source.is_leaf() {
            return Ok(());
        }

        for child in source.children.ids() {
            let target = self.child_for(at, &other.node(child).segment(), template)?;
            self.graft(target, other, child, outer, template)?;
        }
        Ok(())
    }
}
