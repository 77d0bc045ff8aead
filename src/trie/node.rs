//! Trie nodes and template segment parsing.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::Error;
use crate::route::Route;

/// Index of a node in its [`Tree`](super::Tree) arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// One segment of a path template, as written at registration.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Wildcard(&'a str),
    Regex { name: &'a str, pattern: &'a str },
}

impl<'a> Segment<'a> {
    /// Parses `literal`, `{name}` or `{name:pattern}`.
    pub(crate) fn parse(segment: &'a str, template: &str) -> Result<Self, Error> {
        let Some(inner) = segment.strip_prefix('{') else {
            return Ok(Self::Literal(segment));
        };
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| Error::template(template, "unterminated wildcard"))?;

        let parsed = match inner.split_once(':') {
            Some((_, "")) => return Err(Error::template(template, "empty wildcard pattern")),
            Some((name, pattern)) => Self::Regex { name, pattern },
            None => Self::Wildcard(inner),
        };
        if parsed.name().is_empty() {
            return Err(Error::template(template, "empty wildcard name"));
        }
        Ok(parsed)
    }

    pub(crate) fn name(&self) -> &'a str {
        match *self {
            Self::Literal(name) | Self::Wildcard(name) | Self::Regex { name, .. } => name,
        }
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(key) => f.write_str(key),
            Self::Wildcard(name) => write!(f, "{{{name}}}"),
            Self::Regex { name, pattern } => write!(f, "{{{name}:{pattern}}}"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Kind {
    Literal,
    Wildcard,
    /// `pattern` is the source as written; `regex` is anchored to the whole
    /// segment.
    Regex { pattern: String, regex: Regex },
}

impl Kind {
    pub(crate) fn compile(pattern: &str, template: &str) -> Result<Self, Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|source| Error::Pattern { template: template.to_owned(), source })?;
        Ok(Self::Regex { pattern: pattern.to_owned(), regex })
    }
}

/// Children of one node, split by matching precedence.
#[derive(Clone, Debug, Default)]
pub(crate) struct Children {
    pub(crate) literals: HashMap<String, NodeId>,
    /// Registration order; the first pattern that matches wins.
    pub(crate) regexps: Vec<NodeId>,
    pub(crate) wildcard: Option<NodeId>,
}

impl Children {
    pub(crate) fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.regexps.is_empty() && self.wildcard.is_none()
    }

    /// Every child, literals first. Literal order is unspecified.
    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.literals.values().copied()
            .chain(self.regexps.iter().copied())
            .chain(self.wildcard)
    }
}

#[derive(Clone)]
pub(crate) struct Node {
    /// Literal text, or the wildcard's name.
    pub(crate) key: String,
    pub(crate) kind: Kind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Children,
    pub(crate) route: Option<Route>,
    /// Wildcard segments from the root down to this node, inclusive.
    pub(crate) slots: usize,
    /// Grafted opaque handler boundary: matching may stop here and hand the
    /// rest of the path to the mounted handler.
    pub(crate) mount: bool,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self {
            key: String::new(),
            kind: Kind::Literal,
            parent: None,
            children: Children::default(),
            route: None,
            slots: 0,
            mount: false,
        }
    }

    pub(crate) fn child_of(parent: NodeId, parent_slots: usize, key: &str, kind: Kind) -> Self {
        let slots = match kind {
            Kind::Literal => parent_slots,
            Kind::Wildcard | Kind::Regex { .. } => parent_slots + 1,
        };
        Self {
            key: key.to_owned(),
            kind,
            parent: Some(parent),
            children: Children::default(),
            route: None,
            slots,
            mount: false,
        }
    }

    pub(crate) fn is_wildcard(&self) -> bool {
        !matches!(self.kind, Kind::Literal)
    }

    pub(crate) fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The template segment this node was created from.
    pub(crate) fn segment(&self) -> Segment<'_> {
        match &self.kind {
            Kind::Literal => Segment::Literal(&self.key),
            Kind::Wildcard => Segment::Wildcard(&self.key),
            Kind::Regex { pattern, .. } => Segment::Regex { name: &self.key, pattern },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_segment_kinds() {
        assert_eq!(Segment::parse("users", "/users").ok(), Some(Segment::Literal("users")));
        assert_eq!(Segment::parse("{id}", "/{id}").ok(), Some(Segment::Wildcard("id")));
        assert_eq!(
            Segment::parse(r"{id:\d+}", "/{id}").ok(),
            Some(Segment::Regex { name: "id", pattern: r"\d+" }),
        );
    }

    #[test]
    fn pattern_may_contain_colons_and_braces() {
        assert_eq!(
            Segment::parse(r"{t:\d{2}:\d{2}}", "/").ok(),
            Some(Segment::Regex { name: "t", pattern: r"\d{2}:\d{2}" }),
        );
    }

    #[test]
    fn rejects_malformed_wildcards() {
        for segment in ["{}", "{:x}", "{name", "{name:}"] {
            assert!(
                matches!(Segment::parse(segment, "/t"), Err(Error::Template { .. })),
                "`{segment}` should be rejected",
            );
        }
    }

    #[test]
    fn rejects_invalid_pattern() {
        assert!(matches!(Kind::compile("(", "/{x:(}"), Err(Error::Pattern { .. })));
    }

    #[test]
    fn regex_is_anchored() {
        let Ok(Kind::Regex { regex, .. }) = Kind::compile("en|pl", "/") else {
            panic!("pattern should compile");
        };
        assert!(regex.is_match("en"));
        assert!(regex.is_match("pl"));
        assert!(!regex.is_match("english"));
        assert!(!regex.is_match("xpl"));
    }

    #[test]
    fn slot_count_grows_per_wildcard() {
        let root = Node::root();
        let literal = Node::child_of(NodeId(0), root.slots, "blog", Kind::Literal);
        let wildcard = Node::child_of(NodeId(1), literal.slots, "id", Kind::Wildcard);
        assert_eq!((root.slots, literal.slots, wildcard.slots), (0, 0, 1));
        assert!(root.is_root() && root.is_leaf());
        assert!(wildcard.is_wildcard() && !wildcard.is_root());
    }
}
