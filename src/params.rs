//! Path parameters bound by wildcard segments.

/// One bound wildcard: the name declared in the template and the path
/// segment it matched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Wildcard values bound by a match, in root-to-leaf template order.
///
/// The container is sized to the number of wildcard segments on the matched
/// route, so lookups are a linear scan over a handful of entries.
///
/// ```rust
/// use sprig::{Param, Params};
///
/// let params = Params::from(vec![Param { key: "id".into(), value: "42".into() }]);
/// assert_eq!(params.value("id"), "42");
/// assert_eq!(params.value("missing"), "");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    pub(crate) fn with_slots(slots: usize) -> Self {
        Self(vec![Param::default(); slots])
    }

    pub(crate) fn set(&mut self, slot: usize, key: &str, value: &str) {
        if let Some(param) = self.0.get_mut(slot) {
            param.key.clear();
            param.key.push_str(key);
            param.value.clear();
            param.value.push_str(value);
        }
    }

    /// Value bound to `key`, or `""` if the route declares no such wildcard.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Value bound to `key`, distinguishing "absent" from "empty".
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|p| (p.key.as_str(), p.value.as_str()))
    }
}

impl From<Vec<Param>> for Params {
    fn from(params: Vec<Param>) -> Self {
        Self(params)
    }
}
