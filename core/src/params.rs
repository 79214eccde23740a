//! Request parameter set: the unit every other component operates on.
//!
//! Keys are case-sensitive and unique; inserting an existing key overwrites
//! the previous value. Storage order carries no meaning — the byte-ordered
//! view required at signing time comes from [`Params::to_ordered_pairs`].

use std::collections::BTreeMap;

/// An owned name → value mapping for one request.
///
/// Created empty per request, filled by the builder and caller code, consumed
/// once by the signer and transport, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: BTreeMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, overwriting any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove a parameter; absent names are a no-op.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs sorted ascending by parameter name, byte order. Ties cannot
    /// occur since names are unique.
    pub fn to_ordered_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
