//! The action table: host code fragments and the labels bound for each.

use std::fmt;

use indexmap::IndexSet;

/// One action or semantic predicate.
///
/// Two entries with the same code but different `params` are distinct: the
/// host binds arguments by these names, in this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionEntry {
    pub code: String,
    pub params: Vec<String>,
}

impl ActionEntry {
    pub fn new(code: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            code: code.into(),
            params,
        }
    }
}

impl fmt::Display for ActionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {{{}}}", self.params.join(", "), self.code)
    }
}

/// Ordered, deduplicated action entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionTable {
    entries: IndexSet<ActionEntry>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the index of an identical existing one.
    pub fn add(&mut self, entry: ActionEntry) -> usize {
        self.entries.insert_full(entry).0
    }

    pub fn get(&self, index: usize) -> Option<&ActionEntry> {
        self.entries.get_index(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter()
    }
}
