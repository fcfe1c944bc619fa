//! Furthest-failure accumulator.

use std::collections::BTreeSet;

use pegcode_common::Expectation;

/// Expectations recorded at the furthest position any match attempt failed.
///
/// Earlier failures are ignored, a further failure replaces the set, and
/// failures at the same position add to it. The set is ordered by
/// description and holds no duplicates.
#[derive(Debug, Clone, Default)]
pub struct FurthestFailure {
    pos: usize,
    expected: BTreeSet<Expectation>,
}

impl FurthestFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pos: usize, expectation: &Expectation) {
        if pos < self.pos {
            return;
        }
        if pos > self.pos {
            self.pos = pos;
            self.expected.clear();
        }
        self.expected.insert(expectation.clone());
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn expected(&self) -> impl Iterator<Item = &Expectation> {
        self.expected.iter()
    }

    pub fn into_expected(self) -> Vec<Expectation> {
        self.expected.into_iter().collect()
    }
}
