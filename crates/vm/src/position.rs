//! Offset to line/column translation.
//!
//! Queries usually move forward through the input, so the cache remembers
//! the last answer and scans on from there. A query for an earlier offset
//! starts over from the beginning.

/// A 1-based line and column for a char offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Incremental line/column cursor over one input.
#[derive(Debug, Clone)]
pub struct PositionCache {
    cursor: Location,
    seen_cr: bool,
}

impl Default for PositionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionCache {
    pub fn new() -> Self {
        Self {
            cursor: Location {
                offset: 0,
                line: 1,
                column: 1,
            },
            seen_cr: false,
        }
    }

    /// Location of `offset` in `input`. Offsets past the end are clamped.
    pub fn locate(&mut self, input: &[char], offset: usize) -> Location {
        let offset = offset.min(input.len());
        if offset < self.cursor.offset {
            *self = Self::new();
        }
        for &ch in &input[self.cursor.offset..offset] {
            self.advance(ch);
        }
        self.cursor.offset = offset;
        self.cursor
    }

    fn advance(&mut self, ch: char) {
        match ch {
            '\n' => {
                if !self.seen_cr {
                    self.cursor.line += 1;
                }
                self.cursor.column = 1;
                self.seen_cr = false;
            }
            '\r' => {
                self.cursor.line += 1;
                self.cursor.column = 1;
                self.seen_cr = true;
            }
            '\u{2028}' | '\u{2029}' => {
                self.cursor.line += 1;
                self.cursor.column = 1;
                self.seen_cr = false;
            }
            _ => {
                self.cursor.column += 1;
                self.seen_cr = false;
            }
        }
    }
}
