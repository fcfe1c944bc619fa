//! The constant table: literal strings, class matchers and expectation
//! descriptors referenced by index from bytecode operands.
//!
//! Entries are deduplicated by value. The first insertion of a value fixes
//! its index for the lifetime of the table.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexSet;

/// A compiled character class.
///
/// `ranges` holds inclusive `(begin, end)` pairs; single characters are
/// stored as `(c, c)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassMatcher {
    pub ranges: Vec<(char, char)>,
    pub inverted: bool,
    pub ignore_case: bool,
}

impl ClassMatcher {
    /// Test one input character against the class.
    pub fn matches(&self, ch: char) -> bool {
        let hit = if self.ignore_case {
            case_variants(ch).any(|c| self.in_ranges(c))
        } else {
            self.in_ranges(ch)
        };
        hit != self.inverted
    }

    fn in_ranges(&self, ch: char) -> bool {
        self.ranges.iter().any(|&(begin, end)| begin <= ch && ch <= end)
    }
}

/// The character itself plus its single-character lower/upper forms.
fn case_variants(ch: char) -> impl Iterator<Item = char> {
    std::iter::once(ch)
        .chain(single(ch.to_lowercase()))
        .chain(single(ch.to_uppercase()))
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

/// What kind of thing the parser expected when a match failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpectationKind {
    Literal,
    Class,
    Any,
    Other,
    End,
}

impl ExpectationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpectationKind::Literal => "literal",
            ExpectationKind::Class => "class",
            ExpectationKind::Any => "any",
            ExpectationKind::Other => "other",
            ExpectationKind::End => "end",
        }
    }
}

impl fmt::Display for ExpectationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a syntax error's expected set.
///
/// Ordered by description first, which is the order diagnostics list them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expectation {
    pub kind: ExpectationKind,
    pub value: Option<String>,
    pub description: String,
}

impl Expectation {
    /// A literal string. The description is the quoted literal.
    pub fn literal(value: &str) -> Self {
        Self {
            kind: ExpectationKind::Literal,
            value: Some(value.to_string()),
            description: quote(value),
        }
    }

    /// A character class, described by its source text such as `[0-9]`.
    pub fn class(raw: &str) -> Self {
        Self {
            kind: ExpectationKind::Class,
            value: Some(raw.to_string()),
            description: raw.to_string(),
        }
    }

    pub fn any() -> Self {
        Self {
            kind: ExpectationKind::Any,
            value: None,
            description: "any character".to_string(),
        }
    }

    /// A named rule or a host-reported expectation.
    pub fn other(description: &str) -> Self {
        Self {
            kind: ExpectationKind::Other,
            value: None,
            description: description.to_string(),
        }
    }

    pub fn end() -> Self {
        Self {
            kind: ExpectationKind::End,
            value: None,
            description: "end of input".to_string(),
        }
    }
}

impl Ord for Expectation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.description
            .cmp(&other.description)
            .then(self.kind.cmp(&other.kind))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Expectation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Quote a string with double quotes, escaping control characters.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    out.push_str(&escape(s));
    out.push('"');
    out
}

/// Escape backslash, double quote and control characters.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || ('\u{7f}'..='\u{9f}').contains(&c) => {
                out.push_str(&format!("\\x{:02X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

/// One constant table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// A literal string, lower-cased when used by `MATCH_STRING_IC`.
    Literal(String),
    Class(ClassMatcher),
    Expectation(Expectation),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Literal(s) => write!(f, "literal {}", quote(s)),
            Constant::Class(c) => {
                f.write_str("class [")?;
                if c.inverted {
                    f.write_str("^")?;
                }
                for &(begin, end) in &c.ranges {
                    if begin == end {
                        write!(f, "{}", escape(&begin.to_string()))?;
                    } else {
                        write!(
                            f,
                            "{}-{}",
                            escape(&begin.to_string()),
                            escape(&end.to_string())
                        )?;
                    }
                }
                f.write_str("]")?;
                if c.ignore_case {
                    f.write_str("i")?;
                }
                Ok(())
            }
            Constant::Expectation(e) => match &e.value {
                Some(v) => write!(f, "expect {} {} {}", e.kind, quote(v), quote(&e.description)),
                None => write!(f, "expect {} {}", e.kind, quote(&e.description)),
            },
        }
    }
}

/// Ordered, deduplicated constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantTable {
    entries: IndexSet<Constant>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constant, returning the index of the existing entry when an
    /// equal one is already present.
    pub fn add(&mut self, constant: Constant) -> usize {
        self.entries.insert_full(constant).0
    }

    pub fn get(&self, index: usize) -> Option<&Constant> {
        self.entries.get_index(index)
    }

    pub fn literal(&self, index: usize) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Literal(s)) => Some(s),
            _ => None,
        }
    }

    pub fn class(&self, index: usize) -> Option<&ClassMatcher> {
        match self.get(index) {
            Some(Constant::Class(c)) => Some(c),
            _ => None,
        }
    }

    pub fn expectation(&self, index: usize) -> Option<&Expectation> {
        match self.get(index) {
            Some(Constant::Expectation(e)) => Some(e),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter()
    }
}
