//! Grammar AST model.

use pegcode_common::GrammarError;

/// A complete grammar: an optional initializer plus rules in declaration
/// order. The first rule is the default start rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Host code run once per parse before the start rule.
    pub initializer: Option<String>,
    pub rules: Vec<Rule>,
}

impl Grammar {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            initializer: None,
            rules,
        }
    }

    pub fn with_initializer(mut self, code: impl Into<String>) -> Self {
        self.initializer = Some(code.into());
        self
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }
}

/// A named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// A rule with a display name has an [`Expr::Named`] at its root.
    pub expression: Expr,
    /// Reserved for result memoization. Not used by the compiler.
    pub cache: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, expression: Expr) -> Self {
        Self {
            name: name.into(),
            expression,
            cache: false,
        }
    }

    /// A rule reported in diagnostics as `display_name` instead of by the
    /// expectations of its body.
    pub fn named(name: impl Into<String>, display_name: impl Into<String>, expression: Expr) -> Self {
        Self::new(
            name,
            Expr::Named {
                name: display_name.into(),
                expr: Box::new(expression),
            },
        )
    }

    pub fn display_name(&self) -> Option<&str> {
        match &self.expression {
            Expr::Named { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One node of a rule's expression tree.
///
/// Trees never contain cycles; recursion goes through [`Expr::RuleRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Ordered alternatives. The first that succeeds wins.
    Choice(Vec<Expr>),
    /// All elements in order, or nothing.
    Sequence(Vec<Expr>),
    Labeled { label: String, expr: Box<Expr> },
    /// Host code run on success of `expr`, with visible labels as parameters.
    Action { code: String, expr: Box<Expr> },
    Named { name: String, expr: Box<Expr> },
    /// The matched input slice instead of the structured result.
    Text(Box<Expr>),
    SimpleAnd(Box<Expr>),
    SimpleNot(Box<Expr>),
    SemanticAnd(String),
    SemanticNot(String),
    Optional(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    /// Bounded repetition. An absent `min` means zero, an absent `max` means
    /// unbounded. `min > max` is legal and never matches.
    Range {
        min: Option<u32>,
        max: Option<u32>,
        delimiter: Option<Box<Expr>>,
        expr: Box<Expr>,
    },
    Literal { value: String, ignore_case: bool },
    Class(CharClass),
    Any,
    RuleRef(String),
}

impl Expr {
    /// Direct children, in evaluation order. A range's element comes before
    /// its delimiter.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Choice(items) | Expr::Sequence(items) => items.iter().collect(),
            Expr::Labeled { expr, .. }
            | Expr::Action { expr, .. }
            | Expr::Named { expr, .. }
            | Expr::Text(expr)
            | Expr::SimpleAnd(expr)
            | Expr::SimpleNot(expr)
            | Expr::Optional(expr)
            | Expr::ZeroOrMore(expr)
            | Expr::OneOrMore(expr) => vec![expr.as_ref()],
            Expr::Range {
                expr, delimiter, ..
            } => {
                let mut out = vec![expr.as_ref()];
                if let Some(d) = delimiter {
                    out.push(d.as_ref());
                }
                out
            }
            Expr::SemanticAnd(_)
            | Expr::SemanticNot(_)
            | Expr::Literal { .. }
            | Expr::Class(_)
            | Expr::Any
            | Expr::RuleRef(_) => Vec::new(),
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Names of every rule referenced below this node, with repeats.
    pub fn rule_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::RuleRef(name) = e {
                out.push(name.as_str());
            }
        });
        out
    }

    /// True for the node kinds that name a single input test.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Expr::Literal { .. } | Expr::Class(_) | Expr::Any)
    }
}

/// An inclusive character range inside a class. `begin == end` for a single
/// character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRange {
    begin: char,
    end: char,
}

impl ClassRange {
    pub fn new(begin: char, end: char) -> Result<Self, GrammarError> {
        if begin > end {
            return Err(GrammarError::InvalidClassRange { begin, end });
        }
        Ok(Self { begin, end })
    }

    pub fn single(ch: char) -> Self {
        Self { begin: ch, end: ch }
    }

    pub fn begin(&self) -> char {
        self.begin
    }

    pub fn end(&self) -> char {
        self.end
    }

    pub fn is_range(&self) -> bool {
        self.begin != self.end
    }
}

/// A bracketed character class such as `[^a-z_]i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharClass {
    pub parts: Vec<ClassRange>,
    pub inverted: bool,
    pub ignore_case: bool,
}

impl CharClass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(mut self, ch: char) -> Self {
        self.parts.push(ClassRange::single(ch));
        self
    }

    pub fn range(mut self, begin: char, end: char) -> Result<Self, GrammarError> {
        self.parts.push(ClassRange::new(begin, end)?);
        Ok(self)
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// The class as it would be written in a grammar, used as the
    /// expectation description.
    pub fn raw_text(&self) -> String {
        let mut out = String::from("[");
        if self.inverted {
            out.push('^');
        }
        for part in &self.parts {
            push_class_char(&mut out, part.begin);
            if part.is_range() {
                out.push('-');
                push_class_char(&mut out, part.end);
            }
        }
        out.push(']');
        if self.ignore_case {
            out.push('i');
        }
        out
    }
}

fn push_class_char(out: &mut String, ch: char) {
    match ch {
        '\\' | ']' | '^' | '-' => {
            out.push('\\');
            out.push(ch);
        }
        _ => out.push_str(&pegcode_common::constant::escape(&ch.to_string())),
    }
}
