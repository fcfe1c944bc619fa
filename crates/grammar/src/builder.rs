//! Short constructors for building grammars in code.
//!
//! # Usage
//!
//! ```
//! use pegcode_grammar::builder::*;
//! use pegcode_grammar::{Grammar, Rule};
//!
//! // sum = a:num "+" b:num { a + b }
//! let grammar = Grammar::new(vec![
//!     Rule::new(
//!         "sum",
//!         action(
//!             "a + b",
//!             seq(vec![label("a", rule_ref("num")), lit("+"), label("b", rule_ref("num"))]),
//!         ),
//!     ),
//!     Rule::new("num", num(10, None).unwrap()),
//! ]);
//! assert_eq!(grammar.rules.len(), 2);
//! ```

use pegcode_common::GrammarError;

use crate::expr::{CharClass, Expr};

pub fn choice(alternatives: Vec<Expr>) -> Expr {
    Expr::Choice(alternatives)
}

pub fn seq(elements: Vec<Expr>) -> Expr {
    Expr::Sequence(elements)
}

pub fn label(name: impl Into<String>, expr: Expr) -> Expr {
    Expr::Labeled {
        label: name.into(),
        expr: Box::new(expr),
    }
}

pub fn action(code: impl Into<String>, expr: Expr) -> Expr {
    Expr::Action {
        code: code.into(),
        expr: Box::new(expr),
    }
}

pub fn named(name: impl Into<String>, expr: Expr) -> Expr {
    Expr::Named {
        name: name.into(),
        expr: Box::new(expr),
    }
}

pub fn text(expr: Expr) -> Expr {
    Expr::Text(Box::new(expr))
}

/// `&expr`
pub fn and(expr: Expr) -> Expr {
    Expr::SimpleAnd(Box::new(expr))
}

/// `!expr`
pub fn not(expr: Expr) -> Expr {
    Expr::SimpleNot(Box::new(expr))
}

/// `&{ code }`
pub fn sem_and(code: impl Into<String>) -> Expr {
    Expr::SemanticAnd(code.into())
}

/// `!{ code }`
pub fn sem_not(code: impl Into<String>) -> Expr {
    Expr::SemanticNot(code.into())
}

pub fn opt(expr: Expr) -> Expr {
    Expr::Optional(Box::new(expr))
}

pub fn star(expr: Expr) -> Expr {
    Expr::ZeroOrMore(Box::new(expr))
}

pub fn plus(expr: Expr) -> Expr {
    Expr::OneOrMore(Box::new(expr))
}

/// `expr|min..max|`
pub fn range(expr: Expr, min: Option<u32>, max: Option<u32>) -> Expr {
    Expr::Range {
        min,
        max,
        delimiter: None,
        expr: Box::new(expr),
    }
}

/// `expr|min..max, delimiter|`
pub fn delimited(expr: Expr, min: Option<u32>, max: Option<u32>, delimiter: Expr) -> Expr {
    Expr::Range {
        min,
        max,
        delimiter: Some(Box::new(delimiter)),
        expr: Box::new(expr),
    }
}

/// `expr|n|`
pub fn exact(expr: Expr, n: u32) -> Expr {
    range(expr, Some(n), Some(n))
}

pub fn lit(value: impl Into<String>) -> Expr {
    Expr::Literal {
        value: value.into(),
        ignore_case: false,
    }
}

pub fn lit_ic(value: impl Into<String>) -> Expr {
    Expr::Literal {
        value: value.into(),
        ignore_case: true,
    }
}

pub fn class(class: CharClass) -> Expr {
    Expr::Class(class)
}

pub fn any() -> Expr {
    Expr::Any
}

pub fn rule_ref(name: impl Into<String>) -> Expr {
    Expr::RuleRef(name.into())
}

/// Digits of `base`. `size` of `None` means one or more, otherwise exactly
/// `size` digits.
///
/// Bases above 10 use letters, matched without regard to case.
pub fn digits(base: u32, size: Option<u32>) -> Result<Expr, GrammarError> {
    if !(2..=36).contains(&base) {
        return Err(GrammarError::InvalidDigitBase { base });
    }
    let digit = if base <= 10 {
        CharClass::new().range('0', digit_char(b'0', base - 1))?
    } else {
        CharClass::new()
            .range('0', '9')?
            .range('A', digit_char(b'A', base - 11))?
            .ignore_case()
    };
    let digit = class(digit);
    Ok(match size {
        None => range(digit, Some(1), None),
        Some(1) => digit,
        Some(n) => exact(digit, n),
    })
}

/// The text of a number in `base`. With `size` above 1, a leading `-` or `+`
/// may take the place of one digit.
pub fn num(base: u32, size: Option<u32>) -> Result<Expr, GrammarError> {
    match size {
        Some(n) if n > 1 => Ok(text(choice(vec![
            seq(vec![lit("-"), digits(base, Some(n - 1))?]),
            seq(vec![lit("+"), digits(base, Some(n - 1))?]),
            digits(base, Some(n))?,
        ]))),
        _ => Ok(text(digits(base, size)?)),
    }
}

fn digit_char(first: u8, offset: u32) -> char {
    char::from(first + offset as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_digits_class() {
        let d = digits(10, Some(1)).unwrap();
        assert_eq!(d, class(CharClass::new().range('0', '9').unwrap()));
    }

    #[test]
    fn octal_digits_class() {
        match digits(8, Some(1)).unwrap() {
            Expr::Class(c) => assert_eq!(c.raw_text(), "[0-7]"),
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn hex_digits_ignore_case() {
        match digits(16, Some(1)).unwrap() {
            Expr::Class(c) => {
                assert_eq!(c.raw_text(), "[0-9A-F]i");
                assert!(c.ignore_case);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn base_36_uses_whole_alphabet() {
        match digits(36, Some(1)).unwrap() {
            Expr::Class(c) => assert_eq!(c.raw_text(), "[0-9A-Z]i"),
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn digit_sizes() {
        assert!(matches!(
            digits(10, None).unwrap(),
            Expr::Range { min: Some(1), max: None, .. }
        ));
        assert!(matches!(
            digits(10, Some(4)).unwrap(),
            Expr::Range { min: Some(4), max: Some(4), .. }
        ));
    }

    #[test]
    fn invalid_base_rejected() {
        assert_eq!(
            digits(1, None),
            Err(GrammarError::InvalidDigitBase { base: 1 })
        );
        assert_eq!(
            digits(37, Some(1)),
            Err(GrammarError::InvalidDigitBase { base: 37 })
        );
        assert!(num(0, Some(3)).is_err());
    }

    #[test]
    fn sized_num_allows_sign() {
        match num(10, Some(3)).unwrap() {
            Expr::Text(inner) => match *inner {
                Expr::Choice(alts) => assert_eq!(alts.len(), 3),
                other => panic!("expected choice, got {other:?}"),
            },
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn unsized_num_is_text_of_digits() {
        assert_eq!(num(10, None).unwrap(), text(digits(10, None).unwrap()));
    }
}
