//! Render grammars back to PEG syntax.
//!
//! Parentheses are inserted only where precedence requires them, so the
//! output of a builder-made grammar reads like hand-written source.

use std::fmt;

use pegcode_common::constant::quote;

use crate::expr::{Expr, Grammar, Rule};

// Binding strength, loosest first.
const CHOICE: u8 = 0;
const ACTION: u8 = 1;
const SEQUENCE: u8 = 2;
const PREFIX: u8 = 3;
const SUFFIX: u8 = 4;
const PRIMARY: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Choice(alts) if alts.len() > 1 => CHOICE,
        Expr::Action { .. } => ACTION,
        Expr::Sequence(items) if items.len() > 1 => SEQUENCE,
        Expr::Labeled { .. } | Expr::Text(_) | Expr::SimpleAnd(_) | Expr::SimpleNot(_) => PREFIX,
        Expr::Optional(_) | Expr::ZeroOrMore(_) | Expr::OneOrMore(_) | Expr::Range { .. } => {
            SUFFIX
        }
        Expr::Named { expr, .. } => precedence(expr),
        Expr::Choice(alts) | Expr::Sequence(alts) => alts.first().map_or(PRIMARY, precedence),
        _ => PRIMARY,
    }
}

fn write_at(f: &mut fmt::Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if precedence(expr) < min {
        write!(f, "(")?;
        write_expr(f, expr)?;
        write!(f, ")")
    } else {
        write_expr(f, expr)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str, min: u8) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write_at(f, item, min)?;
    }
    Ok(())
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: Option<u32>) -> fmt::Result {
    match bound {
        Some(n) => write!(f, "{n}"),
        None => Ok(()),
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Choice(alts) if alts.is_empty() => f.write_str("()"),
        Expr::Choice(alts) => write_joined(f, alts, " / ", ACTION),
        Expr::Sequence(items) if items.is_empty() => f.write_str("()"),
        Expr::Sequence(items) => write_joined(f, items, " ", PREFIX),
        Expr::Labeled { label, expr } => {
            write!(f, "{label}:")?;
            write_at(f, expr, SUFFIX)
        }
        Expr::Action { code, expr } => {
            write_at(f, expr, SEQUENCE)?;
            write!(f, " {{{code}}}")
        }
        // A display name only has syntax at the rule level.
        Expr::Named { expr, .. } => write_expr(f, expr),
        Expr::Text(expr) => {
            f.write_str("$")?;
            write_at(f, expr, SUFFIX)
        }
        Expr::SimpleAnd(expr) => {
            f.write_str("&")?;
            write_at(f, expr, SUFFIX)
        }
        Expr::SimpleNot(expr) => {
            f.write_str("!")?;
            write_at(f, expr, SUFFIX)
        }
        Expr::SemanticAnd(code) => write!(f, "&{{{code}}}"),
        Expr::SemanticNot(code) => write!(f, "!{{{code}}}"),
        Expr::Optional(expr) => {
            write_at(f, expr, PRIMARY)?;
            f.write_str("?")
        }
        Expr::ZeroOrMore(expr) => {
            write_at(f, expr, PRIMARY)?;
            f.write_str("*")
        }
        Expr::OneOrMore(expr) => {
            write_at(f, expr, PRIMARY)?;
            f.write_str("+")
        }
        Expr::Range {
            min,
            max,
            delimiter,
            expr,
        } => {
            write_at(f, expr, PRIMARY)?;
            f.write_str("|")?;
            if min.is_some() && min == max {
                write_bound(f, *min)?;
            } else {
                write_bound(f, *min)?;
                f.write_str("..")?;
                write_bound(f, *max)?;
            }
            if let Some(d) = delimiter {
                f.write_str(", ")?;
                write_at(f, d, CHOICE)?;
            }
            f.write_str("|")
        }
        Expr::Literal { value, ignore_case } => {
            f.write_str(&quote(value))?;
            if *ignore_case {
                f.write_str("i")?;
            }
            Ok(())
        }
        Expr::Class(class) => f.write_str(&class.raw_text()),
        Expr::Any => f.write_str("."),
        Expr::RuleRef(name) => f.write_str(name),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(display) = self.display_name() {
            write!(f, " {}", quote(display))?;
        }
        write!(f, " = {}", self.expression)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(init) = &self.initializer {
            writeln!(f, "{{{init}}}")?;
            writeln!(f)?;
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::*;
    use crate::expr::CharClass;

    #[test]
    fn terminals() {
        assert_eq!(lit("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(lit_ic("abc").to_string(), "\"abc\"i");
        assert_eq!(any().to_string(), ".");
        assert_eq!(rule_ref("digit").to_string(), "digit");
        let c = CharClass::new().range('0', '9').unwrap();
        assert_eq!(class(c).to_string(), "[0-9]");
    }

    #[test]
    fn choice_inside_sequence_is_parenthesized() {
        let e = seq(vec![choice(vec![lit("a"), lit("b")]), lit("c")]);
        assert_eq!(e.to_string(), "(\"a\" / \"b\") \"c\"");
    }

    #[test]
    fn action_on_sequence() {
        let e = action(
            " a + b ",
            seq(vec![label("a", rule_ref("x")), label("b", rule_ref("y"))]),
        );
        assert_eq!(e.to_string(), "a:x b:y { a + b }");
    }

    #[test]
    fn actions_inside_choice_need_no_parens() {
        let e = choice(vec![action("1", lit("a")), action("2", lit("b"))]);
        assert_eq!(e.to_string(), "\"a\" {1} / \"b\" {2}");
    }

    #[test]
    fn suffix_binds_tighter_than_prefix() {
        assert_eq!(not(star(any())).to_string(), "!.*");
        assert_eq!(plus(seq(vec![lit("a"), lit("b")])).to_string(), "(\"a\" \"b\")+");
        assert_eq!(text(label("x", any())).to_string(), "$(x:.)");
    }

    #[test]
    fn ranges() {
        assert_eq!(range(any(), Some(2), Some(5)).to_string(), ".|2..5|");
        assert_eq!(range(any(), None, Some(3)).to_string(), ".|..3|");
        assert_eq!(range(any(), Some(1), None).to_string(), ".|1..|");
        assert_eq!(exact(any(), 4).to_string(), ".|4|");
        assert_eq!(
            delimited(rule_ref("item"), Some(1), None, lit(",")).to_string(),
            "item|1.., \",\"|"
        );
    }

    #[test]
    fn predicates() {
        assert_eq!(sem_and("ok").to_string(), "&{ok}");
        assert_eq!(sem_not("ok").to_string(), "!{ok}");
        assert_eq!(and(lit("a")).to_string(), "&\"a\"");
    }

    #[test]
    fn rules_and_grammar() {
        let g = Grammar::new(vec![
            Rule::new("start", plus(rule_ref("ws"))),
            Rule::named("ws", "whitespace", lit(" ")),
        ])
        .with_initializer(" let x = 1; ");
        assert_eq!(
            g.to_string(),
            "{ let x = 1; }\n\nstart = ws+\n\nws \"whitespace\" = \" \"\n"
        );
    }
}
