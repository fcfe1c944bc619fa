//! End-to-end tests: grammar AST in, parse results and syntax errors out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pegcode::builder::*;
use pegcode::{
    build, ActionHooks, CharClass, CompileOptions, Error, Expectation, Expr, Grammar, GrammarError,
    ParseError, Parser, ParserOptions, Rule, SyntaxError, Value,
};
use proptest::prelude::*;

// ========================================================
// Helpers
// ========================================================

fn parser(rules: Vec<Rule>) -> Parser {
    parser_with(rules, ActionHooks::new())
}

fn parser_with(rules: Vec<Rule>, hooks: ActionHooks) -> Parser {
    build(
        &Grammar::new(rules),
        &CompileOptions::default(),
        &hooks,
        ParserOptions::default(),
    )
    .expect("grammar builds")
}

fn syntax_error(p: &Parser, input: &str) -> SyntaxError {
    match p.parse(input, None) {
        Err(ParseError::Syntax(e)) => e,
        other => panic!("expected a syntax error for {input:?}, got {other:?}"),
    }
}

fn digit() -> Expr {
    class(CharClass::new().range('0', '9').unwrap())
}

fn s(text: &str) -> Value {
    Value::from(text)
}

// ========================================================
// Choice and sequence
// ========================================================

#[test]
fn ordered_choice_commits_to_first_match() {
    let p = parser(vec![Rule::new("start", choice(vec![lit("a"), lit("ab")]))]);
    let err = syntax_error(&p, "ab");
    assert_eq!(err.offset, 1);
    assert_eq!(err.expected, vec![Expectation::end()]);
    assert_eq!(err.message, "Expected end of input but \"b\" found.");
}

#[test]
fn sequence_is_atomic() {
    let p = parser(vec![Rule::new("start", seq(vec![lit("a"), lit("b")]))]);
    assert_eq!(p.parse("ab", None), Ok(Value::from(vec![s("a"), s("b")])));

    let err = syntax_error(&p, "ac");
    assert_eq!(err.offset, 1);
    assert_eq!(err.expected, vec![Expectation::literal("b")]);
    assert_eq!(err.found, Some('c'));
}

#[test]
fn choice_backtracks_after_partial_sequence() {
    let p = parser(vec![Rule::new(
        "start",
        choice(vec![
            seq(vec![lit("a"), lit("b")]),
            text(seq(vec![lit("a"), lit("c")])),
        ]),
    )]);
    assert_eq!(p.parse("ac", None), Ok(s("ac")));
}

#[test]
fn thousands_of_keywords() {
    let keywords = (0..2_000).map(|i| lit(format!("kw{i};"))).collect();
    let p = parser(vec![Rule::new("keyword", choice(keywords))]);
    assert_eq!(p.parse("kw0;", None), Ok(s("kw0;")));
    assert_eq!(p.parse("kw1999;", None), Ok(s("kw1999;")));

    let err = syntax_error(&p, "kw2000;");
    assert_eq!(err.offset, 0);
    assert_eq!(err.expected.len(), 2_000);
}

#[test]
fn sequence_longer_than_block_nesting_limit() {
    let p = parser(vec![Rule::new("start", text(seq(vec![lit("a"); 5_000])))]);
    let input = "a".repeat(5_000);
    assert_eq!(p.parse(&input, None), Ok(s(&input)));

    let err = syntax_error(&p, &input[1..]);
    assert_eq!(err.offset, 4_999);
    assert_eq!(err.expected, vec![Expectation::literal("a")]);
}

// ========================================================
// Repetition
// ========================================================

#[test]
fn one_or_more_digits() {
    let p = parser(vec![Rule::new("start", plus(digit()))]);
    assert_eq!(
        p.parse("123", None),
        Ok(Value::from(vec![s("1"), s("2"), s("3")]))
    );

    let err = syntax_error(&p, "123abc");
    assert_eq!(err.offset, 3);
    assert_eq!(
        err.expected,
        vec![Expectation::class("[0-9]"), Expectation::end()]
    );
    assert_eq!(err.message, "Expected [0-9] or end of input but \"a\" found.");

    let err = syntax_error(&p, "");
    assert_eq!(err.expected, vec![Expectation::class("[0-9]")]);
}

#[test]
fn impossible_range_always_fails() {
    let p = parser(vec![Rule::new("start", range(lit("a"), Some(3), Some(2)))]);
    for input in ["", "a", "aa", "aaa"] {
        assert!(
            matches!(p.parse(input, None), Err(ParseError::Syntax(_))),
            "{input:?} should not parse"
        );
    }
}

#[test]
fn short_exact_repetition_restores_position() {
    // 'a'|3| / 'a'|2| { 42 }
    let hooks = ActionHooks::new().on("42", |_| Ok(Value::Int(42)));
    let p = parser_with(
        vec![Rule::new(
            "start",
            choice(vec![exact(lit("a"), 3), action("42", exact(lit("a"), 2))]),
        )],
        hooks,
    );
    assert_eq!(p.parse("aa", None), Ok(Value::Int(42)));
    assert_eq!(
        p.parse("aaa", None),
        Ok(Value::from(vec![s("a"), s("a"), s("a")]))
    );
}

#[test]
fn delimited_list() {
    let item = class(CharClass::new().range('a', 'z').unwrap());
    let p = parser(vec![Rule::new(
        "list",
        delimited(item, Some(1), Some(3), lit(",")),
    )]);
    assert_eq!(
        p.parse("a,b,c", None),
        Ok(Value::from(vec![s("a"), s("b"), s("c")]))
    );
    assert!(p.parse("a,b,c,d", None).is_err());
    assert!(p.parse("a,", None).is_err());
    assert!(p.parse("", None).is_err());
}

#[test]
fn optional_yields_empty_string() {
    let p = parser(vec![Rule::new("start", seq(vec![opt(lit("-")), digit()]))]);
    assert_eq!(p.parse("7", None), Ok(Value::from(vec![s(""), s("7")])));
    assert_eq!(p.parse("-7", None), Ok(Value::from(vec![s("-"), s("7")])));
}

// ========================================================
// Literals and classes
// ========================================================

#[test]
fn ignore_case_literal_keeps_input_text() {
    let p = parser(vec![Rule::new("start", lit_ic("abc"))]);
    assert_eq!(p.parse("ABC", None), Ok(s("ABC")));
    assert_eq!(p.parse("aBc", None), Ok(s("aBc")));
    assert!(p.parse("abd", None).is_err());
}

#[test]
fn ignore_case_literal_longer_when_lowered() {
    // 'İ' lower-cases to "i\u{307}", two chars for one.
    let p = parser(vec![Rule::new("start", lit_ic("İx"))]);
    assert_eq!(p.parse("İx", None), Ok(s("İx")));
    assert_eq!(p.parse("İX", None), Ok(s("İX")));

    let err = syntax_error(&p, "Ix");
    assert_eq!(err.offset, 0);
    assert_eq!(err.message, "Expected \"İx\" but \"I\" found.");
}

#[test]
fn inverted_class_and_any() {
    let not_quote = class(CharClass::new().single('"').inverted());
    let p = parser(vec![Rule::new(
        "string",
        seq(vec![lit("\""), text(star(not_quote)), lit("\"")]),
    )]);
    assert_eq!(
        p.parse("\"hi there\"", None),
        Ok(Value::from(vec![s("\""), s("hi there"), s("\"")]))
    );
}

// ========================================================
// Predicates
// ========================================================

fn rest_after(predicate: Expr) -> Parser {
    let hooks = ActionHooks::new().on("rest", |scope| {
        Ok(scope.arg("rest").cloned().unwrap_or(Value::Null))
    });
    parser_with(
        vec![Rule::new(
            "start",
            action(
                "rest",
                seq(vec![predicate, label("rest", text(star(Expr::Any)))]),
            ),
        )],
        hooks,
    )
}

proptest! {
    /// A successful predicate leaves the cursor where it was.
    #[test]
    fn predicates_consume_nothing(input in "[ab]{0,8}") {
        let and_p = rest_after(and(lit("a")));
        let not_p = rest_after(not(lit("b")));

        let starts_with_a = input.starts_with('a');
        let and_result = and_p.parse(&input, None);
        prop_assert_eq!(and_result.is_ok(), starts_with_a);
        if let Ok(v) = and_result {
            prop_assert_eq!(v, Value::from(input.as_str()));
        }

        let not_result = not_p.parse(&input, None);
        prop_assert_eq!(not_result.is_ok(), !input.starts_with('b'));
        if let Ok(v) = not_result {
            prop_assert_eq!(v, Value::from(input.as_str()));
        }
    }

    /// The furthest-failure set does not depend on alternative order.
    #[test]
    fn expectations_independent_of_choice_order(
        input in "[abc]{0,3}",
        rotate in 0usize..3,
    ) {
        let mut alts = vec![
            seq(vec![lit("a"), lit("b")]),
            seq(vec![lit("a"), lit("c"), lit("c")]),
            lit("b"),
        ];
        let baseline = parser(vec![Rule::new("start", choice(alts.clone()))]);
        alts.rotate_left(rotate);
        let rotated = parser(vec![Rule::new("start", choice(alts))]);

        match (baseline.parse(&input, None), rotated.parse(&input, None)) {
            (Err(ParseError::Syntax(a)), Err(ParseError::Syntax(b))) => {
                prop_assert_eq!(a.offset, b.offset);
                prop_assert_eq!(a.expected, b.expected);
            }
            (a, b) => prop_assert_eq!(a.is_ok(), b.is_ok()),
        }
    }
}

#[test]
fn semantic_predicates_see_labels() {
    let hooks = ActionHooks::new().on("a == b", |scope| {
        Ok(Value::Bool(scope.arg("a") == scope.arg("b")))
    });
    let p = parser_with(
        vec![Rule::new(
            "pair",
            seq(vec![
                label("a", Expr::Any),
                label("b", Expr::Any),
                sem_and("a == b"),
            ]),
        )],
        hooks,
    );
    assert!(p.parse("xx", None).is_ok());
    assert!(p.parse("xy", None).is_err());
}

// ========================================================
// Actions
// ========================================================

#[test]
fn labels_become_action_arguments() {
    let hooks = ActionHooks::new().on("[a, b]", |scope| {
        assert_eq!(scope.params(), ["a", "b"]);
        Ok(Value::from(scope.args().to_vec()))
    });
    let p = parser_with(
        vec![Rule::new(
            "start",
            action(
                "[a, b]",
                seq(vec![label("a", lit("x")), label("b", lit("y"))]),
            ),
        )],
        hooks,
    );
    assert_eq!(p.parse("xy", None), Ok(Value::from(vec![s("x"), s("y")])));
}

#[test]
fn untaken_action_never_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let hooks = ActionHooks::new().on("count()", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Null)
    });
    let p = parser_with(
        vec![Rule::new(
            "start",
            choice(vec![action("count()", lit("x")), lit("y")]),
        )],
        hooks,
    );
    assert_eq!(p.parse("y", None), Ok(s("y")));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    p.parse("x", None).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn action_sees_matched_text_and_location() {
    let hooks = ActionHooks::new().on("where()", |scope| {
        Ok(Value::from(format!(
            "{}@{}:{}",
            scope.text(),
            scope.line(),
            scope.column()
        )))
    });
    let word = plus(class(CharClass::new().range('a', 'z').unwrap()));
    let p = parser_with(
        vec![Rule::new(
            "start",
            seq(vec![lit("\n  "), action("where()", word)]),
        )],
        hooks,
    );
    assert_eq!(
        p.parse("\n  foo", None),
        Ok(Value::from(vec![s("\n  "), s("foo@2:3")]))
    );
}

#[test]
fn action_expected_reports_at_action_start() {
    let hooks = ActionHooks::new().on("check(n)", |scope| {
        match scope.arg("n").and_then(Value::as_str) {
            Some("0") => Err(scope.expected("non-zero digit")),
            _ => Ok(Value::Null),
        }
    });
    let p = parser_with(
        vec![Rule::new(
            "start",
            seq(vec![lit("x"), action("check(n)", label("n", digit()))]),
        )],
        hooks,
    );
    assert!(p.parse("x5", None).is_ok());
    let err = syntax_error(&p, "x0");
    assert_eq!(err.offset, 1);
    assert_eq!(err.expected, vec![Expectation::other("non-zero digit")]);
    assert_eq!(err.message, "Expected non-zero digit but \"0\" found.");
}

#[test]
fn action_error_uses_custom_message() {
    let hooks = ActionHooks::new().on("reject()", |scope| Err(scope.error("reserved word")));
    let p = parser_with(
        vec![Rule::new(
            "start",
            choice(vec![action("reject()", lit("if")), lit("x")]),
        )],
        hooks,
    );
    let err = syntax_error(&p, "if");
    assert_eq!(err.to_string(), "reserved word");
    assert_eq!((err.line, err.column), (1, 1));
}

// ========================================================
// Errors and locations
// ========================================================

#[test]
fn named_rule_replaces_inner_expectations() {
    let ws = plus(class(CharClass::new().single(' ').single('\t')));
    let p = parser(vec![
        Rule::new("start", seq(vec![lit("a"), rule_ref("ws"), lit("b")])),
        Rule::named("ws", "whitespace", ws),
    ]);
    let err = syntax_error(&p, "ab");
    assert_eq!(err.expected, vec![Expectation::other("whitespace")]);
    assert_eq!(err.message, "Expected whitespace but \"b\" found.");
}

#[test]
fn error_location_counts_lines() {
    let line = seq(vec![plus(digit()), lit("\n")]);
    let p = parser(vec![Rule::new("lines", star(line))]);
    let err = syntax_error(&p, "12\n34\n5x\n");
    assert_eq!((err.offset, err.line, err.column), (7, 3, 2));

    let crlf = seq(vec![lit("a"), lit("\r\n"), lit("b")]);
    let p = parser(vec![Rule::new("start", crlf)]);
    let err = syntax_error(&p, "a\r\nc");
    assert_eq!((err.line, err.column), (2, 1));
}

// ========================================================
// Start rules
// ========================================================

#[test]
fn start_rule_selection() {
    let grammar = Grammar::new(vec![
        Rule::new("number", plus(digit())),
        Rule::new("word", text(plus(class(CharClass::new().range('a', 'z').unwrap())))),
        Rule::new("other", lit("?")),
    ]);
    let options = CompileOptions::new()
        .allow_start_rule("word")
        .allow_start_rule("number");
    let p = build(&grammar, &options, &ActionHooks::new(), ParserOptions::default()).unwrap();

    assert_eq!(p.parse("abc", None), Ok(s("abc")));
    assert_eq!(p.parse("42", Some("number")), Ok(Value::from(vec![s("4"), s("2")])));
    assert_eq!(
        p.parse("?", Some("other")),
        Err(ParseError::Grammar(GrammarError::NotStartRule {
            name: "other".into()
        }))
    );
}

#[test]
fn proxy_rules_parse_like_their_target() {
    let p = parser(vec![
        Rule::new("start", seq(vec![rule_ref("sign"), rule_ref("op")])),
        Rule::new("sign", rule_ref("op")),
        Rule::new("op", choice(vec![lit("+"), lit("-")])),
    ]);
    assert_eq!(p.parse("+-", None), Ok(Value::from(vec![s("+"), s("-")])));

    let err = syntax_error(&p, "+*");
    assert_eq!(err.offset, 1);
    assert_eq!(
        err.expected,
        vec![Expectation::literal("+"), Expectation::literal("-")]
    );
}

#[test]
fn left_recursive_grammar_is_rejected_before_parsing() {
    let grammar = Grammar::new(vec![Rule::new(
        "expr",
        choice(vec![seq(vec![rule_ref("expr"), lit("+"), digit()]), digit()]),
    )]);
    let err = build(
        &grammar,
        &CompileOptions::default(),
        &ActionHooks::new(),
        ParserOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Grammar(GrammarError::LeftRecursion { .. })));
}

// ========================================================
// A small calculator
// ========================================================

fn calculator() -> Parser {
    let int = |v: Option<&Value>| v.and_then(Value::as_int).unwrap_or(0);
    let hooks = ActionHooks::new()
        .on("l + r", move |scope| {
            Ok(Value::Int(int(scope.arg("l")) + int(scope.arg("r"))))
        })
        .on("l * r", move |scope| {
            Ok(Value::Int(int(scope.arg("l")) * int(scope.arg("r"))))
        })
        .on("e", |scope| Ok(scope.arg("e").cloned().unwrap_or(Value::Null)))
        .on("parseInt(d)", |scope| {
            let d = scope.arg("d").and_then(Value::as_str).unwrap_or_default();
            d.parse::<i64>()
                .map(Value::Int)
                .map_err(|e| scope.error(e.to_string()))
        });
    parser_with(
        vec![
            Rule::new(
                "additive",
                choice(vec![
                    action(
                        "l + r",
                        seq(vec![
                            label("l", rule_ref("multiplicative")),
                            lit("+"),
                            label("r", rule_ref("additive")),
                        ]),
                    ),
                    rule_ref("multiplicative"),
                ]),
            ),
            Rule::new(
                "multiplicative",
                choice(vec![
                    action(
                        "l * r",
                        seq(vec![
                            label("l", rule_ref("primary")),
                            lit("*"),
                            label("r", rule_ref("multiplicative")),
                        ]),
                    ),
                    rule_ref("primary"),
                ]),
            ),
            Rule::new(
                "primary",
                choice(vec![
                    rule_ref("integer"),
                    action(
                        "e",
                        seq(vec![lit("("), label("e", rule_ref("additive")), lit(")")]),
                    ),
                ]),
            ),
            Rule::named(
                "integer",
                "integer",
                action("parseInt(d)", label("d", text(plus(digit())))),
            ),
        ],
        hooks,
    )
}

#[test]
fn calculator_evaluates() {
    let p = calculator();
    assert_eq!(p.parse("2*(3+4)", None), Ok(Value::Int(14)));
    assert_eq!(p.parse("1+2*3", None), Ok(Value::Int(7)));
}

#[test]
fn calculator_reports_furthest_failure() {
    let p = calculator();
    let err = syntax_error(&p, "2*(3+)");
    assert_eq!(err.offset, 5);
    assert_eq!(
        err.expected,
        vec![Expectation::literal("("), Expectation::other("integer")]
    );
}

#[test]
fn parser_is_shared_across_threads() {
    let p = Arc::new(calculator());
    let handles: Vec<_> = (1..=4)
        .map(|n| {
            let p = Arc::clone(&p);
            std::thread::spawn(move || p.parse(&format!("{n}*{n}"), None))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![
            Ok(Value::Int(1)),
            Ok(Value::Int(4)),
            Ok(Value::Int(9)),
            Ok(Value::Int(16))
        ]
    );
}
