//! Lowering of rule expressions to bytecode.
//!
//! The generator never executes anything. It tracks the stack height a
//! correct executor will have at each point (`sp`, the number of live slots)
//! and the slot each visible label is bound to, and derives every
//! `REPORT_SAVED_POS`/`CALL` operand from those.

use std::collections::HashMap;

use indexmap::IndexMap;
use pegcode_common::{
    ActionEntry, ActionTable, ClassMatcher, Constant, ConstantTable, Expectation, GrammarError,
    Opcode,
};
use pegcode_grammar::{Expr, Grammar};

/// Compile-time state for one subexpression. Cloned for every child, so
/// siblings never see each other's bindings.
#[derive(Debug, Clone, Default)]
struct Context<'a> {
    /// Live slots below the expression's result. The result lands in slot `sp`.
    sp: usize,
    /// Label to slot, in declaration order.
    env: IndexMap<String, usize>,
    /// Code of the action whose direct child is the expression being lowered.
    action: Option<&'a str>,
}

impl Context<'_> {
    fn child(&self, sp: usize) -> Self {
        Self {
            sp,
            env: self.env.clone(),
            action: None,
        }
    }
}

pub struct Generator<'g> {
    rule_index: HashMap<&'g str, usize>,
    pub constants: ConstantTable,
    pub actions: ActionTable,
    /// Rule being lowered, for error reporting.
    current: &'g str,
}

impl<'g> Generator<'g> {
    /// Rules listed in `proxies` are left out of the output; references to
    /// them resolve to their target's index instead.
    pub fn new(grammar: &'g Grammar, proxies: &HashMap<&'g str, &'g str>) -> Self {
        let mut rule_index = HashMap::new();
        for rule in &grammar.rules {
            if !proxies.contains_key(rule.name.as_str()) {
                let next = rule_index.len();
                rule_index.insert(rule.name.as_str(), next);
            }
        }
        for (&proxy, target) in proxies {
            if let Some(&i) = rule_index.get(target) {
                rule_index.insert(proxy, i);
            }
        }
        Self {
            rule_index,
            constants: ConstantTable::new(),
            actions: ActionTable::new(),
            current: "",
        }
    }

    /// Lower one rule's expression.
    pub fn rule(&mut self, name: &'g str, expr: &'g Expr) -> Result<Vec<u32>, GrammarError> {
        self.current = name;
        self.expr(expr, Context::default()).map_err(|e| match e {
            GrammarError::CodeTooLarge { value, .. } => GrammarError::CodeTooLarge {
                rule: name.to_string(),
                value,
            },
            other => other,
        })
    }

    fn expr(&mut self, expr: &'g Expr, ctx: Context<'g>) -> Result<Vec<u32>, GrammarError> {
        match expr {
            Expr::Choice(alts) => self.choice(alts, &ctx),
            Expr::Sequence(items) => self.sequence(items, ctx),
            Expr::Labeled { expr, .. } => self.expr(expr, ctx.child(ctx.sp)),
            Expr::Action { code, expr } => self.action(code, expr, ctx),
            Expr::Named { name, expr } => {
                let e = self.expectation(Expectation::other(name))?;
                let mut code = vec![Opcode::SilentFailsOn as u32];
                code.extend(self.expr(expr, ctx.child(ctx.sp))?);
                code.push(Opcode::SilentFailsOff as u32);
                code.extend(condition(
                    Opcode::IfError,
                    &[],
                    vec![Opcode::Pop as u32, Opcode::Fail as u32, e],
                    vec![],
                )?);
                Ok(code)
            }
            Expr::Text(inner) => {
                let mut code = vec![Opcode::PushCurrPos as u32];
                code.extend(self.expr(inner, ctx.child(ctx.sp + 1))?);
                code.extend(condition(
                    Opcode::IfNotError,
                    &[],
                    vec![Opcode::Text as u32],
                    vec![],
                )?);
                code.push(Opcode::Nip as u32);
                Ok(code)
            }
            Expr::SimpleAnd(inner) => self.simple_predicate(inner, false, &ctx),
            Expr::SimpleNot(inner) => self.simple_predicate(inner, true, &ctx),
            Expr::SemanticAnd(code) => self.semantic_predicate(code, false, &ctx),
            Expr::SemanticNot(code) => self.semantic_predicate(code, true, &ctx),
            Expr::Optional(inner) => {
                let mut code = self.expr(inner, ctx.child(ctx.sp))?;
                code.extend(condition(
                    Opcode::IfError,
                    &[],
                    vec![Opcode::Pop as u32, Opcode::PushEmptyString as u32],
                    vec![],
                )?);
                Ok(code)
            }
            Expr::ZeroOrMore(inner) => self.range(inner, 0, None, None, &ctx),
            Expr::OneOrMore(inner) => self.range(inner, 1, None, None, &ctx),
            Expr::Range {
                min,
                max,
                delimiter,
                expr,
            } => self.range(expr, min.unwrap_or(0), *max, delimiter.as_deref(), &ctx),
            Expr::Literal { value, ignore_case } => self.literal(value, *ignore_case),
            Expr::Class(class) => {
                let matcher = ClassMatcher {
                    ranges: class.parts.iter().map(|p| (p.begin(), p.end())).collect(),
                    inverted: class.inverted,
                    ignore_case: class.ignore_case,
                };
                let c = self.constant(Constant::Class(matcher))?;
                let e = self.expectation(Expectation::class(&class.raw_text()))?;
                condition(
                    Opcode::MatchClass,
                    &[c],
                    vec![Opcode::AcceptN as u32, 1],
                    vec![Opcode::Fail as u32, e],
                )
            }
            Expr::Any => {
                let e = self.expectation(Expectation::any())?;
                condition(
                    Opcode::MatchAny,
                    &[],
                    vec![Opcode::AcceptN as u32, 1],
                    vec![Opcode::Fail as u32, e],
                )
            }
            Expr::RuleRef(name) => {
                let index = self.rule_index.get(name.as_str()).copied().ok_or_else(|| {
                    GrammarError::UndefinedRule {
                        name: name.clone(),
                        rule: self.current.to_string(),
                    }
                })?;
                Ok(vec![Opcode::Rule as u32, word(index)?])
            }
        }
    }

    /// `a0 IF_ERROR [POP a1] IF_ERROR [POP a2] ..`. Once an alternative
    /// succeeds every later check falls through.
    fn choice(&mut self, alts: &'g [Expr], ctx: &Context<'g>) -> Result<Vec<u32>, GrammarError> {
        let Some((first, rest)) = alts.split_first() else {
            return Ok(vec![Opcode::PushFailed as u32]);
        };
        let mut code = self.expr(first, ctx.child(ctx.sp))?;
        for alt in rest {
            let mut retry = vec![Opcode::Pop as u32];
            retry.extend(self.expr(alt, ctx.child(ctx.sp))?);
            code.extend(condition(Opcode::IfError, &[], retry, vec![])?);
        }
        Ok(code)
    }

    /// `PUSH_CURR_POS e0 IF_NOT_ERROR [e1] [PUSH_FAILED] ..` then one final
    /// check. After a failure each remaining element pushes FAILED in its
    /// place.
    fn sequence(&mut self, items: &'g [Expr], ctx: Context<'g>) -> Result<Vec<u32>, GrammarError> {
        if items.is_empty() {
            return Ok(vec![Opcode::PushEmptyArray as u32]);
        }
        let n = items.len();
        let action = ctx.action;
        let base = ctx.sp + 1;
        let mut env = ctx.env;

        let mut code = vec![Opcode::PushCurrPos as u32];
        for (i, item) in items.iter().enumerate() {
            let element = self.expr(
                item,
                Context {
                    sp: base + i,
                    env: env.clone(),
                    action: None,
                },
            )?;
            if i == 0 {
                code.extend(element);
            } else {
                code.extend(condition(
                    Opcode::IfNotError,
                    &[],
                    element,
                    vec![Opcode::PushFailed as u32],
                )?);
            }
            if let Expr::Labeled { label, .. } = item {
                env.insert(label.clone(), base + i);
            }
        }

        // Stack: saved position, then n element results.
        let then = match action {
            Some(action) => {
                let f = self.action_entry(action, &env);
                let mut tail = vec![Opcode::ReportSavedPos as u32, word(n)?];
                tail.extend(call(f, n, &env, base + n)?);
                tail.push(Opcode::Nip as u32);
                tail
            }
            None => vec![Opcode::Wrap as u32, word(n)?, Opcode::Nip as u32],
        };
        let mut otherwise = if n > 1 {
            vec![Opcode::PopN as u32, word(n)?]
        } else {
            vec![Opcode::Pop as u32]
        };
        otherwise.extend([Opcode::PopCurrPos as u32, Opcode::PushFailed as u32]);

        code.extend(condition(Opcode::IfNotError, &[], then, otherwise)?);
        Ok(code)
    }

    fn action(
        &mut self,
        code_text: &'g str,
        expr: &'g Expr,
        ctx: Context<'g>,
    ) -> Result<Vec<u32>, GrammarError> {
        if matches!(expr, Expr::Sequence(items) if !items.is_empty()) {
            let mut inner = ctx.child(ctx.sp);
            inner.action = Some(code_text);
            return self.expr(expr, inner);
        }

        let mut env = ctx.env.clone();
        if let Expr::Labeled { label, .. } = expr {
            env.insert(label.clone(), ctx.sp + 1);
        }
        let f = self.action_entry(code_text, &env);

        let mut code = vec![Opcode::PushCurrPos as u32];
        code.extend(self.expr(expr, ctx.child(ctx.sp + 1))?);
        let mut then = vec![Opcode::ReportSavedPos as u32, 1];
        then.extend(call(f, 1, &env, ctx.sp + 2)?);
        code.extend(condition(Opcode::IfNotError, &[], then, vec![])?);
        code.push(Opcode::Nip as u32);
        Ok(code)
    }

    fn simple_predicate(
        &mut self,
        inner: &'g Expr,
        negative: bool,
        ctx: &Context<'g>,
    ) -> Result<Vec<u32>, GrammarError> {
        let mut code = vec![Opcode::PushCurrPos as u32, Opcode::SilentFailsOn as u32];
        code.extend(self.expr(inner, ctx.child(ctx.sp + 1))?);
        code.push(Opcode::SilentFailsOff as u32);

        // Both outcomes restore the position saved before the attempt.
        let (op, succeed, fail) = if negative {
            (
                Opcode::IfError,
                [Opcode::Pop, Opcode::Pop, Opcode::PushEmptyString],
                [Opcode::Pop, Opcode::PopCurrPos, Opcode::PushFailed],
            )
        } else {
            (
                Opcode::IfNotError,
                [Opcode::Pop, Opcode::PopCurrPos, Opcode::PushEmptyString],
                [Opcode::Pop, Opcode::Pop, Opcode::PushFailed],
            )
        };
        code.extend(condition(
            op,
            &[],
            succeed.iter().map(|&o| o as u32).collect(),
            fail.iter().map(|&o| o as u32).collect(),
        )?);
        Ok(code)
    }

    fn semantic_predicate(
        &mut self,
        code_text: &'g str,
        negative: bool,
        ctx: &Context<'g>,
    ) -> Result<Vec<u32>, GrammarError> {
        let f = self.action_entry(code_text, &ctx.env);
        let mut code = vec![Opcode::ReportCurrPos as u32];
        code.extend(call(f, 0, &ctx.env, ctx.sp)?);
        let accept = vec![Opcode::Pop as u32, Opcode::PushEmptyString as u32];
        let reject = vec![Opcode::Pop as u32, Opcode::PushFailed as u32];
        code.extend(if negative {
            condition(Opcode::If, &[], reject, accept)?
        } else {
            condition(Opcode::If, &[], accept, reject)?
        });
        Ok(code)
    }

    fn range(
        &mut self,
        element: &'g Expr,
        min: u32,
        max: Option<u32>,
        delimiter: Option<&'g Expr>,
        ctx: &Context<'g>,
    ) -> Result<Vec<u32>, GrammarError> {
        // A partial match of two or more elements has consumed input; keep
        // the start position so falling short of `min` can restore it.
        let saves_position = min >= 2;
        let array = if saves_position { ctx.sp + 1 } else { ctx.sp };

        let mut code = Vec::new();
        if saves_position {
            code.push(Opcode::PushCurrPos as u32);
        }
        code.push(Opcode::PushEmptyArray as u32);

        let first = self.expr(element, ctx.child(array + 1))?;
        code.extend(match max {
            Some(0) => condition(
                Opcode::IfArrlenMax,
                &[0],
                vec![Opcode::PushFailed as u32],
                first,
            )?,
            _ => first,
        });

        let attempt = match delimiter {
            None => self.expr(element, ctx.child(array + 1))?,
            Some(delimiter) => {
                // Stack: array, position before the delimiter, delimiter result.
                let mut code = vec![Opcode::PushCurrPos as u32];
                code.extend(self.expr(delimiter, ctx.child(array + 2))?);
                let mut then = vec![Opcode::Pop as u32];
                then.extend(self.expr(element, ctx.child(array + 2))?);
                then.extend(condition(
                    Opcode::IfError,
                    &[],
                    vec![
                        Opcode::Pop as u32,
                        Opcode::PopCurrPos as u32,
                        Opcode::PushFailed as u32,
                    ],
                    vec![Opcode::Nip as u32],
                )?);
                code.extend(condition(
                    Opcode::IfNotError,
                    &[],
                    then,
                    vec![
                        Opcode::Pop as u32,
                        Opcode::Pop as u32,
                        Opcode::PushFailed as u32,
                    ],
                )?);
                code
            }
        };

        let mut body = vec![Opcode::Append as u32];
        body.extend(match max {
            Some(max) => condition(
                Opcode::IfArrlenMax,
                &[max],
                vec![Opcode::PushFailed as u32],
                attempt,
            )?,
            None => attempt,
        });
        code.extend(repeat(body)?);
        code.push(Opcode::Pop as u32);

        if min > 0 {
            let mut short = vec![Opcode::Pop as u32];
            if saves_position {
                short.push(Opcode::PopCurrPos as u32);
            }
            short.push(Opcode::PushFailed as u32);
            let enough = if saves_position {
                vec![Opcode::Nip as u32]
            } else {
                vec![]
            };
            code.extend(condition(Opcode::IfArrlenMin, &[min], short, enough)?);
        }
        Ok(code)
    }

    fn literal(&mut self, value: &str, ignore_case: bool) -> Result<Vec<u32>, GrammarError> {
        if value.is_empty() {
            return Ok(vec![Opcode::PushEmptyString as u32]);
        }
        let s = if ignore_case {
            self.constant(Constant::Literal(value.to_lowercase()))?
        } else {
            self.constant(Constant::Literal(value.to_string()))?
        };
        let e = self.expectation(Expectation::literal(value))?;
        if ignore_case {
            // Lower-casing can change the length; match and accept by the
            // literal's own length.
            let n = word(value.chars().count())?;
            condition(
                Opcode::MatchStringIc,
                &[s, n],
                vec![Opcode::AcceptN as u32, n],
                vec![Opcode::Fail as u32, e],
            )
        } else {
            condition(
                Opcode::MatchString,
                &[s],
                vec![Opcode::AcceptString as u32, s],
                vec![Opcode::Fail as u32, e],
            )
        }
    }

    fn constant(&mut self, constant: Constant) -> Result<u32, GrammarError> {
        word(self.constants.add(constant))
    }

    fn expectation(&mut self, expectation: Expectation) -> Result<u32, GrammarError> {
        self.constant(Constant::Expectation(expectation))
    }

    fn action_entry(&mut self, code: &str, env: &IndexMap<String, usize>) -> usize {
        self.actions
            .add(ActionEntry::new(code, env.keys().cloned().collect()))
    }
}

/// Every operand is one word. The rule name is filled in by [`Generator::rule`].
fn word(n: usize) -> Result<u32, GrammarError> {
    u32::try_from(n).map_err(|_| GrammarError::CodeTooLarge {
        rule: String::new(),
        value: n,
    })
}

/// `op args.. then_len else_len then.. else..`
fn condition(
    op: Opcode,
    args: &[u32],
    then: Vec<u32>,
    otherwise: Vec<u32>,
) -> Result<Vec<u32>, GrammarError> {
    let mut code = Vec::with_capacity(3 + args.len() + then.len() + otherwise.len());
    code.push(op as u32);
    code.extend_from_slice(args);
    code.push(word(then.len())?);
    code.push(word(otherwise.len())?);
    code.extend(then);
    code.extend(otherwise);
    Ok(code)
}

/// `WHILE_NOT_ERROR body_len body..`
fn repeat(body: Vec<u32>) -> Result<Vec<u32>, GrammarError> {
    let mut code = vec![Opcode::WhileNotError as u32, word(body.len())?];
    code.extend(body);
    Ok(code)
}

/// `CALL f pop argc offsets..`, where `height` is the stack height when the
/// call executes and each label's offset counts down from the top.
fn call(
    f: usize,
    pop: usize,
    env: &IndexMap<String, usize>,
    height: usize,
) -> Result<Vec<u32>, GrammarError> {
    let mut code = vec![
        Opcode::Call as u32,
        word(f)?,
        word(pop)?,
        word(env.len())?,
    ];
    for &slot in env.values() {
        code.push(word(height - 1 - slot)?);
    }
    Ok(code)
}
