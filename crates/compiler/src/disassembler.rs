//! Disassembler: compiled grammar → canonical text.
//!
//! One instruction per line. Inline blocks are indented two spaces under a
//! `then`, `else` or `do` marker; an empty `else` block is omitted.

use std::fmt::Write;
use std::ops::Range;

use pegcode_common::{BlockIter, CompiledGrammar, DecodeError, Instruction};

/// Render the tables and every rule's bytecode.
pub fn disassemble(grammar: &CompiledGrammar) -> Result<String, DecodeError> {
    let mut out = String::new();

    if !grammar.constants.is_empty() {
        out.push_str("constants:\n");
        for (i, c) in grammar.constants.iter().enumerate() {
            let _ = writeln!(out, "  {i}: {c}");
        }
    }
    if !grammar.actions.is_empty() {
        out.push_str("actions:\n");
        for (i, a) in grammar.actions.iter().enumerate() {
            let _ = writeln!(out, "  {i}: {a}");
        }
    }

    for (i, rule) in grammar.rules.iter().enumerate() {
        let _ = write!(out, "rule {i} {}", rule.name);
        if let Some(display) = &rule.display_name {
            let _ = write!(out, " {}", pegcode_common::constant::quote(display));
        }
        out.push('\n');
        let code = &rule.bytecode.code;
        block(&mut out, code, 0..code.len(), 1)?;
    }
    Ok(out)
}

/// Render one rule's words without tables.
pub fn disassemble_code(code: &[u32]) -> Result<String, DecodeError> {
    let mut out = String::new();
    block(&mut out, code, 0..code.len(), 0)?;
    Ok(out)
}

fn block(out: &mut String, code: &[u32], range: Range<usize>, depth: usize) -> Result<(), DecodeError> {
    for item in BlockIter::new(code, range) {
        let (_, instr) = item?;
        line(out, depth, &operands(code, &instr));
        match &instr {
            Instruction::WhileNotError { body } => {
                line(out, depth, "do");
                block(out, code, body.clone(), depth + 1)?;
            }
            other => {
                if let Some((then, otherwise)) = other.branches() {
                    line(out, depth, "then");
                    block(out, code, then, depth + 1)?;
                    if !otherwise.is_empty() {
                        line(out, depth, "else");
                        block(out, code, otherwise, depth + 1)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn line(out: &mut String, depth: usize, text: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(text);
    out.push('\n');
}

/// Mnemonic plus fixed operands. Block lengths are implied by indentation.
fn operands(code: &[u32], instr: &Instruction) -> String {
    let m = instr.opcode().mnemonic();
    match instr {
        Instruction::Push { constant: n }
        | Instruction::PopN { n }
        | Instruction::Wrap { n }
        | Instruction::AcceptN { n }
        | Instruction::AcceptString { constant: n }
        | Instruction::Fail { expectation: n }
        | Instruction::ReportSavedPos { offset: n }
        | Instruction::Rule { index: n }
        | Instruction::IfArrlenMin { bound: n, .. }
        | Instruction::IfArrlenMax { bound: n, .. }
        | Instruction::MatchString { constant: n, .. }
        | Instruction::MatchClass { constant: n, .. } => format!("{m} {n}"),
        Instruction::MatchStringIc { constant, len, .. } => format!("{m} {constant} {len}"),
        Instruction::Call {
            action,
            pop,
            params,
        } => {
            let args: Vec<String> = code[params.clone()].iter().map(|p| p.to_string()).collect();
            format!("{m} {action} {pop} [{}]", args.join(" "))
        }
        _ => m.to_string(),
    }
}
