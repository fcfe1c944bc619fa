//! The output of grammar compilation.

use crate::action::ActionTable;
use crate::bytecode::Bytecode;
use crate::constant::ConstantTable;

/// One rule after lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub name: String,
    /// Set when the rule was declared with a human-readable name.
    pub display_name: Option<String>,
    pub bytecode: Bytecode,
}

/// Everything a backend needs to run a grammar. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledGrammar {
    /// Rules in declaration order; `RULE r` operands index this list.
    pub rules: Vec<CompiledRule>,
    pub constants: ConstantTable,
    pub actions: ActionTable,
    /// Sorted and deduplicated.
    pub start_rules: Vec<String>,
    /// Used when `parse` is called without a start rule.
    pub default_start_rule: String,
    pub initializer: Option<String>,
}

impl CompiledGrammar {
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.name == name)
    }

    pub fn is_start_rule(&self, name: &str) -> bool {
        self.start_rules
            .binary_search_by(|r| r.as_str().cmp(name))
            .is_ok()
    }

    /// Total bytecode words across all rules.
    pub fn code_size(&self) -> usize {
        self.rules.iter().map(|r| r.bytecode.len()).sum()
    }
}
