//! Compiler configuration.

/// Options for [`compile`](crate::compile).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Rules `parse` may start from. Empty means only the first rule. The
    /// first entry is the default start rule.
    pub allowed_start_rules: Vec<String>,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow parsing to start from `name`, in addition to any already allowed.
    pub fn allow_start_rule(mut self, name: impl Into<String>) -> Self {
        self.allowed_start_rules.push(name.into());
        self
    }
}
