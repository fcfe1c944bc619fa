//! Opcode definitions for the parser bytecode.
//!
//! Every opcode and every operand occupies one 32-bit word. Conditional
//! opcodes are followed by their fixed operands, then `then_len` and
//! `else_len`, then the inline then/else blocks. Loop opcodes are followed by
//! `body_len` and the inline body. There are no jumps: control flow is
//! structured and the bytecode is tree-shaped.

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// Stack notation in the variant docs is left to right, top last.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Stack manipulation
    /// `[] -> [consts[c]]`. Operand: constant index of a literal string.
    Push = 0x01,
    /// `[] -> [currPos]`.
    PushCurrPos = 0x02,
    /// `[] -> [""]`.
    PushEmptyString = 0x03,
    /// `[] -> [[]]`. Always a fresh array.
    PushEmptyArray = 0x04,
    /// `[] -> [FAILED]`.
    PushFailed = 0x05,
    /// `[x] -> []`.
    Pop = 0x06,
    /// `[pos] -> []`, `currPos = pos`.
    PopCurrPos = 0x07,
    /// `[x1 .. xn] -> []`. Operand: `n`.
    PopN = 0x08,
    /// `[x y] -> [y]`.
    Nip = 0x09,
    /// `[pos y] -> [y]`, `currPos = pos`.
    NipCurrPos = 0x0A,
    /// `[list x] -> [list]`, `list.push(x)`.
    Append = 0x0B,
    /// `[x1 .. xn] -> [[x1 .. xn]]`. Operand: `n`.
    Wrap = 0x0C,
    /// `[pos x] -> [pos input[pos..currPos]]`.
    Text = 0x0D,

    // Conditions and loops
    /// Branch on the truthiness of the top of stack.
    If = 0x10,
    /// Branch when the top of stack is FAILED.
    IfError = 0x11,
    /// Branch when the top of stack is not FAILED.
    IfNotError = 0x12,
    /// Branch when the array on top is shorter than the bound operand.
    IfArrlenMin = 0x13,
    /// Branch when the array on top has reached the bound operand.
    IfArrlenMax = 0x14,
    /// Run the body while the top of stack is not FAILED.
    WhileNotError = 0x15,

    // Matching
    /// Branch when any character remains at `currPos`.
    MatchAny = 0x20,
    /// Branch when the input at `currPos` starts with a literal constant.
    MatchString = 0x21,
    /// Branch when the next `n` input characters, lower-cased, equal a
    /// lower-cased literal constant. `n` is the literal's own length.
    MatchStringIc = 0x22,
    /// Branch when the character at `currPos` belongs to a class constant.
    MatchClass = 0x23,
    /// `[] -> [input[currPos..currPos + n]]`, `currPos += n`.
    AcceptN = 0x24,
    /// `[] -> [consts[s]]`, `currPos += len(consts[s])`.
    AcceptString = 0x25,
    /// `[] -> [FAILED]`, records expectation `e` unless failures are silenced.
    Fail = 0x26,

    // Calls
    /// `reportedPos = stack[top - p]`. Stack unchanged.
    ReportSavedPos = 0x30,
    /// `reportedPos = currPos`. Stack unchanged.
    ReportCurrPos = 0x31,
    /// Invoke an action, pop `n` slots, push its result.
    Call = 0x32,
    /// Invoke rule `r` and push its result.
    Rule = 0x33,

    // Failure reporting
    /// Increment the silent-fail depth.
    SilentFailsOn = 0x40,
    /// Decrement the silent-fail depth.
    SilentFailsOff = 0x41,
}

/// All valid opcodes, in definition order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 32] = [
    Opcode::Push,
    Opcode::PushCurrPos,
    Opcode::PushEmptyString,
    Opcode::PushEmptyArray,
    Opcode::PushFailed,
    Opcode::Pop,
    Opcode::PopCurrPos,
    Opcode::PopN,
    Opcode::Nip,
    Opcode::NipCurrPos,
    Opcode::Append,
    Opcode::Wrap,
    Opcode::Text,
    Opcode::If,
    Opcode::IfError,
    Opcode::IfNotError,
    Opcode::IfArrlenMin,
    Opcode::IfArrlenMax,
    Opcode::WhileNotError,
    Opcode::MatchAny,
    Opcode::MatchString,
    Opcode::MatchStringIc,
    Opcode::MatchClass,
    Opcode::AcceptN,
    Opcode::AcceptString,
    Opcode::Fail,
    Opcode::ReportSavedPos,
    Opcode::ReportCurrPos,
    Opcode::Call,
    Opcode::Rule,
    Opcode::SilentFailsOn,
    Opcode::SilentFailsOff,
];

/// How the words following an opcode are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `op arg1 .. argN`.
    Plain(usize),
    /// `op arg1 .. argN then_len else_len then.. else..`.
    Condition(usize),
    /// `op body_len body..`.
    Loop,
    /// `op action pop_count argc arg1 .. argc`.
    Call,
}

impl TryFrom<u32> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x00 => Err(DecodeError::IllegalOpcode),

            0x01 => Ok(Opcode::Push),
            0x02 => Ok(Opcode::PushCurrPos),
            0x03 => Ok(Opcode::PushEmptyString),
            0x04 => Ok(Opcode::PushEmptyArray),
            0x05 => Ok(Opcode::PushFailed),
            0x06 => Ok(Opcode::Pop),
            0x07 => Ok(Opcode::PopCurrPos),
            0x08 => Ok(Opcode::PopN),
            0x09 => Ok(Opcode::Nip),
            0x0A => Ok(Opcode::NipCurrPos),
            0x0B => Ok(Opcode::Append),
            0x0C => Ok(Opcode::Wrap),
            0x0D => Ok(Opcode::Text),

            0x10 => Ok(Opcode::If),
            0x11 => Ok(Opcode::IfError),
            0x12 => Ok(Opcode::IfNotError),
            0x13 => Ok(Opcode::IfArrlenMin),
            0x14 => Ok(Opcode::IfArrlenMax),
            0x15 => Ok(Opcode::WhileNotError),

            0x20 => Ok(Opcode::MatchAny),
            0x21 => Ok(Opcode::MatchString),
            0x22 => Ok(Opcode::MatchStringIc),
            0x23 => Ok(Opcode::MatchClass),
            0x24 => Ok(Opcode::AcceptN),
            0x25 => Ok(Opcode::AcceptString),
            0x26 => Ok(Opcode::Fail),

            0x30 => Ok(Opcode::ReportSavedPos),
            0x31 => Ok(Opcode::ReportCurrPos),
            0x32 => Ok(Opcode::Call),
            0x33 => Ok(Opcode::Rule),

            0x40 => Ok(Opcode::SilentFailsOn),
            0x41 => Ok(Opcode::SilentFailsOff),

            other => Err(DecodeError::InvalidOpcode(other)),
        }
    }
}

impl Opcode {
    /// Return the canonical assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "PUSH",
            Opcode::PushCurrPos => "PUSH_CURR_POS",
            Opcode::PushEmptyString => "PUSH_EMPTY_STRING",
            Opcode::PushEmptyArray => "PUSH_EMPTY_ARRAY",
            Opcode::PushFailed => "PUSH_FAILED",
            Opcode::Pop => "POP",
            Opcode::PopCurrPos => "POP_CURR_POS",
            Opcode::PopN => "POP_N",
            Opcode::Nip => "NIP",
            Opcode::NipCurrPos => "NIP_CURR_POS",
            Opcode::Append => "APPEND",
            Opcode::Wrap => "WRAP",
            Opcode::Text => "TEXT",
            Opcode::If => "IF",
            Opcode::IfError => "IF_ERROR",
            Opcode::IfNotError => "IF_NOT_ERROR",
            Opcode::IfArrlenMin => "IF_ARRLEN_MIN",
            Opcode::IfArrlenMax => "IF_ARRLEN_MAX",
            Opcode::WhileNotError => "WHILE_NOT_ERROR",
            Opcode::MatchAny => "MATCH_ANY",
            Opcode::MatchString => "MATCH_STRING",
            Opcode::MatchStringIc => "MATCH_STRING_IC",
            Opcode::MatchClass => "MATCH_CLASS",
            Opcode::AcceptN => "ACCEPT_N",
            Opcode::AcceptString => "ACCEPT_STRING",
            Opcode::Fail => "FAIL",
            Opcode::ReportSavedPos => "REPORT_SAVED_POS",
            Opcode::ReportCurrPos => "REPORT_CURR_POS",
            Opcode::Call => "CALL",
            Opcode::Rule => "RULE",
            Opcode::SilentFailsOn => "SILENT_FAILS_ON",
            Opcode::SilentFailsOff => "SILENT_FAILS_OFF",
        }
    }

    /// Look up an opcode by its mnemonic.
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        ALL_OPCODES.iter().copied().find(|op| op.mnemonic() == s)
    }

    /// Operand layout of this opcode.
    pub fn shape(self) -> Shape {
        match self {
            Opcode::Push
            | Opcode::PopN
            | Opcode::Wrap
            | Opcode::AcceptN
            | Opcode::AcceptString
            | Opcode::Fail
            | Opcode::ReportSavedPos
            | Opcode::Rule => Shape::Plain(1),

            Opcode::PushCurrPos
            | Opcode::PushEmptyString
            | Opcode::PushEmptyArray
            | Opcode::PushFailed
            | Opcode::Pop
            | Opcode::PopCurrPos
            | Opcode::Nip
            | Opcode::NipCurrPos
            | Opcode::Append
            | Opcode::Text
            | Opcode::ReportCurrPos
            | Opcode::SilentFailsOn
            | Opcode::SilentFailsOff => Shape::Plain(0),

            Opcode::If | Opcode::IfError | Opcode::IfNotError | Opcode::MatchAny => {
                Shape::Condition(0)
            }

            Opcode::IfArrlenMin
            | Opcode::IfArrlenMax
            | Opcode::MatchString
            | Opcode::MatchClass => Shape::Condition(1),

            Opcode::MatchStringIc => Shape::Condition(2),

            Opcode::WhileNotError => Shape::Loop,
            Opcode::Call => Shape::Call,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
