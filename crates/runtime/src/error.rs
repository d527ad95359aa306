//! Runtime error reporting.
//!
//! Every failure during execution is fatal to the run and carries an
//! [`ErrorInfo`] whose range comes from the bytecode's offset-to-range
//! table, so the embedder can point at the statement that failed.

use quill_core::ErrorInfo;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Checked integer arithmetic or a range-checked narrowing failed.
    Overflow,
    /// Integer division or MOD with a zero divisor.
    DivisionByZero,
    /// Operand variant did not match the monomorphized opcode. Unreachable
    /// for compiler-produced bytecode.
    TypeMismatch,
    /// Truncated stream, unknown opcode, bad string operand, stack
    /// underflow, out-of-order slot. Unreachable for compiler output.
    BadBytecode,
    /// The Effects collaborator reported a failure.
    Effect,
}

impl RuntimeErrorKind {
    fn label(self) -> &'static str {
        match self {
            RuntimeErrorKind::Overflow => "overflow",
            RuntimeErrorKind::DivisionByZero => "division by zero",
            RuntimeErrorKind::TypeMismatch => "type mismatch",
            RuntimeErrorKind::BadBytecode => "bad bytecode",
            RuntimeErrorKind::Effect => "effect",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub info: ErrorInfo,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error ({}): {}", self.kind.label(), self.info)
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::Range;

    #[test]
    fn test_display_includes_kind_and_range() {
        let err = RuntimeError {
            kind: RuntimeErrorKind::Overflow,
            info: ErrorInfo::new("overflow coercing LONG to INTEGER", Some(Range::at(4, 1))),
        };
        assert_eq!(
            err.to_string(),
            "runtime error (overflow): overflow coercing LONG to INTEGER at 4:1"
        );
    }
}
