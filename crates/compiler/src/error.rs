//! Compile-time error types.
//!
//! One enum covers all three front-end stages. Each variant keeps the range
//! of the offending source so the CLI (and the embedder) can point at it;
//! `UnexpectedEnd` is the one failure with nowhere left to point.

use quill_core::{ErrorInfo, Range};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    // Tokenizer
    UnterminatedString { range: Range },
    InvalidNumber { range: Range },
    UnknownCharacter { ch: char, range: Range },

    // Parser
    UnexpectedToken { found: String, range: Range },
    UnexpectedEnd,
    ExpectedTerminator { found: String, range: Range },

    // Code generation
    TypeMismatch { msg: String, range: Range },
    Unsupported { what: String, range: Range },
    UnknownStatement { name: String, range: Range },
    UnknownPragma { name: String, range: Range },
    TooManyVariables { range: Range },
    StringTooLong { range: Range },
    Internal { msg: String, range: Range },
}

impl CompileError {
    pub fn range(&self) -> Option<Range> {
        match self {
            CompileError::UnterminatedString { range }
            | CompileError::InvalidNumber { range }
            | CompileError::UnknownCharacter { range, .. }
            | CompileError::UnexpectedToken { range, .. }
            | CompileError::ExpectedTerminator { range, .. }
            | CompileError::TypeMismatch { range, .. }
            | CompileError::Unsupported { range, .. }
            | CompileError::UnknownStatement { range, .. }
            | CompileError::UnknownPragma { range, .. }
            | CompileError::TooManyVariables { range }
            | CompileError::StringTooLong { range }
            | CompileError::Internal { range, .. } => Some(*range),
            CompileError::UnexpectedEnd => None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnterminatedString { .. } => {
                write!(f, "unterminated string literal")
            }
            CompileError::InvalidNumber { .. } => write!(f, "invalid numeric literal"),
            CompileError::UnknownCharacter { ch, .. } => {
                write!(f, "unknown character {ch:?}")
            }
            CompileError::UnexpectedToken { found, .. } => {
                write!(f, "unexpected {found}")
            }
            CompileError::UnexpectedEnd => write!(f, "unexpected end of input"),
            CompileError::ExpectedTerminator { found, .. } => {
                write!(f, "expected end of statement, found {found}")
            }
            CompileError::TypeMismatch { msg, .. } => write!(f, "{msg}"),
            CompileError::Unsupported { what, .. } => {
                write!(f, "{what} is not supported")
            }
            CompileError::UnknownStatement { name, .. } => {
                write!(f, "unknown statement `{name}`")
            }
            CompileError::UnknownPragma { name, .. } => {
                write!(f, "unknown pragma `{name}`")
            }
            CompileError::TooManyVariables { .. } => {
                write!(f, "too many variables (at most 256 slots)")
            }
            CompileError::StringTooLong { .. } => {
                write!(f, "string literal exceeds 65535 bytes")
            }
            CompileError::Internal { msg, .. } => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<CompileError> for ErrorInfo {
    fn from(e: CompileError) -> Self {
        ErrorInfo::new(e.to_string(), e.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_conversion_keeps_range() {
        let err = CompileError::TypeMismatch {
            msg: "cannot coerce INTEGER to STRING".into(),
            range: Range::at(2, 7),
        };
        let info = ErrorInfo::from(err);
        assert_eq!(info.msg, "cannot coerce INTEGER to STRING");
        assert_eq!(info.range, Some(Range::at(2, 7)));
    }

    #[test]
    fn test_unexpected_end_has_no_range() {
        assert_eq!(CompileError::UnexpectedEnd.range(), None);
    }
}
