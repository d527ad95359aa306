//! The Effects capability: how the VM reaches the outside world.
//!
//! The VM itself never touches stdout. Print opcodes call into an injected
//! [`Effects`] collaborator, which is what lets the production driver and
//! the test driver share one VM implementation. Each implementation owns a
//! [`PrintLoc`] so comma zones stay consistent across calls.

use quill_core::{CommaAction, PrintLoc, Value};
use std::fmt;
use std::io::{self, Write};

/// Failure reported by an Effects implementation.
#[derive(Debug)]
pub enum EffectError {
    Io(io::Error),
    /// A `PRAGMA PRINTED` check did not match the accumulated output.
    PragmaMismatch {
        expected: String,
        got: String,
    },
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectError::Io(e) => write!(f, "print failed: {e}"),
            EffectError::PragmaMismatch { expected, got } => {
                write!(f, "printed output {got:?} does not match expected {expected:?}")
            }
        }
    }
}

impl std::error::Error for EffectError {}

impl From<io::Error> for EffectError {
    fn from(e: io::Error) -> Self {
        EffectError::Io(e)
    }
}

/// Side-effect sink for the VM's builtin opcodes.
///
/// Resource release is `Drop`; implementations hold only owned buffers and
/// writers, so there is nothing to free manually on any exit path.
pub trait Effects {
    /// Format `value` canonically and append it to the output sink.
    fn print(&mut self, value: &Value) -> Result<(), EffectError>;

    /// Advance to the next print zone: newline past the last boundary,
    /// space padding otherwise.
    fn print_comma(&mut self) -> Result<(), EffectError>;

    /// Emit a newline and reset the column.
    fn print_linefeed(&mut self) -> Result<(), EffectError>;

    /// Testing hook: check the output produced so far against `expected`.
    /// Production sinks may treat this as a no-op.
    fn pragma_printed(&mut self, expected: &str) -> Result<(), EffectError>;
}

/// Production sink: writes to any `io::Write`, usually stdout.
#[derive(Debug)]
pub struct StreamEffects<W: Write> {
    out: W,
    loc: PrintLoc,
}

impl StreamEffects<io::Stdout> {
    pub fn stdout() -> Self {
        StreamEffects::new(io::stdout())
    }
}

impl<W: Write> StreamEffects<W> {
    pub fn new(out: W) -> Self {
        StreamEffects {
            out,
            loc: PrintLoc::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), EffectError> {
        self.out.write_all(bytes)?;
        self.loc.observe_all(bytes);
        Ok(())
    }
}

impl<W: Write> Effects for StreamEffects<W> {
    fn print(&mut self, value: &Value) -> Result<(), EffectError> {
        let text = value.format_print();
        self.write(text.as_bytes())
    }

    fn print_comma(&mut self) -> Result<(), EffectError> {
        match self.loc.comma_action() {
            CommaAction::Newline => self.write(b"\n"),
            CommaAction::Spaces(n) => self.write(&b" ".repeat(n)),
        }
    }

    fn print_linefeed(&mut self) -> Result<(), EffectError> {
        self.write(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    fn pragma_printed(&mut self, _expected: &str) -> Result<(), EffectError> {
        Ok(())
    }
}

/// Test sink: accumulates output in memory and verifies PRAGMA checks.
#[derive(Debug, Default)]
pub struct BufferEffects {
    buf: Vec<u8>,
    loc: PrintLoc,
}

impl BufferEffects {
    pub fn new() -> Self {
        BufferEffects::default()
    }

    /// Everything printed so far.
    pub fn output(&self) -> &[u8] {
        &self.buf
    }

    pub fn output_str(&self) -> &str {
        std::str::from_utf8(&self.buf).expect("print output is UTF-8")
    }

    /// Current output column, exposed for byte-accounting assertions.
    pub fn column(&self) -> usize {
        self.loc.column()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.loc.observe_all(bytes);
    }
}

impl Effects for BufferEffects {
    fn print(&mut self, value: &Value) -> Result<(), EffectError> {
        let text = value.format_print();
        self.write(text.as_bytes());
        Ok(())
    }

    fn print_comma(&mut self) -> Result<(), EffectError> {
        match self.loc.comma_action() {
            CommaAction::Newline => self.write(b"\n"),
            CommaAction::Spaces(n) => self.write(&b" ".repeat(n)),
        }
        Ok(())
    }

    fn print_linefeed(&mut self) -> Result<(), EffectError> {
        self.write(b"\n");
        Ok(())
    }

    fn pragma_printed(&mut self, expected: &str) -> Result<(), EffectError> {
        if self.buf == expected.as_bytes() {
            Ok(())
        } else {
            Err(EffectError::PragmaMismatch {
                expected: expected.to_string(),
                got: String::from_utf8_lossy(&self.buf).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_formats_values() {
        let mut fx = BufferEffects::new();
        fx.print(&Value::Integer(7)).unwrap();
        fx.print(&Value::Integer(-2)).unwrap();
        fx.print(&Value::String("ab".into())).unwrap();
        assert_eq!(fx.output_str(), " 7 -2 ab");
    }

    #[test]
    fn test_comma_advances_to_zone() {
        let mut fx = BufferEffects::new();
        fx.print(&Value::String("a".into())).unwrap();
        fx.print_comma().unwrap();
        fx.print(&Value::String("b".into())).unwrap();
        assert_eq!(fx.output_str(), "a             b");
        assert_eq!(fx.column(), 15);
    }

    #[test]
    fn test_comma_wraps_at_last_boundary() {
        let mut fx = BufferEffects::new();
        fx.print(&Value::String("x".repeat(72))).unwrap();
        fx.print_comma().unwrap();
        assert_eq!(fx.column(), 0);
        assert!(fx.output_str().ends_with('\n'));
    }

    #[test]
    fn test_pragma_printed_matches_buffer() {
        let mut fx = BufferEffects::new();
        fx.print(&Value::String("ok".into())).unwrap();
        assert!(fx.pragma_printed("ok").is_ok());
        assert!(fx.pragma_printed("nope").is_err());
    }

    #[test]
    fn test_stream_effects_collects_bytes() {
        let mut fx = StreamEffects::new(Vec::new());
        fx.print(&Value::Integer(1)).unwrap();
        fx.print_linefeed().unwrap();
        assert_eq!(fx.into_inner(), b" 1 \n");
    }
}
