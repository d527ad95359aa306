//! The stack virtual machine.
//!
//! Executes a bytecode stream against a value stack and an indexed slot
//! table. The compiler has already monomorphized every operator and
//! inserted all coercions, so each opcode pops operands of exactly one
//! variant; a mismatch here means broken bytecode, not a user error.
//!
//! Integer arithmetic is checked: overflow raises a runtime error instead
//! of wrapping. Float arithmetic follows IEEE, so `/` can produce
//! infinities, while `\` and MOD range-check their way back into the
//! integer types and can fail.

use crate::effects::{EffectError, Effects};
use crate::error::{RuntimeError, RuntimeErrorKind};
use quill_core::bytecode::{Bytecode, ReadError, Reader};
use quill_core::{ErrorInfo, Op, Value};
use tracing::{debug, trace};

/// Pending failure before it is tagged with a source range.
struct Fail {
    kind: RuntimeErrorKind,
    msg: String,
}

impl Fail {
    fn new(kind: RuntimeErrorKind, msg: impl Into<String>) -> Self {
        Fail {
            kind,
            msg: msg.into(),
        }
    }

    fn overflow(msg: impl Into<String>) -> Self {
        Fail::new(RuntimeErrorKind::Overflow, msg)
    }

    fn type_mismatch(msg: impl Into<String>) -> Self {
        Fail::new(RuntimeErrorKind::TypeMismatch, msg)
    }

    fn bad_bytecode(msg: impl Into<String>) -> Self {
        Fail::new(RuntimeErrorKind::BadBytecode, msg)
    }
}

impl From<ReadError> for Fail {
    fn from(e: ReadError) -> Self {
        Fail::bad_bytecode(e.to_string())
    }
}

impl From<EffectError> for Fail {
    fn from(e: EffectError) -> Self {
        Fail::new(RuntimeErrorKind::Effect, e.to_string())
    }
}

/// Truncate toward zero into i16; out of range saturates to the type MIN.
fn narrow_to_integer(v: f64) -> i16 {
    if v.is_nan() {
        return i16::MIN;
    }
    let t = v.trunc() as i64;
    if (i64::from(i16::MIN)..=i64::from(i16::MAX)).contains(&t) {
        t as i16
    } else {
        i16::MIN
    }
}

/// Truncate toward zero into i32; out of range saturates to the type MIN.
fn narrow_to_long(v: f64) -> i32 {
    if v.is_nan() {
        return i32::MIN;
    }
    let t = v.trunc() as i64;
    if (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&t) {
        t as i32
    } else {
        i32::MIN
    }
}

/// Round half-to-even into i64 for `\` and MOD operands.
fn round_for_idivide(v: f64, what: &str) -> Result<i64, Fail> {
    let r = v.round_ties_even();
    if r.is_nan() || r < i64::MIN as f64 || r > i64::MAX as f64 {
        return Err(Fail::overflow(format!("overflow in {what}")));
    }
    Ok(r as i64)
}

pub struct Vm<E: Effects> {
    effects: E,
    stack: Vec<Value>,
    slots: Vec<Value>,
}

impl<E: Effects> Vm<E> {
    pub fn new(effects: E) -> Self {
        Vm {
            effects,
            stack: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub fn effects(&self) -> &E {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut E {
        &mut self.effects
    }

    pub fn into_effects(self) -> E {
        self.effects
    }

    /// Number of values currently on the stack. Zero after any successful run.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The variable slot table in allocation order.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Execute a program from its first byte to HALT or end-of-stream.
    pub fn run(&mut self, program: &Bytecode) -> Result<(), RuntimeError> {
        debug!(bytes = program.code.len(), "vm run");
        let mut r = Reader::new(&program.code);
        while !r.is_at_end() {
            let at = r.pos();
            let halted = self.step(&mut r).map_err(|fail| RuntimeError {
                kind: fail.kind,
                info: ErrorInfo::new(fail.msg, program.range_at(at)),
            })?;
            if halted {
                break;
            }
        }
        debug!(depth = self.stack.len(), "vm done");
        Ok(())
    }

    /// Decode and execute one instruction. Returns true on HALT.
    fn step(&mut self, r: &mut Reader) -> Result<bool, Fail> {
        let op = r.read_op()?;
        trace!(op = op.mnemonic(), depth = self.stack.len(), "execute");
        match op {
            Op::Halt => return Ok(true),

            Op::PushImmInteger => {
                let v = r.read_i16()?;
                self.stack.push(Value::Integer(v));
            }
            Op::PushImmLong => {
                let v = r.read_i32()?;
                self.stack.push(Value::Long(v));
            }
            Op::PushImmSingle => {
                let v = r.read_f32()?;
                self.stack.push(Value::Single(v));
            }
            Op::PushImmDouble => {
                let v = r.read_f64()?;
                self.stack.push(Value::Double(v));
            }
            Op::PushImmString => {
                let s = r.read_str()?;
                self.stack.push(Value::String(s));
            }

            Op::PushVariable => {
                let slot = r.read_u8()? as usize;
                let value = self
                    .slots
                    .get(slot)
                    .cloned()
                    .ok_or_else(|| Fail::bad_bytecode(format!("read of unallocated slot {slot}")))?;
                self.stack.push(value);
            }
            Op::Let => {
                let slot = r.read_u8()? as usize;
                let value = self.pop()?;
                if slot == self.slots.len() {
                    self.slots.push(value);
                } else if slot < self.slots.len() {
                    // Replacing drops the previous value, freeing any string.
                    self.slots[slot] = value;
                } else {
                    return Err(Fail::bad_bytecode(format!(
                        "slot {slot} allocated out of order"
                    )));
                }
            }

            Op::PromoteIntegerLong => {
                let v = self.pop_integer()?;
                self.stack.push(Value::Long(i32::from(v)));
            }
            Op::CoerceIntegerSingle => {
                let v = self.pop_integer()?;
                self.stack.push(Value::Single(f32::from(v)));
            }
            Op::CoerceIntegerDouble => {
                let v = self.pop_integer()?;
                self.stack.push(Value::Double(f64::from(v)));
            }
            Op::CoerceLongInteger => {
                let v = self.pop_long()?;
                let narrowed = i16::try_from(v)
                    .map_err(|_| Fail::overflow("overflow coercing LONG to INTEGER"))?;
                self.stack.push(Value::Integer(narrowed));
            }
            Op::CoerceLongSingle => {
                let v = self.pop_long()?;
                self.stack.push(Value::Single(v as f32));
            }
            Op::CoerceLongDouble => {
                let v = self.pop_long()?;
                self.stack.push(Value::Double(f64::from(v)));
            }
            Op::CoerceSingleInteger => {
                let v = self.pop_single()?;
                self.stack.push(Value::Integer(narrow_to_integer(f64::from(v))));
            }
            Op::CoerceSingleLong => {
                let v = self.pop_single()?;
                self.stack.push(Value::Long(narrow_to_long(f64::from(v))));
            }
            Op::PromoteSingleDouble => {
                let v = self.pop_single()?;
                self.stack.push(Value::Double(f64::from(v)));
            }
            Op::CoerceDoubleInteger => {
                let v = self.pop_double()?;
                self.stack.push(Value::Integer(narrow_to_integer(v)));
            }
            Op::CoerceDoubleLong => {
                let v = self.pop_double()?;
                self.stack.push(Value::Long(narrow_to_long(v)));
            }
            Op::CoerceDoubleSingle => {
                let v = self.pop_double()?;
                self.stack.push(Value::Single(v as f32));
            }

            Op::AddInteger => {
                let (a, b) = self.pop_two_integers()?;
                let v = a
                    .checked_add(b)
                    .ok_or_else(|| Fail::overflow("overflow in INTEGER addition"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::AddLong => {
                let (a, b) = self.pop_two_longs()?;
                let v = a
                    .checked_add(b)
                    .ok_or_else(|| Fail::overflow("overflow in LONG addition"))?;
                self.stack.push(Value::Long(v));
            }
            Op::AddSingle => {
                let (a, b) = self.pop_two_singles()?;
                self.stack.push(Value::Single(a + b));
            }
            Op::AddDouble => {
                let (a, b) = self.pop_two_doubles()?;
                self.stack.push(Value::Double(a + b));
            }
            Op::AddString => {
                let b = self.pop_string()?;
                let mut a = self.pop_string()?;
                a.push_str(&b);
                self.stack.push(Value::String(a));
            }

            Op::SubtractInteger => {
                let (a, b) = self.pop_two_integers()?;
                let v = a
                    .checked_sub(b)
                    .ok_or_else(|| Fail::overflow("overflow in INTEGER subtraction"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::SubtractLong => {
                let (a, b) = self.pop_two_longs()?;
                let v = a
                    .checked_sub(b)
                    .ok_or_else(|| Fail::overflow("overflow in LONG subtraction"))?;
                self.stack.push(Value::Long(v));
            }
            Op::SubtractSingle => {
                let (a, b) = self.pop_two_singles()?;
                self.stack.push(Value::Single(a - b));
            }
            Op::SubtractDouble => {
                let (a, b) = self.pop_two_doubles()?;
                self.stack.push(Value::Double(a - b));
            }

            Op::MultiplyInteger => {
                let (a, b) = self.pop_two_integers()?;
                let v = a
                    .checked_mul(b)
                    .ok_or_else(|| Fail::overflow("overflow in INTEGER multiplication"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::MultiplyLong => {
                let (a, b) = self.pop_two_longs()?;
                let v = a
                    .checked_mul(b)
                    .ok_or_else(|| Fail::overflow("overflow in LONG multiplication"))?;
                self.stack.push(Value::Long(v));
            }
            Op::MultiplySingle => {
                let (a, b) = self.pop_two_singles()?;
                self.stack.push(Value::Single(a * b));
            }
            Op::MultiplyDouble => {
                let (a, b) = self.pop_two_doubles()?;
                self.stack.push(Value::Double(a * b));
            }

            Op::FDivideSingle => {
                let (a, b) = self.pop_two_singles()?;
                self.stack.push(Value::Single(a / b));
            }
            Op::FDivideDouble => {
                let (a, b) = self.pop_two_doubles()?;
                self.stack.push(Value::Double(a / b));
            }

            Op::IDivideInteger => {
                let (a, b) = self.pop_two_integers()?;
                if b == 0 {
                    return Err(Fail::new(RuntimeErrorKind::DivisionByZero, "division by zero"));
                }
                let v = a
                    .checked_div(b)
                    .ok_or_else(|| Fail::overflow("overflow in integer division"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::IDivideLong => {
                let (a, b) = self.pop_two_longs()?;
                self.stack.push(Value::Long(idivide_i64(i64::from(a), i64::from(b))?));
            }
            Op::IDivideSingle => {
                let (a, b) = self.pop_two_singles()?;
                let a = round_for_idivide(f64::from(a), "integer division")?;
                let b = round_for_idivide(f64::from(b), "integer division")?;
                self.stack.push(Value::Long(idivide_i64(a, b)?));
            }
            Op::IDivideDouble => {
                let (a, b) = self.pop_two_doubles()?;
                let a = round_for_idivide(a, "integer division")?;
                let b = round_for_idivide(b, "integer division")?;
                self.stack.push(Value::Long(idivide_i64(a, b)?));
            }

            Op::ModuloInteger => {
                let (a, b) = self.pop_two_integers()?;
                if b == 0 {
                    return Err(Fail::new(RuntimeErrorKind::DivisionByZero, "division by zero"));
                }
                let v = a
                    .checked_rem(b)
                    .ok_or_else(|| Fail::overflow("overflow in MOD"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::ModuloLong => {
                let (a, b) = self.pop_two_longs()?;
                self.stack.push(Value::Long(modulo_i64(i64::from(a), i64::from(b))?));
            }
            Op::ModuloSingle => {
                let (a, b) = self.pop_two_singles()?;
                let a = round_for_idivide(f64::from(a), "MOD")?;
                let b = round_for_idivide(f64::from(b), "MOD")?;
                self.stack.push(Value::Long(modulo_i64(a, b)?));
            }
            Op::ModuloDouble => {
                let (a, b) = self.pop_two_doubles()?;
                let a = round_for_idivide(a, "MOD")?;
                let b = round_for_idivide(b, "MOD")?;
                self.stack.push(Value::Long(modulo_i64(a, b)?));
            }

            Op::NegateInteger => {
                let v = self.pop_integer()?;
                let v = v
                    .checked_neg()
                    .ok_or_else(|| Fail::overflow("overflow in INTEGER negation"))?;
                self.stack.push(Value::Integer(v));
            }
            Op::NegateLong => {
                let v = self.pop_long()?;
                let v = v
                    .checked_neg()
                    .ok_or_else(|| Fail::overflow("overflow in LONG negation"))?;
                self.stack.push(Value::Long(v));
            }
            Op::NegateSingle => {
                let v = self.pop_single()?;
                self.stack.push(Value::Single(-v));
            }
            Op::NegateDouble => {
                let v = self.pop_double()?;
                self.stack.push(Value::Double(-v));
            }

            Op::BuiltinPrint => {
                let value = self.pop()?;
                self.effects.print(&value)?;
            }
            Op::BuiltinPrintComma => {
                self.effects.print_comma()?;
            }
            Op::BuiltinPrintLinefeed => {
                self.effects.print_linefeed()?;
            }
            Op::PragmaPrinted => {
                let expected = r.read_str()?;
                self.effects.pragma_printed(&expected)?;
            }
        }
        Ok(false)
    }

    fn pop(&mut self) -> Result<Value, Fail> {
        self.stack
            .pop()
            .ok_or_else(|| Fail::bad_bytecode("stack underflow"))
    }

    fn pop_integer(&mut self) -> Result<i16, Fail> {
        match self.pop()? {
            Value::Integer(v) => Ok(v),
            other => Err(Fail::type_mismatch(format!(
                "expected INTEGER on stack, got {}",
                other.type_of()
            ))),
        }
    }

    fn pop_long(&mut self) -> Result<i32, Fail> {
        match self.pop()? {
            Value::Long(v) => Ok(v),
            other => Err(Fail::type_mismatch(format!(
                "expected LONG on stack, got {}",
                other.type_of()
            ))),
        }
    }

    fn pop_single(&mut self) -> Result<f32, Fail> {
        match self.pop()? {
            Value::Single(v) => Ok(v),
            other => Err(Fail::type_mismatch(format!(
                "expected SINGLE on stack, got {}",
                other.type_of()
            ))),
        }
    }

    fn pop_double(&mut self) -> Result<f64, Fail> {
        match self.pop()? {
            Value::Double(v) => Ok(v),
            other => Err(Fail::type_mismatch(format!(
                "expected DOUBLE on stack, got {}",
                other.type_of()
            ))),
        }
    }

    fn pop_string(&mut self) -> Result<String, Fail> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            other => Err(Fail::type_mismatch(format!(
                "expected STRING on stack, got {}",
                other.type_of()
            ))),
        }
    }

    fn pop_two_integers(&mut self) -> Result<(i16, i16), Fail> {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        Ok((a, b))
    }

    fn pop_two_longs(&mut self) -> Result<(i32, i32), Fail> {
        let b = self.pop_long()?;
        let a = self.pop_long()?;
        Ok((a, b))
    }

    fn pop_two_singles(&mut self) -> Result<(f32, f32), Fail> {
        let b = self.pop_single()?;
        let a = self.pop_single()?;
        Ok((a, b))
    }

    fn pop_two_doubles(&mut self) -> Result<(f64, f64), Fail> {
        let b = self.pop_double()?;
        let a = self.pop_double()?;
        Ok((a, b))
    }
}

/// Truncating division on rounded operands, range-checked back into LONG.
fn idivide_i64(a: i64, b: i64) -> Result<i32, Fail> {
    if b == 0 {
        return Err(Fail::new(RuntimeErrorKind::DivisionByZero, "division by zero"));
    }
    i32::try_from(a / b).map_err(|_| Fail::overflow("overflow in integer division"))
}

fn modulo_i64(a: i64, b: i64) -> Result<i32, Fail> {
    if b == 0 {
        return Err(Fail::new(RuntimeErrorKind::DivisionByZero, "division by zero"));
    }
    i32::try_from(a % b).map_err(|_| Fail::overflow("overflow in MOD"))
}
