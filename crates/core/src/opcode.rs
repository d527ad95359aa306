//! The bytecode instruction set.
//!
//! One opcode byte, then zero or more little-endian operand bytes. Every
//! arithmetic operator is monomorphized per operand type; the compiler
//! inserts coercions so the VM never sees mixed operands. The coercion
//! opcodes themselves form a 4x4 data table over the numeric lattice,
//! consulted by the compiler when raising operands and by tests when
//! checking the matrix stays total.

use crate::value::ValueType;

/// Opcode byte values.
///
/// Conversions named `PROMOTE_*` are exact widenings; `COERCE_*` may round,
/// saturate, or range-check at run time.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Halt = 0x00,

    PushImmInteger = 0x01,
    PushImmLong = 0x02,
    PushImmSingle = 0x03,
    PushImmDouble = 0x04,
    PushImmString = 0x05,
    PushVariable = 0x06,
    Let = 0x07,

    PromoteIntegerLong = 0x10,
    CoerceIntegerSingle = 0x11,
    CoerceIntegerDouble = 0x12,
    CoerceLongInteger = 0x13,
    CoerceLongSingle = 0x14,
    CoerceLongDouble = 0x15,
    CoerceSingleInteger = 0x16,
    CoerceSingleLong = 0x17,
    PromoteSingleDouble = 0x18,
    CoerceDoubleInteger = 0x19,
    CoerceDoubleLong = 0x1a,
    CoerceDoubleSingle = 0x1b,

    AddInteger = 0x20,
    AddLong = 0x21,
    AddSingle = 0x22,
    AddDouble = 0x23,
    AddString = 0x24,
    SubtractInteger = 0x25,
    SubtractLong = 0x26,
    SubtractSingle = 0x27,
    SubtractDouble = 0x28,
    MultiplyInteger = 0x29,
    MultiplyLong = 0x2a,
    MultiplySingle = 0x2b,
    MultiplyDouble = 0x2c,
    FDivideSingle = 0x2d,
    FDivideDouble = 0x2e,
    IDivideInteger = 0x2f,
    IDivideLong = 0x30,
    IDivideSingle = 0x31,
    IDivideDouble = 0x32,
    ModuloInteger = 0x33,
    ModuloLong = 0x34,
    ModuloSingle = 0x35,
    ModuloDouble = 0x36,
    NegateInteger = 0x37,
    NegateLong = 0x38,
    NegateSingle = 0x39,
    NegateDouble = 0x3a,

    BuiltinPrint = 0x40,
    BuiltinPrintComma = 0x41,
    BuiltinPrintLinefeed = 0x42,
    PragmaPrinted = 0x43,
}

impl Op {
    /// Decode a single opcode byte.
    pub fn from_byte(b: u8) -> Option<Op> {
        use Op::*;
        Some(match b {
            0x00 => Halt,
            0x01 => PushImmInteger,
            0x02 => PushImmLong,
            0x03 => PushImmSingle,
            0x04 => PushImmDouble,
            0x05 => PushImmString,
            0x06 => PushVariable,
            0x07 => Let,
            0x10 => PromoteIntegerLong,
            0x11 => CoerceIntegerSingle,
            0x12 => CoerceIntegerDouble,
            0x13 => CoerceLongInteger,
            0x14 => CoerceLongSingle,
            0x15 => CoerceLongDouble,
            0x16 => CoerceSingleInteger,
            0x17 => CoerceSingleLong,
            0x18 => PromoteSingleDouble,
            0x19 => CoerceDoubleInteger,
            0x1a => CoerceDoubleLong,
            0x1b => CoerceDoubleSingle,
            0x20 => AddInteger,
            0x21 => AddLong,
            0x22 => AddSingle,
            0x23 => AddDouble,
            0x24 => AddString,
            0x25 => SubtractInteger,
            0x26 => SubtractLong,
            0x27 => SubtractSingle,
            0x28 => SubtractDouble,
            0x29 => MultiplyInteger,
            0x2a => MultiplyLong,
            0x2b => MultiplySingle,
            0x2c => MultiplyDouble,
            0x2d => FDivideSingle,
            0x2e => FDivideDouble,
            0x2f => IDivideInteger,
            0x30 => IDivideLong,
            0x31 => IDivideSingle,
            0x32 => IDivideDouble,
            0x33 => ModuloInteger,
            0x34 => ModuloLong,
            0x35 => ModuloSingle,
            0x36 => ModuloDouble,
            0x37 => NegateInteger,
            0x38 => NegateLong,
            0x39 => NegateSingle,
            0x3a => NegateDouble,
            0x40 => BuiltinPrint,
            0x41 => BuiltinPrintComma,
            0x42 => BuiltinPrintLinefeed,
            0x43 => PragmaPrinted,
            _ => return None,
        })
    }

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        use Op::*;
        match self {
            Halt => "HALT",
            PushImmInteger => "PUSH_IMM_INTEGER",
            PushImmLong => "PUSH_IMM_LONG",
            PushImmSingle => "PUSH_IMM_SINGLE",
            PushImmDouble => "PUSH_IMM_DOUBLE",
            PushImmString => "PUSH_IMM_STRING",
            PushVariable => "PUSH_VARIABLE",
            Let => "LET",
            PromoteIntegerLong => "PROMOTE_INTEGER_LONG",
            CoerceIntegerSingle => "COERCE_INTEGER_SINGLE",
            CoerceIntegerDouble => "COERCE_INTEGER_DOUBLE",
            CoerceLongInteger => "COERCE_LONG_INTEGER",
            CoerceLongSingle => "COERCE_LONG_SINGLE",
            CoerceLongDouble => "COERCE_LONG_DOUBLE",
            CoerceSingleInteger => "COERCE_SINGLE_INTEGER",
            CoerceSingleLong => "COERCE_SINGLE_LONG",
            PromoteSingleDouble => "PROMOTE_SINGLE_DOUBLE",
            CoerceDoubleInteger => "COERCE_DOUBLE_INTEGER",
            CoerceDoubleLong => "COERCE_DOUBLE_LONG",
            CoerceDoubleSingle => "COERCE_DOUBLE_SINGLE",
            AddInteger => "OPERATOR_ADD_INTEGER",
            AddLong => "OPERATOR_ADD_LONG",
            AddSingle => "OPERATOR_ADD_SINGLE",
            AddDouble => "OPERATOR_ADD_DOUBLE",
            AddString => "OPERATOR_ADD_STRING",
            SubtractInteger => "OPERATOR_SUBTRACT_INTEGER",
            SubtractLong => "OPERATOR_SUBTRACT_LONG",
            SubtractSingle => "OPERATOR_SUBTRACT_SINGLE",
            SubtractDouble => "OPERATOR_SUBTRACT_DOUBLE",
            MultiplyInteger => "OPERATOR_MULTIPLY_INTEGER",
            MultiplyLong => "OPERATOR_MULTIPLY_LONG",
            MultiplySingle => "OPERATOR_MULTIPLY_SINGLE",
            MultiplyDouble => "OPERATOR_MULTIPLY_DOUBLE",
            FDivideSingle => "OPERATOR_FDIVIDE_SINGLE",
            FDivideDouble => "OPERATOR_FDIVIDE_DOUBLE",
            IDivideInteger => "OPERATOR_IDIVIDE_INTEGER",
            IDivideLong => "OPERATOR_IDIVIDE_LONG",
            IDivideSingle => "OPERATOR_IDIVIDE_SINGLE",
            IDivideDouble => "OPERATOR_IDIVIDE_DOUBLE",
            ModuloInteger => "OPERATOR_MODULO_INTEGER",
            ModuloLong => "OPERATOR_MODULO_LONG",
            ModuloSingle => "OPERATOR_MODULO_SINGLE",
            ModuloDouble => "OPERATOR_MODULO_DOUBLE",
            NegateInteger => "OPERATOR_NEGATE_INTEGER",
            NegateLong => "OPERATOR_NEGATE_LONG",
            NegateSingle => "OPERATOR_NEGATE_SINGLE",
            NegateDouble => "OPERATOR_NEGATE_DOUBLE",
            BuiltinPrint => "BUILTIN_PRINT",
            BuiltinPrintComma => "BUILTIN_PRINT_COMMA",
            BuiltinPrintLinefeed => "BUILTIN_PRINT_LINEFEED",
            PragmaPrinted => "PRAGMA_PRINTED",
        }
    }
}

/// Index of a numeric type in the coercion matrix.
fn numeric_index(ty: ValueType) -> Option<usize> {
    match ty {
        ValueType::Integer => Some(0),
        ValueType::Long => Some(1),
        ValueType::Single => Some(2),
        ValueType::Double => Some(3),
        ValueType::String => None,
    }
}

/// Source type x target type, diagonal empty. Indexed INTEGER, LONG,
/// SINGLE, DOUBLE.
pub const NUMERIC_COERCIONS: [[Option<Op>; 4]; 4] = [
    [
        None,
        Some(Op::PromoteIntegerLong),
        Some(Op::CoerceIntegerSingle),
        Some(Op::CoerceIntegerDouble),
    ],
    [
        Some(Op::CoerceLongInteger),
        None,
        Some(Op::CoerceLongSingle),
        Some(Op::CoerceLongDouble),
    ],
    [
        Some(Op::CoerceSingleInteger),
        Some(Op::CoerceSingleLong),
        None,
        Some(Op::PromoteSingleDouble),
    ],
    [
        Some(Op::CoerceDoubleInteger),
        Some(Op::CoerceDoubleLong),
        Some(Op::CoerceDoubleSingle),
        None,
    ],
];

/// Opcode converting top-of-stack from one numeric type to another.
/// `None` when no conversion is needed or either type is a string.
pub fn coercion(from: ValueType, to: ValueType) -> Option<Op> {
    let (f, t) = (numeric_index(from)?, numeric_index(to)?);
    NUMERIC_COERCIONS[f][t]
}
