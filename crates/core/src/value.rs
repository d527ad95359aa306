//! Typed values and the numeric lattice.
//!
//! Quill variables carry their type in a trailing sigil: `%` INTEGER (i16),
//! `&` LONG (i32), `!` SINGLE (f32), `#` DOUBLE (f64), `$` STRING. A name
//! without a sigil is SINGLE, the default numeric type of the dialect.
//!
//! Strings are uniquely owned by whatever holds them. Popping a string off
//! the VM stack moves it to the popper; pushing a copy of a slot clones.
//! Rust ownership makes both properties structural rather than a discipline.

use std::fmt;

/// A runtime value. Exactly five variants, one per sigil.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i16),
    Long(i32),
    Single(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn type_of(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::Single(_) => ValueType::Single,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
        }
    }

    /// Canonical PRINT formatting.
    ///
    /// Numbers use the leading-sign-space convention: non-negative values
    /// get a leading space, every number gets a trailing space. Strings are
    /// emitted verbatim. Float digits are the shortest round-trip form.
    pub fn format_print(&self) -> String {
        match self {
            Value::Integer(n) => signed_field(i64::from(*n).to_string()),
            Value::Long(n) => signed_field(i64::from(*n).to_string()),
            // Floats format at their own width so the digits stay shortest.
            Value::Single(v) => signed_field(normal_single(*v)),
            Value::Double(v) => signed_field(normal_double(*v)),
            Value::String(s) => s.clone(),
        }
    }
}

fn signed_field(digits: String) -> String {
    if digits.starts_with('-') {
        format!("{digits} ")
    } else {
        format!(" {digits} ")
    }
}

// Negative zero would otherwise print as "-0".

fn normal_single(v: f32) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    v.to_string()
}

fn normal_double(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    v.to_string()
}

/// The tag half of [`Value`], ordered along the numeric promotion lattice
/// INTEGER < LONG < SINGLE < DOUBLE. STRING sits outside the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    Integer,
    Long,
    Single,
    Double,
    String,
}

impl ValueType {
    /// Type selected by a sigil character, if it is one.
    pub fn for_sigil(c: char) -> Option<ValueType> {
        match c {
            '%' => Some(ValueType::Integer),
            '&' => Some(ValueType::Long),
            '!' => Some(ValueType::Single),
            '#' => Some(ValueType::Double),
            '$' => Some(ValueType::String),
            _ => None,
        }
    }

    /// Type implied by a variable name: its trailing sigil, or SINGLE when
    /// there is none.
    pub fn of_name(name: &str) -> ValueType {
        name.chars()
            .next_back()
            .and_then(ValueType::for_sigil)
            .unwrap_or(ValueType::Single)
    }

    pub fn is_numeric(self) -> bool {
        self != ValueType::String
    }

    /// Least upper bound in the numeric lattice. `None` when either side is
    /// a string; string combinations are decided by the compiler, not here.
    pub fn join(self, other: ValueType) -> Option<ValueType> {
        if self.is_numeric() && other.is_numeric() {
            Some(self.max(other))
        } else {
            None
        }
    }

    /// The value an unwritten variable of this type reads as.
    pub fn zero(self) -> Value {
        match self {
            ValueType::Integer => Value::Integer(0),
            ValueType::Long => Value::Long(0),
            ValueType::Single => Value::Single(0.0),
            ValueType::Double => Value::Double(0.0),
            ValueType::String => Value::String(String::new()),
        }
    }

    /// Upper-case name used in diagnostics ("cannot coerce INTEGER to STRING").
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Integer => "INTEGER",
            ValueType::Long => "LONG",
            ValueType::Single => "SINGLE",
            ValueType::Double => "DOUBLE",
            ValueType::String => "STRING",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
