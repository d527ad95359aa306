//! Quill Core: shared vocabulary between the compiler and the VM.
//!
//! Everything both ends of the pipeline need to agree on lives here:
//!
//! - `value`: the five-variant typed [`Value`] and the numeric lattice
//! - `opcode`: the instruction set and the coercion matrix
//! - `bytecode`: instruction stream, decode cursor, disassembler
//! - `printloc`: column tracking for the zone-based PRINT model
//! - `error`: source ranges and the [`ErrorInfo`] diagnostic record
//!
//! The crate has no dependencies and no I/O; side effects belong to the
//! runtime's `Effects` implementations.

pub mod bytecode;
pub mod error;
pub mod opcode;
pub mod printloc;
pub mod value;

pub use bytecode::{Bytecode, ReadError, Reader, disassemble};
pub use error::{ErrorInfo, Loc, Range};
pub use opcode::{NUMERIC_COERCIONS, Op, coercion};
pub use printloc::{CommaAction, LAST_ZONE_BOUNDARY, PrintLoc, ZONE_WIDTH};
pub use value::{Value, ValueType};
