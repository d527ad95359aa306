//! Quill Compiler Library
//!
//! The front half of the Quill BASIC toolchain: source text to typed
//! bytecode. The pipeline is three synchronous stages, each usable on its
//! own:
//!
//! ```rust
//! use quillc::{CompilerConfig, codegen, parser, tokenizer};
//!
//! let source = "print 1 + 2 * 3\n";
//! let tokens = tokenizer::tokenize(source)?;
//! let stmts = parser::parse(&tokens)?;
//! let bytecode = codegen::compile(&stmts, &CompilerConfig::default())?;
//! # assert!(!bytecode.code.is_empty());
//! # Ok::<(), quillc::CompileError>(())
//! ```
//!
//! or fused with [`compile_source`]. Execution lives in `quill-runtime`;
//! the `quillc` binary wires the two together.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod parser;
pub mod tokenizer;

pub use ast::{Expr, ExprKind, Stmt, StmtKind};
pub use codegen::compile;
pub use config::{CompilerConfig, FloatDivide};
pub use error::CompileError;
pub use parser::parse;
pub use tokenizer::{Token, TokenKind, tokenize};

use quill_core::Bytecode;
use tracing::debug;

/// Run the whole front end over a source buffer.
pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<Bytecode, CompileError> {
    let tokens = tokenizer::tokenize(source)?;
    debug!(tokens = tokens.len(), "tokenized");
    let stmts = parser::parse(&tokens)?;
    debug!(statements = stmts.len(), "parsed");
    codegen::compile(&stmts, config)
}
