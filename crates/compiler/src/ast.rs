//! Abstract syntax tree for Quill programs.
//!
//! Expressions are untyped here; the code generator infers types bottom-up.
//! Integer literals are stored sign-extended in one `Number` variant and
//! the compiler re-derives INTEGER vs LONG from magnitude. Every node
//! carries the source range it spans, first child to last.

use quill_core::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal, sign-extended.
    Number(i64),
    SingleLit(f32),
    DoubleLit(f64),
    StringLit(String),
    /// Variable reference; the trailing sigil stays in the name.
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    /// `/`, float divide.
    FDiv,
    /// `\`, integer divide.
    IDiv,
    Mod,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Xor,
}

impl BinOp {
    /// Operator spelling for diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::FDiv => "/",
            BinOp::IDiv => "\\",
            BinOp::Mod => "MOD",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
            BinOp::Xor => "XOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
}

/// Separator following a call argument. PRINT gives `,` zone semantics and
/// `;` plain juxtaposition; a trailing separator suppresses the newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSep {
    Comma,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    pub expr: Expr,
    pub sep: Option<ArgSep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Remark(String),
    /// Generic builtin call: `PRINT a, b; c`.
    Call { name: String, args: Vec<CallArg> },
    /// `kw` records whether the LET keyword was written.
    Let {
        kw: bool,
        name: String,
        rhs: Expr,
    },
    /// Block-form header: `IF cond THEN` at end of line.
    If { cond: Expr },
    /// Single-line `IF cond THEN stmt`.
    If1 { cond: Expr, then: Box<Stmt> },
    /// Single-line `IF cond THEN stmt ELSE stmt`.
    If2 {
        cond: Expr,
        then: Box<Stmt>,
        els: Box<Stmt>,
    },
    For {
        var: String,
        from: Expr,
        to: Expr,
    },
    ForStep {
        var: String,
        from: Expr,
        to: Expr,
        step: Expr,
    },
    End,
    EndIf,
    /// `name:` line label.
    JumpLabel(String),
    /// `PRAGMA name args`.
    Pragma { name: String, args: Vec<Expr> },
}
