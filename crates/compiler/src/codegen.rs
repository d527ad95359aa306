//! Type-aware code generation: statement list to flat bytecode.
//!
//! Variables live in u8-indexed slots, one per distinct sigil-qualified
//! name (case-folded), allocated in order of first appearance. A slot's
//! type is fixed by the sigil at first use and never changes; every LET
//! coerces its right-hand side to the slot type.
//!
//! Expression types are inferred bottom-up. Numeric operands are raised to
//! the lattice join with explicit coercion opcodes, inserted on each branch
//! while that branch's value is still on top of the stack, and the operator
//! itself is emitted monomorphized at the join type. The VM never sees
//! mixed operands.
//!
//! Reading a variable before it is written allocates its slot and emits a
//! typed zero store first, so the slot table always grows one slot at a
//! time in execution order.

use crate::ast::{ArgSep, BinOp, CallArg, Expr, ExprKind, Stmt, StmtKind, UnOp};
use crate::config::{CompilerConfig, FloatDivide};
use crate::error::CompileError;
use quill_core::{Bytecode, Op, Range, ValueType, coercion};
use std::collections::HashMap;
use tracing::debug;

/// Compile a parsed program.
pub fn compile(stmts: &[Stmt], config: &CompilerConfig) -> Result<Bytecode, CompileError> {
    let mut cg = CodeGen {
        config,
        slots: Vec::new(),
        by_name: HashMap::new(),
        out: Bytecode::new(),
    };
    for stmt in stmts {
        cg.gen_stmt(stmt)?;
    }
    debug!(
        bytes = cg.out.code.len(),
        slots = cg.slots.len(),
        "compiled"
    );
    Ok(cg.out)
}

/// Operand and result types of a binary operator after join.
struct BinTypes {
    operand: ValueType,
    result: ValueType,
}

struct CodeGen<'a> {
    config: &'a CompilerConfig,
    /// Slot types in allocation order.
    slots: Vec<ValueType>,
    /// Case-folded sigil-qualified name to slot index.
    by_name: HashMap<String, u8>,
    out: Bytecode,
}

impl<'a> CodeGen<'a> {
    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.out.mark(stmt.range);
        match &stmt.kind {
            StmtKind::Remark(_) | StmtKind::JumpLabel(_) => Ok(()),
            StmtKind::End => {
                self.out.emit(Op::Halt);
                Ok(())
            }
            StmtKind::If { .. } | StmtKind::If1 { .. } | StmtKind::If2 { .. } => {
                Err(CompileError::Unsupported {
                    what: "control flow (IF)".into(),
                    range: stmt.range,
                })
            }
            StmtKind::EndIf => Err(CompileError::Unsupported {
                what: "control flow (END IF)".into(),
                range: stmt.range,
            }),
            StmtKind::For { .. } | StmtKind::ForStep { .. } => Err(CompileError::Unsupported {
                what: "control flow (FOR)".into(),
                range: stmt.range,
            }),
            StmtKind::Let { name, rhs, .. } => self.gen_let(name, rhs, stmt.range),
            StmtKind::Call { name, args } => {
                if name.eq_ignore_ascii_case("print") {
                    self.gen_print(args)
                } else {
                    Err(CompileError::UnknownStatement {
                        name: name.clone(),
                        range: stmt.range,
                    })
                }
            }
            StmtKind::Pragma { name, args } => self.gen_pragma(name, args, stmt.range),
        }
    }

    fn gen_let(&mut self, name: &str, rhs: &Expr, range: Range) -> Result<(), CompileError> {
        let rhs_ty = self.infer(rhs)?;
        let slot_ty = self.lookup_type(name);
        if (slot_ty == ValueType::String) != (rhs_ty == ValueType::String) {
            let msg = if slot_ty == ValueType::String {
                format!("cannot coerce {rhs_ty} to STRING")
            } else {
                format!("cannot coerce STRING to {slot_ty}")
            };
            return Err(CompileError::TypeMismatch { msg, range });
        }
        let actual = self.gen_expr(rhs)?;
        // Allocate after the RHS so any slots it autovivifies get lower
        // indices and the table still grows one at a time at run time.
        let (slot, slot_ty) = self.slot_for(name, range)?;
        self.emit_coercion(actual, slot_ty, rhs.range)?;
        self.out.emit(Op::Let);
        self.out.emit_u8(slot);
        Ok(())
    }

    fn gen_print(&mut self, args: &[CallArg]) -> Result<(), CompileError> {
        for arg in args {
            self.gen_expr(&arg.expr)?;
            self.out.emit(Op::BuiltinPrint);
            if arg.sep == Some(ArgSep::Comma) {
                self.out.emit(Op::BuiltinPrintComma);
            }
        }
        // A trailing separator suppresses the newline.
        if args.last().is_none_or(|arg| arg.sep.is_none()) {
            self.out.emit(Op::BuiltinPrintLinefeed);
        }
        Ok(())
    }

    fn gen_pragma(&mut self, name: &str, args: &[Expr], range: Range) -> Result<(), CompileError> {
        if name.eq_ignore_ascii_case("printed") {
            if let [arg] = args {
                if let ExprKind::StringLit(expected) = &arg.kind {
                    if expected.len() > u16::MAX as usize {
                        return Err(CompileError::StringTooLong { range: arg.range });
                    }
                    self.out.emit(Op::PragmaPrinted);
                    self.out.emit_str(expected);
                    return Ok(());
                }
            }
            return Err(CompileError::TypeMismatch {
                msg: "PRAGMA PRINTED expects one string literal".into(),
                range,
            });
        }
        Err(CompileError::UnknownPragma {
            name: name.to_string(),
            range,
        })
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// Type a name would have, existing slot or not.
    fn lookup_type(&self, name: &str) -> ValueType {
        match self.by_name.get(&name.to_ascii_uppercase()) {
            Some(&idx) => self.slots[idx as usize],
            None => ValueType::of_name(name),
        }
    }

    /// Slot index for a name, allocating on first use.
    fn slot_for(&mut self, name: &str, range: Range) -> Result<(u8, ValueType), CompileError> {
        let key = name.to_ascii_uppercase();
        if let Some(&idx) = self.by_name.get(&key) {
            return Ok((idx, self.slots[idx as usize]));
        }
        let idx = u8::try_from(self.slots.len())
            .map_err(|_| CompileError::TooManyVariables { range })?;
        let ty = ValueType::of_name(name);
        self.by_name.insert(key, idx);
        self.slots.push(ty);
        Ok((idx, ty))
    }

    /// Push a variable, materializing the typed zero on first read.
    fn gen_var_read(&mut self, name: &str, range: Range) -> Result<ValueType, CompileError> {
        let known = self.by_name.contains_key(&name.to_ascii_uppercase());
        let (idx, ty) = self.slot_for(name, range)?;
        if !known {
            self.emit_zero(ty);
            self.out.emit(Op::Let);
            self.out.emit_u8(idx);
        }
        self.out.emit(Op::PushVariable);
        self.out.emit_u8(idx);
        Ok(ty)
    }

    fn emit_zero(&mut self, ty: ValueType) {
        match ty {
            ValueType::Integer => {
                self.out.emit(Op::PushImmInteger);
                self.out.emit_i16(0);
            }
            ValueType::Long => {
                self.out.emit(Op::PushImmLong);
                self.out.emit_i32(0);
            }
            ValueType::Single => {
                self.out.emit(Op::PushImmSingle);
                self.out.emit_f32(0.0);
            }
            ValueType::Double => {
                self.out.emit(Op::PushImmDouble);
                self.out.emit_f64(0.0);
            }
            ValueType::String => {
                self.out.emit(Op::PushImmString);
                self.out.emit_str("");
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Bottom-up type of an expression, without emitting code.
    fn infer(&self, e: &Expr) -> Result<ValueType, CompileError> {
        match &e.kind {
            ExprKind::Number(n) => Ok(if i16::try_from(*n).is_ok() {
                ValueType::Integer
            } else {
                ValueType::Long
            }),
            ExprKind::SingleLit(_) => Ok(ValueType::Single),
            ExprKind::DoubleLit(_) => Ok(ValueType::Double),
            ExprKind::StringLit(_) => Ok(ValueType::String),
            ExprKind::Var(name) => Ok(self.lookup_type(name)),
            ExprKind::Unary { operand, op: UnOp::Neg } => {
                let ty = self.infer(operand)?;
                if ty == ValueType::String {
                    Err(CompileError::TypeMismatch {
                        msg: "cannot negate STRING".into(),
                        range: e.range,
                    })
                } else {
                    Ok(ty)
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.infer_binary(*op, lhs, rhs, e.range).map(|t| t.result)
            }
        }
    }

    fn infer_binary(
        &self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        range: Range,
    ) -> Result<BinTypes, CompileError> {
        let lt = self.infer(lhs)?;
        let rt = self.infer(rhs)?;

        if lt == ValueType::String || rt == ValueType::String {
            if lt == rt {
                if op == BinOp::Add {
                    return Ok(BinTypes {
                        operand: ValueType::String,
                        result: ValueType::String,
                    });
                }
                return Err(CompileError::TypeMismatch {
                    msg: format!("operator {} is not defined for STRING", op.symbol()),
                    range,
                });
            }
            let numeric = if lt == ValueType::String { rt } else { lt };
            return Err(CompileError::TypeMismatch {
                msg: format!("cannot coerce {numeric} to STRING"),
                range,
            });
        }

        let join = lt.join(rt).ok_or_else(|| CompileError::Internal {
            msg: format!("no join for {lt} and {rt}"),
            range,
        })?;
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul => Ok(BinTypes {
                operand: join,
                result: join,
            }),
            BinOp::FDiv => {
                // Never yields an integer type. Below SINGLE the result is
                // SINGLE unless configured up to DOUBLE.
                let operand = if join >= ValueType::Single {
                    join
                } else {
                    match self.config.float_divide {
                        FloatDivide::Single => ValueType::Single,
                        FloatDivide::Double => ValueType::Double,
                    }
                };
                Ok(BinTypes {
                    operand,
                    result: operand,
                })
            }
            BinOp::IDiv | BinOp::Mod => Ok(BinTypes {
                operand: join,
                result: if join == ValueType::Integer {
                    ValueType::Integer
                } else {
                    ValueType::Long
                },
            }),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                Err(CompileError::Unsupported {
                    what: format!("comparison operator `{}`", op.symbol()),
                    range,
                })
            }
            BinOp::And | BinOp::Or | BinOp::Xor => Err(CompileError::Unsupported {
                what: format!("logical operator {}", op.symbol()),
                range,
            }),
        }
    }

    /// Emit an expression; returns the type left on the stack.
    fn gen_expr(&mut self, e: &Expr) -> Result<ValueType, CompileError> {
        match &e.kind {
            ExprKind::Number(n) => {
                if let Ok(v) = i16::try_from(*n) {
                    self.out.emit(Op::PushImmInteger);
                    self.out.emit_i16(v);
                    Ok(ValueType::Integer)
                } else {
                    let v = i32::try_from(*n).map_err(|_| CompileError::Internal {
                        msg: format!("literal {n} exceeds LONG"),
                        range: e.range,
                    })?;
                    self.out.emit(Op::PushImmLong);
                    self.out.emit_i32(v);
                    Ok(ValueType::Long)
                }
            }
            ExprKind::SingleLit(v) => {
                self.out.emit(Op::PushImmSingle);
                self.out.emit_f32(*v);
                Ok(ValueType::Single)
            }
            ExprKind::DoubleLit(v) => {
                self.out.emit(Op::PushImmDouble);
                self.out.emit_f64(*v);
                Ok(ValueType::Double)
            }
            ExprKind::StringLit(s) => {
                if s.len() > u16::MAX as usize {
                    return Err(CompileError::StringTooLong { range: e.range });
                }
                self.out.emit(Op::PushImmString);
                self.out.emit_str(s);
                Ok(ValueType::String)
            }
            ExprKind::Var(name) => self.gen_var_read(name, e.range),
            ExprKind::Unary { op: UnOp::Neg, operand } => {
                let ty = self.gen_expr(operand)?;
                let opcode = match ty {
                    ValueType::Integer => Op::NegateInteger,
                    ValueType::Long => Op::NegateLong,
                    ValueType::Single => Op::NegateSingle,
                    ValueType::Double => Op::NegateDouble,
                    ValueType::String => {
                        return Err(CompileError::TypeMismatch {
                            msg: "cannot negate STRING".into(),
                            range: e.range,
                        });
                    }
                };
                self.out.emit(opcode);
                Ok(ty)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let types = self.infer_binary(*op, lhs, rhs, e.range)?;
                let lt = self.gen_expr(lhs)?;
                self.emit_coercion(lt, types.operand, lhs.range)?;
                let rt = self.gen_expr(rhs)?;
                self.emit_coercion(rt, types.operand, rhs.range)?;
                let opcode = arith_op(*op, types.operand).ok_or_else(|| CompileError::Internal {
                    msg: format!("no opcode for {} at {}", op.symbol(), types.operand),
                    range: e.range,
                })?;
                self.out.emit(opcode);
                Ok(types.result)
            }
        }
    }

    fn emit_coercion(
        &mut self,
        from: ValueType,
        to: ValueType,
        range: Range,
    ) -> Result<(), CompileError> {
        if from == to {
            return Ok(());
        }
        match coercion(from, to) {
            Some(op) => {
                self.out.emit(op);
                Ok(())
            }
            None => Err(CompileError::Internal {
                msg: format!("no coercion from {from} to {to}"),
                range,
            }),
        }
    }
}

/// Monomorphized opcode for an operator at an operand type.
fn arith_op(op: BinOp, ty: ValueType) -> Option<Op> {
    use ValueType::*;
    Some(match (op, ty) {
        (BinOp::Add, Integer) => Op::AddInteger,
        (BinOp::Add, Long) => Op::AddLong,
        (BinOp::Add, Single) => Op::AddSingle,
        (BinOp::Add, Double) => Op::AddDouble,
        (BinOp::Add, String) => Op::AddString,
        (BinOp::Sub, Integer) => Op::SubtractInteger,
        (BinOp::Sub, Long) => Op::SubtractLong,
        (BinOp::Sub, Single) => Op::SubtractSingle,
        (BinOp::Sub, Double) => Op::SubtractDouble,
        (BinOp::Mul, Integer) => Op::MultiplyInteger,
        (BinOp::Mul, Long) => Op::MultiplyLong,
        (BinOp::Mul, Single) => Op::MultiplySingle,
        (BinOp::Mul, Double) => Op::MultiplyDouble,
        (BinOp::FDiv, Single) => Op::FDivideSingle,
        (BinOp::FDiv, Double) => Op::FDivideDouble,
        (BinOp::IDiv, Integer) => Op::IDivideInteger,
        (BinOp::IDiv, Long) => Op::IDivideLong,
        (BinOp::IDiv, Single) => Op::IDivideSingle,
        (BinOp::IDiv, Double) => Op::IDivideDouble,
        (BinOp::Mod, Integer) => Op::ModuloInteger,
        (BinOp::Mod, Long) => Op::ModuloLong,
        (BinOp::Mod, Single) => Op::ModuloSingle,
        (BinOp::Mod, Double) => Op::ModuloDouble,
        _ => return None,
    })
}
