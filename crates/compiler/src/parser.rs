//! Recursive-descent parser: token stream to statement list.
//!
//! Statements are separated by line feeds or `:`. The parser performs no
//! type checking and never mutates the token list; it only builds trees.
//!
//! Precedence, tightest first: unary minus; `*` `/` `\` MOD; `+` `-`;
//! relational; AND; OR and XOR. All binary operators are left-associative.
//!
//! A remark sitting at the end of a statement line is deferred: it becomes
//! its own `Remark` statement emitted after the statement it trailed, so
//! the statement's range stays clean while source order is preserved.

use crate::ast::{ArgSep, BinOp, CallArg, Expr, ExprKind, Stmt, StmtKind, UnOp};
use crate::error::CompileError;
use crate::tokenizer::{Token, TokenKind};
use quill_core::Range;

/// Parse a full program.
pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, CompileError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut out = Vec::new();

    loop {
        while matches!(
            parser.peek_kind(),
            Some(TokenKind::Linefeed) | Some(TokenKind::Colon)
        ) {
            parser.pos += 1;
        }
        let Some(kind) = parser.peek_kind() else {
            break;
        };

        // A line label terminates itself; the labelled statement follows.
        if let TokenKind::JumpLabel(name) = kind {
            let name = name.clone();
            let range = parser.tokens[parser.pos].range;
            parser.pos += 1;
            out.push(Stmt {
                kind: StmtKind::JumpLabel(name),
                range,
            });
            continue;
        }

        let stmt = parser.parse_statement()?;
        out.push(stmt);

        // Defer trailing remarks past the statement they trail.
        let mut deferred = Vec::new();
        while let Some(TokenKind::Remark(text)) = parser.peek_kind() {
            let text = text.clone();
            let range = parser.tokens[parser.pos].range;
            parser.pos += 1;
            deferred.push(Stmt {
                kind: StmtKind::Remark(text),
                range,
            });
        }

        match parser.peek_kind() {
            None | Some(TokenKind::Linefeed) | Some(TokenKind::Colon) => {
                if parser.peek_kind().is_some() {
                    parser.pos += 1;
                }
            }
            Some(other) => {
                return Err(CompileError::ExpectedTerminator {
                    found: other.describe(),
                    range: parser.tokens[parser.pos].range,
                });
            }
        }
        out.append(&mut deferred);
    }

    Ok(out)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next(&mut self) -> Result<&'a Token, CompileError> {
        let token = self.tokens.get(self.pos).ok_or(CompileError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn prev_range(&self) -> Range {
        self.tokens[self.pos - 1].range
    }

    fn unexpected(token: &Token) -> CompileError {
        CompileError::UnexpectedToken {
            found: token.kind.describe(),
            range: token.range,
        }
    }

    /// Consume the given punctuation/keyword token or fail.
    fn expect(&mut self, want: &TokenKind) -> Result<&'a Token, CompileError> {
        let token = self.next()?;
        if &token.kind == want {
            Ok(token)
        } else {
            Err(Self::unexpected(token))
        }
    }

    fn expect_label(&mut self) -> Result<(String, Range), CompileError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Label(name) => Ok((name.clone(), token.range)),
            _ => Err(Self::unexpected(token)),
        }
    }

    /// True where a statement may end: EOF, a terminator, a trailing
    /// remark, or the ELSE of an enclosing single-line IF.
    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(TokenKind::Linefeed)
                | Some(TokenKind::Colon)
                | Some(TokenKind::Remark(_))
                | Some(TokenKind::KwElse)
        )
    }

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        let token = self.next()?;
        let start = token.range;
        match &token.kind {
            TokenKind::Remark(text) => Ok(Stmt {
                kind: StmtKind::Remark(text.clone()),
                range: start,
            }),
            TokenKind::KwLet => {
                let (name, _) = self.expect_label()?;
                self.expect(&TokenKind::Equals)?;
                let rhs = self.parse_expr()?;
                let range = start.cover(rhs.range);
                Ok(Stmt {
                    kind: StmtKind::Let { kw: true, name, rhs },
                    range,
                })
            }
            TokenKind::Label(name) => {
                if self.peek_kind() == Some(&TokenKind::Equals) {
                    self.pos += 1;
                    let rhs = self.parse_expr()?;
                    let range = start.cover(rhs.range);
                    Ok(Stmt {
                        kind: StmtKind::Let {
                            kw: false,
                            name: name.clone(),
                            rhs,
                        },
                        range,
                    })
                } else {
                    self.parse_call(name.clone(), start)
                }
            }
            TokenKind::KwIf => self.parse_if(start),
            TokenKind::KwEnd => {
                if self.peek_kind() == Some(&TokenKind::KwIf) {
                    self.pos += 1;
                    Ok(Stmt {
                        kind: StmtKind::EndIf,
                        range: start.cover(self.prev_range()),
                    })
                } else {
                    Ok(Stmt {
                        kind: StmtKind::End,
                        range: start,
                    })
                }
            }
            TokenKind::KwEndIf => Ok(Stmt {
                kind: StmtKind::EndIf,
                range: start,
            }),
            TokenKind::KwFor => self.parse_for(start),
            TokenKind::KwPragma => self.parse_pragma(start),
            _ => Err(Self::unexpected(token)),
        }
    }

    fn parse_call(&mut self, name: String, start: Range) -> Result<Stmt, CompileError> {
        let mut args = Vec::new();
        if !self.at_statement_end() {
            loop {
                let expr = self.parse_expr()?;
                let sep = match self.peek_kind() {
                    Some(TokenKind::Comma) => {
                        self.pos += 1;
                        Some(ArgSep::Comma)
                    }
                    Some(TokenKind::Semicolon) => {
                        self.pos += 1;
                        Some(ArgSep::Semicolon)
                    }
                    _ => None,
                };
                let done = sep.is_none() || self.at_statement_end();
                args.push(CallArg { expr, sep });
                if done {
                    break;
                }
            }
        }
        let range = start.cover(self.prev_range());
        Ok(Stmt {
            kind: StmtKind::Call { name, args },
            range,
        })
    }

    fn parse_if(&mut self, start: Range) -> Result<Stmt, CompileError> {
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::KwThen)?;
        if self.at_statement_end() {
            // Block-form header; the body is terminated by END IF.
            return Ok(Stmt {
                kind: StmtKind::If { cond },
                range: start.cover(self.prev_range()),
            });
        }
        let then = Box::new(self.parse_statement()?);
        if self.peek_kind() == Some(&TokenKind::KwElse) {
            self.pos += 1;
            let els = Box::new(self.parse_statement()?);
            let range = start.cover(els.range);
            Ok(Stmt {
                kind: StmtKind::If2 { cond, then, els },
                range,
            })
        } else {
            let range = start.cover(then.range);
            Ok(Stmt {
                kind: StmtKind::If1 { cond, then },
                range,
            })
        }
    }

    fn parse_for(&mut self, start: Range) -> Result<Stmt, CompileError> {
        let (var, _) = self.expect_label()?;
        self.expect(&TokenKind::Equals)?;
        let from = self.parse_expr()?;
        self.expect(&TokenKind::KwTo)?;
        let to = self.parse_expr()?;
        if self.peek_kind() == Some(&TokenKind::KwStep) {
            self.pos += 1;
            let step = self.parse_expr()?;
            let range = start.cover(step.range);
            Ok(Stmt {
                kind: StmtKind::ForStep {
                    var,
                    from,
                    to,
                    step,
                },
                range,
            })
        } else {
            let range = start.cover(to.range);
            Ok(Stmt {
                kind: StmtKind::For { var, from, to },
                range,
            })
        }
    }

    fn parse_pragma(&mut self, start: Range) -> Result<Stmt, CompileError> {
        let (name, _) = self.expect_label()?;
        let mut args = Vec::new();
        while !self.at_statement_end() {
            args.push(self.parse_expr()?);
            if self.peek_kind() == Some(&TokenKind::Comma) {
                self.pos += 1;
            }
        }
        let range = start.cover(self.prev_range());
        Ok(Stmt {
            kind: StmtKind::Pragma { name, args },
            range,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_or_xor()
    }

    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        let range = lhs.range.cover(rhs.range);
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            range,
        }
    }

    fn parse_or_xor(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_and()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::KwOr) => BinOp::Or,
                Some(TokenKind::KwXor) => BinOp::Xor,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_relational()?;
        while self.peek_kind() == Some(&TokenKind::KwAnd) {
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = Self::binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Equals) => BinOp::Eq,
                Some(TokenKind::NotEqual) => BinOp::Ne,
                Some(TokenKind::Less) => BinOp::Lt,
                Some(TokenKind::Greater) => BinOp::Gt,
                Some(TokenKind::LessEqual) => BinOp::Le,
                Some(TokenKind::GreaterEqual) => BinOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Asterisk) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::FDiv,
                Some(TokenKind::Backslash) => BinOp::IDiv,
                Some(TokenKind::KwMod) => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                let start = self.tokens[self.pos].range;
                self.pos += 1;
                let operand = self.parse_unary()?;
                let range = start.cover(operand.range);
                Ok(Expr {
                    kind: ExprKind::Unary {
                        op: UnOp::Neg,
                        operand: Box::new(operand),
                    },
                    range,
                })
            }
            // Unary plus is accepted and ignored.
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_factor(),
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, CompileError> {
        let token = self.next()?;
        let range = token.range;
        let kind = match &token.kind {
            TokenKind::Integer(n) => ExprKind::Number(i64::from(*n)),
            TokenKind::Long(n) => ExprKind::Number(i64::from(*n)),
            TokenKind::Single(v) => ExprKind::SingleLit(*v),
            TokenKind::Double(v) => ExprKind::DoubleLit(*v),
            TokenKind::StringLit(s) => ExprKind::StringLit(s.clone()),
            TokenKind::Label(name) => ExprKind::Var(name.clone()),
            TokenKind::OpenParen => {
                let inner = self.parse_expr()?;
                let close = self.expect(&TokenKind::CloseParen)?;
                return Ok(Expr {
                    kind: inner.kind,
                    range: range.cover(close.range),
                });
            }
            _ => return Err(Self::unexpected(token)),
        };
        Ok(Expr { kind, range })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse_source(source: &str) -> Vec<Stmt> {
        parse(&tokenize(source).expect("tokenizes")).expect("parses")
    }

    fn parse_err(source: &str) -> CompileError {
        parse(&tokenize(source).expect("tokenizes")).expect_err("fails to parse")
    }

    fn single_expr(source: &str) -> Expr {
        let stmts = parse_source(&format!("print {source}\n"));
        match &stmts[0].kind {
            StmtKind::Call { args, .. } => args[0].expr.clone(),
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let e = single_expr("1 + 2 * 3");
        match e.kind {
            ExprKind::Binary { op: BinOp::Add, lhs, rhs } => {
                assert!(matches!(lhs.kind, ExprKind::Number(1)));
                assert!(matches!(
                    rhs.kind,
                    ExprKind::Binary { op: BinOp::Mul, .. }
                ));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_left_associativity() {
        let e = single_expr("10 - 3 - 2");
        match e.kind {
            ExprKind::Binary { op: BinOp::Sub, lhs, rhs } => {
                assert!(matches!(
                    lhs.kind,
                    ExprKind::Binary { op: BinOp::Sub, .. }
                ));
                assert!(matches!(rhs.kind, ExprKind::Number(2)));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_parens_override() {
        let e = single_expr("(1 + 2) * 3");
        match e.kind {
            ExprKind::Binary { op: BinOp::Mul, lhs, .. } => {
                assert!(matches!(
                    lhs.kind,
                    ExprKind::Binary { op: BinOp::Add, .. }
                ));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_unary_minus_binds_tightest() {
        let e = single_expr("-2 + 3");
        match e.kind {
            ExprKind::Binary { op: BinOp::Add, lhs, .. } => {
                assert!(matches!(
                    lhs.kind,
                    ExprKind::Unary { op: UnOp::Neg, .. }
                ));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_relational_and_logical_levels() {
        // (a < b) AND (c = d), then OR on top.
        let e = single_expr("a < b and c = d or e");
        match e.kind {
            ExprKind::Binary { op: BinOp::Or, lhs, .. } => {
                assert!(matches!(
                    lhs.kind,
                    ExprKind::Binary { op: BinOp::And, .. }
                ));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_let_with_and_without_keyword() {
        let stmts = parse_source("LET a = 1\nb% = 2\n");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Let { kw: true, name, .. } if name == "a"
        ));
        assert!(matches!(
            &stmts[1].kind,
            StmtKind::Let { kw: false, name, .. } if name == "b%"
        ));
    }

    #[test]
    fn test_call_with_separators() {
        let stmts = parse_source("print 1, 2; 3\n");
        match &stmts[0].kind {
            StmtKind::Call { name, args } => {
                assert_eq!(name, "print");
                assert_eq!(args.len(), 3);
                assert_eq!(args[0].sep, Some(ArgSep::Comma));
                assert_eq!(args[1].sep, Some(ArgSep::Semicolon));
                assert_eq!(args[2].sep, None);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_call_trailing_separator() {
        let stmts = parse_source("print 1;\n");
        match &stmts[0].kind {
            StmtKind::Call { args, .. } => {
                assert_eq!(args.len(), 1);
                assert_eq!(args[0].sep, Some(ArgSep::Semicolon));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_call_has_no_args() {
        let stmts = parse_source("print\n");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Call { args, .. } if args.is_empty()
        ));
    }

    #[test]
    fn test_if_forms() {
        let stmts = parse_source("if a then\nif a then b = 1\nif a then b = 1 else b = 2\n");
        assert!(matches!(&stmts[0].kind, StmtKind::If { .. }));
        assert!(matches!(&stmts[1].kind, StmtKind::If1 { .. }));
        match &stmts[2].kind {
            StmtKind::If2 { then, els, .. } => {
                assert!(matches!(then.kind, StmtKind::Let { .. }));
                assert!(matches!(els.kind, StmtKind::Let { .. }));
            }
            other => panic!("expected IF2, got {other:?}"),
        }
    }

    #[test]
    fn test_end_and_endif() {
        let stmts = parse_source("end\nend if\nendif\n");
        assert!(matches!(&stmts[0].kind, StmtKind::End));
        assert!(matches!(&stmts[1].kind, StmtKind::EndIf));
        assert!(matches!(&stmts[2].kind, StmtKind::EndIf));
    }

    #[test]
    fn test_for_with_and_without_step() {
        let stmts = parse_source("for i = 1 to 10\nfor i = 10 to 1 step -1\n");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::For { var, .. } if var == "i"
        ));
        assert!(matches!(&stmts[1].kind, StmtKind::ForStep { .. }));
    }

    #[test]
    fn test_colon_separates_statements() {
        let stmts = parse_source("a = 1: b = 2\n");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_trailing_remark_is_deferred() {
        let stmts = parse_source("a = 1 ' note\nb = 2\n");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(&stmts[0].kind, StmtKind::Let { name, .. } if name == "a"));
        assert!(matches!(&stmts[1].kind, StmtKind::Remark(text) if text == "' note"));
        assert!(matches!(&stmts[2].kind, StmtKind::Let { name, .. } if name == "b"));
    }

    #[test]
    fn test_standalone_remark() {
        let stmts = parse_source("REM whole line\n");
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Remark(text) if text == "REM whole line"
        ));
    }

    #[test]
    fn test_jump_label_statement() {
        let stmts = parse_source("top:\na = 1\n");
        assert!(matches!(&stmts[0].kind, StmtKind::JumpLabel(name) if name == "top"));
    }

    #[test]
    fn test_pragma() {
        let stmts = parse_source("pragma printed \"ok\"\n");
        match &stmts[0].kind {
            StmtKind::Pragma { name, args } => {
                assert_eq!(name, "printed");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected pragma, got {other:?}"),
        }
    }

    #[test]
    fn test_unexpected_end_mid_statement() {
        assert!(matches!(parse_err("a = "), CompileError::UnexpectedEnd));
        assert!(matches!(parse_err("if a"), CompileError::UnexpectedEnd));
    }

    #[test]
    fn test_expected_terminator() {
        let err = parse_err("a = 1 2\n");
        assert!(matches!(err, CompileError::ExpectedTerminator { .. }));
    }

    #[test]
    fn test_unexpected_token() {
        let err = parse_err("a = )\n");
        match err {
            CompileError::UnexpectedToken { found, .. } => assert_eq!(found, "`)`"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parser_does_not_mutate_tokens() {
        let tokens = tokenize("print 1 + 2\n").unwrap();
        let before = tokens.clone();
        let _ = parse(&tokens).unwrap();
        assert_eq!(tokens, before);
    }

    #[test]
    fn test_statement_range_spans_children() {
        let stmts = parse_source("a = 1 + 2\n");
        let range = stmts[0].range;
        assert_eq!((range.start.line, range.start.column), (1, 1));
        assert_eq!((range.end.line, range.end.column), (1, 9));
    }
}
