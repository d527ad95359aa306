//! Tokenizer: source text to a flat token stream with source ranges.
//!
//! One left-to-right pass with single-character lookahead. Keywords match
//! case-insensitively; identifiers keep their source case and may end in
//! one type sigil. Numeric literals pick their variant from the trailing
//! sigil, or from shape and magnitude when there is none: a literal with a
//! decimal point or exponent is SINGLE unless it only fits DOUBLE, a plain
//! integer is INTEGER unless it overflows i16, in which case LONG.

use crate::error::CompileError;
use quill_core::{Loc, Range};

/// A token plus the source range it covers (inclusive on both ends).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i16),
    Long(i32),
    Single(f32),
    Double(f64),
    StringLit(String),

    // Names and comments
    Label(String),
    Remark(String),
    JumpLabel(String),

    // Punctuation
    Linefeed,
    Comma,
    Semicolon,
    Colon,
    Equals,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Backslash,
    OpenParen,
    CloseParen,
    Less,
    Greater,
    NotEqual,
    LessEqual,
    GreaterEqual,

    // Keywords
    KwIf,
    KwThen,
    KwElse,
    KwElseIf,
    KwEnd,
    KwEndIf,
    KwGoto,
    KwFor,
    KwTo,
    KwStep,
    KwNext,
    KwDim,
    KwAs,
    KwGosub,
    KwReturn,
    KwStop,
    KwDo,
    KwLoop,
    KwWhile,
    KwUntil,
    KwWend,
    KwLet,
    KwAnd,
    KwOr,
    KwXor,
    KwMod,
    KwPragma,
}

impl TokenKind {
    fn keyword(upper: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match upper {
            "IF" => KwIf,
            "THEN" => KwThen,
            "ELSE" => KwElse,
            "ELSEIF" => KwElseIf,
            "END" => KwEnd,
            "ENDIF" => KwEndIf,
            "GOTO" => KwGoto,
            "FOR" => KwFor,
            "TO" => KwTo,
            "STEP" => KwStep,
            "NEXT" => KwNext,
            "DIM" => KwDim,
            "AS" => KwAs,
            "GOSUB" => KwGosub,
            "RETURN" => KwReturn,
            "STOP" => KwStop,
            "DO" => KwDo,
            "LOOP" => KwLoop,
            "WHILE" => KwWhile,
            "UNTIL" => KwUntil,
            "WEND" => KwWend,
            "LET" => KwLet,
            "AND" => KwAnd,
            "OR" => KwOr,
            "XOR" => KwXor,
            "MOD" => KwMod,
            "PRAGMA" => KwPragma,
            _ => return None,
        })
    }

    /// How the token reads in a diagnostic.
    pub fn describe(&self) -> String {
        use TokenKind::*;
        match self {
            Integer(n) => format!("number `{n}`"),
            Long(n) => format!("number `{n}`"),
            Single(v) => format!("number `{v}`"),
            Double(v) => format!("number `{v}`"),
            StringLit(_) => "string literal".to_string(),
            Label(name) => format!("identifier `{name}`"),
            Remark(_) => "comment".to_string(),
            JumpLabel(name) => format!("label `{name}:`"),
            Linefeed => "end of line".to_string(),
            Comma => "`,`".to_string(),
            Semicolon => "`;`".to_string(),
            Colon => "`:`".to_string(),
            Equals => "`=`".to_string(),
            Plus => "`+`".to_string(),
            Minus => "`-`".to_string(),
            Asterisk => "`*`".to_string(),
            Slash => "`/`".to_string(),
            Backslash => "`\\`".to_string(),
            OpenParen => "`(`".to_string(),
            CloseParen => "`)`".to_string(),
            Less => "`<`".to_string(),
            Greater => "`>`".to_string(),
            NotEqual => "`<>`".to_string(),
            LessEqual => "`<=`".to_string(),
            GreaterEqual => "`>=`".to_string(),
            KwIf => "keyword IF".to_string(),
            KwThen => "keyword THEN".to_string(),
            KwElse => "keyword ELSE".to_string(),
            KwElseIf => "keyword ELSEIF".to_string(),
            KwEnd => "keyword END".to_string(),
            KwEndIf => "keyword ENDIF".to_string(),
            KwGoto => "keyword GOTO".to_string(),
            KwFor => "keyword FOR".to_string(),
            KwTo => "keyword TO".to_string(),
            KwStep => "keyword STEP".to_string(),
            KwNext => "keyword NEXT".to_string(),
            KwDim => "keyword DIM".to_string(),
            KwAs => "keyword AS".to_string(),
            KwGosub => "keyword GOSUB".to_string(),
            KwReturn => "keyword RETURN".to_string(),
            KwStop => "keyword STOP".to_string(),
            KwDo => "keyword DO".to_string(),
            KwLoop => "keyword LOOP".to_string(),
            KwWhile => "keyword WHILE".to_string(),
            KwUntil => "keyword UNTIL".to_string(),
            KwWend => "keyword WEND".to_string(),
            KwLet => "keyword LET".to_string(),
            KwAnd => "keyword AND".to_string(),
            KwOr => "keyword OR".to_string(),
            KwXor => "keyword XOR".to_string(),
            KwMod => "keyword MOD".to_string(),
            KwPragma => "keyword PRAGMA".to_string(),
        }
    }
}

/// Tokenize a whole source buffer.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Tokenizer::new(source).run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
}

impl Tokenizer {
    fn new(source: &str) -> Self {
        Tokenizer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    /// Consume one character, returning it with the position it occupied.
    fn advance(&mut self) -> (char, Loc) {
        let loc = Loc::new(self.line, self.column);
        let c = self.chars[self.pos];
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        (c, loc)
    }

    fn push(&mut self, kind: TokenKind, start: Loc, end: Loc) {
        self.tokens.push(Token {
            kind,
            range: Range::new(start, end),
        });
    }

    /// True between a line start (or `:`) and the first token of a statement,
    /// which is the only place a jump label may appear.
    fn at_statement_start(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Linefeed) | Some(TokenKind::Colon) | Some(TokenKind::JumpLabel(_))
        )
    }

    fn run(mut self) -> Result<Vec<Token>, CompileError> {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '\r' => {
                    // \r\n is one linefeed; a stray \r is ignored.
                    self.advance();
                }
                '\n' => {
                    let (_, loc) = self.advance();
                    self.push(TokenKind::Linefeed, loc, loc);
                }
                '\'' => self.lex_remark_tick(),
                '"' => self.lex_string()?,
                '0'..='9' => self.lex_number()?,
                '.' if self.peek_next().is_some_and(|d| d.is_ascii_digit()) => {
                    self.lex_number()?;
                }
                c if c.is_ascii_alphabetic() => self.lex_word(),
                '<' => {
                    let (_, start) = self.advance();
                    match self.peek() {
                        Some('=') => {
                            let (_, end) = self.advance();
                            self.push(TokenKind::LessEqual, start, end);
                        }
                        Some('>') => {
                            let (_, end) = self.advance();
                            self.push(TokenKind::NotEqual, start, end);
                        }
                        _ => self.push(TokenKind::Less, start, start),
                    }
                }
                '>' => {
                    let (_, start) = self.advance();
                    if self.peek() == Some('=') {
                        let (_, end) = self.advance();
                        self.push(TokenKind::GreaterEqual, start, end);
                    } else {
                        self.push(TokenKind::Greater, start, start);
                    }
                }
                _ => {
                    let (c, loc) = self.advance();
                    let kind = match c {
                        ',' => TokenKind::Comma,
                        ';' => TokenKind::Semicolon,
                        ':' => TokenKind::Colon,
                        '=' => TokenKind::Equals,
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Asterisk,
                        '/' => TokenKind::Slash,
                        '\\' => TokenKind::Backslash,
                        '(' => TokenKind::OpenParen,
                        ')' => TokenKind::CloseParen,
                        _ => {
                            return Err(CompileError::UnknownCharacter {
                                ch: c,
                                range: Range::new(loc, loc),
                            });
                        }
                    };
                    self.push(kind, loc, loc);
                }
            }
        }
        Ok(self.tokens)
    }

    /// A `'` comment runs to end of line; the tick is part of the text.
    fn lex_remark_tick(&mut self) {
        let (c, start) = self.advance();
        let mut text = String::from(c);
        let mut end = start;
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            let (c, loc) = self.advance();
            text.push(c);
            end = loc;
        }
        self.push(TokenKind::Remark(text), start, end);
    }

    fn lex_string(&mut self) -> Result<(), CompileError> {
        let (_, start) = self.advance();
        let mut text = String::new();
        let mut end = start;
        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(CompileError::UnterminatedString {
                        range: Range::new(start, end),
                    });
                }
                Some('"') => {
                    let (_, loc) = self.advance();
                    self.push(TokenKind::StringLit(text), start, loc);
                    return Ok(());
                }
                Some(_) => {
                    let (c, loc) = self.advance();
                    text.push(c);
                    end = loc;
                }
            }
        }
    }

    fn lex_number(&mut self) -> Result<(), CompileError> {
        let start = Loc::new(self.line, self.column);
        let mut end = start;
        let mut text = String::new();
        let mut has_dot = false;
        let mut has_exp = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            let (c, loc) = self.advance();
            text.push(c);
            end = loc;
        }
        if self.peek() == Some('.') {
            has_dot = true;
            let (c, loc) = self.advance();
            text.push(c);
            end = loc;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                let (c, loc) = self.advance();
                text.push(c);
                end = loc;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            // Only an exponent when digits actually follow; otherwise the
            // `e` starts an identifier.
            let digits_follow = match self.peek_next() {
                Some(d) if d.is_ascii_digit() => true,
                Some('+') | Some('-') => self
                    .chars
                    .get(self.pos + 2)
                    .is_some_and(|d| d.is_ascii_digit()),
                _ => false,
            };
            if digits_follow {
                has_exp = true;
                let (c, loc) = self.advance();
                text.push(c);
                end = loc;
                if matches!(self.peek(), Some('+') | Some('-')) {
                    let (c, loc) = self.advance();
                    text.push(c);
                    end = loc;
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    let (c, loc) = self.advance();
                    text.push(c);
                    end = loc;
                }
            }
        }

        let sigil = match self.peek() {
            Some(c @ ('%' | '&' | '!' | '#')) => {
                let (_, loc) = self.advance();
                end = loc;
                Some(c)
            }
            _ => None,
        };

        let range = Range::new(start, end);
        let invalid = || CompileError::InvalidNumber { range };

        let kind = if has_dot || has_exp {
            let v: f64 = text.parse().map_err(|_| invalid())?;
            match sigil {
                Some('!') => {
                    let s = v as f32;
                    if s.is_finite() {
                        TokenKind::Single(s)
                    } else {
                        return Err(invalid());
                    }
                }
                Some('#') => TokenKind::Double(v),
                Some(_) => return Err(invalid()),
                None => {
                    let s = v as f32;
                    if s.is_finite() {
                        TokenKind::Single(s)
                    } else {
                        TokenKind::Double(v)
                    }
                }
            }
        } else {
            let v: i64 = text.parse().map_err(|_| invalid())?;
            match sigil {
                Some('%') => TokenKind::Integer(i16::try_from(v).map_err(|_| invalid())?),
                Some('&') => TokenKind::Long(i32::try_from(v).map_err(|_| invalid())?),
                Some('!') => TokenKind::Single(v as f32),
                Some('#') => TokenKind::Double(v as f64),
                Some(_) => return Err(invalid()),
                None => {
                    if let Ok(n) = i16::try_from(v) {
                        TokenKind::Integer(n)
                    } else if let Ok(n) = i32::try_from(v) {
                        TokenKind::Long(n)
                    } else {
                        return Err(invalid());
                    }
                }
            }
        };
        self.push(kind, start, end);
        Ok(())
    }

    /// Identifier, keyword, REM comment, or jump label.
    fn lex_word(&mut self) {
        let at_start = self.at_statement_start();
        let (c, start) = self.advance();
        let mut text = String::from(c);
        let mut end = start;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            let (c, loc) = self.advance();
            text.push(c);
            end = loc;
        }
        let sigil = match self.peek() {
            Some('%' | '&' | '!' | '#' | '$') => {
                let (c, loc) = self.advance();
                text.push(c);
                end = loc;
                Some(c)
            }
            _ => None,
        };

        if sigil.is_none() {
            let upper = text.to_ascii_uppercase();
            if upper == "REM" {
                // The rest of the line is the remark, leading REM included.
                while let Some(c) = self.peek() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    let (c, loc) = self.advance();
                    text.push(c);
                    end = loc;
                }
                self.push(TokenKind::Remark(text), start, end);
                return;
            }
            if let Some(kw) = TokenKind::keyword(&upper) {
                self.push(kw, start, end);
                return;
            }
            if at_start && self.peek() == Some(':') {
                let (_, loc) = self.advance();
                self.push(TokenKind::JumpLabel(text), start, loc);
                return;
            }
        }
        self.push(TokenKind::Label(text), start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenizes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(
            kinds("if THEN Else mod"),
            vec![
                TokenKind::KwIf,
                TokenKind::KwThen,
                TokenKind::KwElse,
                TokenKind::KwMod
            ]
        );
    }

    #[test]
    fn test_identifiers_keep_case_and_sigil() {
        assert_eq!(
            kinds("Total& count% s$"),
            vec![
                TokenKind::Label("Total&".into()),
                TokenKind::Label("count%".into()),
                TokenKind::Label("s$".into())
            ]
        );
    }

    #[test]
    fn test_keyword_with_sigil_is_identifier() {
        assert_eq!(kinds("mod$"), vec![TokenKind::Label("mod$".into())]);
    }

    #[test]
    fn test_integer_literal_widths() {
        assert_eq!(kinds("1"), vec![TokenKind::Integer(1)]);
        assert_eq!(kinds("32767"), vec![TokenKind::Integer(32767)]);
        // i16 overflow promotes to LONG.
        assert_eq!(kinds("32768"), vec![TokenKind::Long(32768)]);
        assert_eq!(kinds("5&"), vec![TokenKind::Long(5)]);
        assert!(matches!(
            tokenize("99999%"),
            Err(CompileError::InvalidNumber { .. })
        ));
        assert!(matches!(
            tokenize("9999999999"),
            Err(CompileError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_float_literal_shapes() {
        assert_eq!(kinds("1.5"), vec![TokenKind::Single(1.5)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Single(0.5)]);
        assert_eq!(kinds("2e3"), vec![TokenKind::Single(2000.0)]);
        assert_eq!(kinds("1.5#"), vec![TokenKind::Double(1.5)]);
        assert_eq!(kinds("3!"), vec![TokenKind::Single(3.0)]);
        // Magnitude beyond f32 becomes DOUBLE.
        assert_eq!(kinds("1e200"), vec![TokenKind::Double(1e200)]);
    }

    #[test]
    fn test_exponent_needs_digits() {
        // `1e` is the number 1 followed by the identifier `e`.
        assert_eq!(
            kinds("1e"),
            vec![TokenKind::Integer(1), TokenKind::Label("e".into())]
        );
    }

    #[test]
    fn test_string_literal_strips_quotes() {
        assert_eq!(kinds("\"koer\""), vec![TokenKind::StringLit("koer".into())]);
        assert_eq!(kinds("\"\""), vec![TokenKind::StringLit(String::new())]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("print \"abc").unwrap_err();
        assert!(matches!(err, CompileError::UnterminatedString { .. }));
        let err = tokenize("print \"abc\nprint 1").unwrap_err();
        assert!(matches!(err, CompileError::UnterminatedString { .. }));
    }

    #[test]
    fn test_remarks_both_forms() {
        assert_eq!(
            kinds("' hello\nREM world"),
            vec![
                TokenKind::Remark("' hello".into()),
                TokenKind::Linefeed,
                TokenKind::Remark("REM world".into())
            ]
        );
        // REMARK is a plain identifier, not a comment.
        assert_eq!(kinds("REMARK"), vec![TokenKind::Label("REMARK".into())]);
    }

    #[test]
    fn test_multi_char_operators() {
        assert_eq!(
            kinds("<= >= <> < >"),
            vec![
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::NotEqual,
                TokenKind::Less,
                TokenKind::Greater
            ]
        );
    }

    #[test]
    fn test_crlf_normalized() {
        assert_eq!(
            kinds("a\r\nb"),
            vec![
                TokenKind::Label("a".into()),
                TokenKind::Linefeed,
                TokenKind::Label("b".into())
            ]
        );
    }

    #[test]
    fn test_jump_label_only_at_statement_start() {
        assert_eq!(
            kinds("start:\nprint"),
            vec![
                TokenKind::JumpLabel("start".into()),
                TokenKind::Linefeed,
                TokenKind::Label("print".into())
            ]
        );
        // After a colon terminator a new statement starts.
        assert_eq!(
            kinds("a = 1: again: b = 2"),
            vec![
                TokenKind::Label("a".into()),
                TokenKind::Equals,
                TokenKind::Integer(1),
                TokenKind::Colon,
                TokenKind::JumpLabel("again".into()),
                TokenKind::Label("b".into()),
                TokenKind::Equals,
                TokenKind::Integer(2)
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("a ~ b").unwrap_err();
        match err {
            CompileError::UnknownCharacter { ch, range } => {
                assert_eq!(ch, '~');
                assert_eq!(range, Range::at(1, 3));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_ranges_cover_source_slices() {
        let source = "let total& = \"abc\" <> rem42\n";
        let tokens = tokenize(source).unwrap();
        let line: Vec<char> = source.lines().next().unwrap().chars().collect();
        let slice = |r: Range| -> String {
            assert_eq!(r.start.line, 1);
            line[(r.start.column - 1) as usize..r.end.column as usize]
                .iter()
                .collect()
        };
        assert_eq!(slice(tokens[0].range), "let");
        assert_eq!(slice(tokens[1].range), "total&");
        assert_eq!(slice(tokens[2].range), "=");
        assert_eq!(slice(tokens[3].range), "\"abc\"");
        assert_eq!(slice(tokens[4].range), "<>");
        assert_eq!(slice(tokens[5].range), "rem42");
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("a\nbb").unwrap();
        assert_eq!(tokens[0].range, Range::at(1, 1));
        assert_eq!(tokens[1].range, Range::at(1, 2));
        assert_eq!(
            tokens[2].range,
            Range::new(Loc::new(2, 1), Loc::new(2, 2))
        );
    }
}
