//! Lexical tokens.
//!
//! A [`Token`] borrows its lexeme from the source text.  Literal values are
//! decoded once by the scanner and carried alongside, so [`TokenKind`] itself
//! stays a plain `Copy` tag that can be compared and hashed freely.

use std::fmt;

use log::trace;
use serde::Serialize;

macro_rules! token_kinds {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// Category of a [`Token`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum TokenKind {
            $(
                $(#[$doc])*
                #[serde(rename = $name)]
                $variant,
            )*
        }

        impl TokenKind {
            /// Upper-case name, as printed by `tokenize`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(TokenKind::$variant => $name,)*
                }
            }
        }
    };
}

token_kinds! {
    LeftParen => "LEFT_PAREN",
    RightParen => "RIGHT_PAREN",
    LeftBrace => "LEFT_BRACE",
    RightBrace => "RIGHT_BRACE",
    Comma => "COMMA",
    Dot => "DOT",
    Minus => "MINUS",
    Plus => "PLUS",
    Semicolon => "SEMICOLON",
    Slash => "SLASH",
    Star => "STAR",

    Bang => "BANG",
    BangEqual => "BANG_EQUAL",
    Equal => "EQUAL",
    EqualEqual => "EQUAL_EQUAL",
    Greater => "GREATER",
    GreaterEqual => "GREATER_EQUAL",
    Less => "LESS",
    LessEqual => "LESS_EQUAL",

    Identifier => "IDENTIFIER",
    /// Carries [`Literal::Str`].
    String => "STRING",
    /// Carries [`Literal::Number`].
    Number => "NUMBER",

    And => "AND",
    Class => "CLASS",
    Else => "ELSE",
    False => "FALSE",
    Fun => "FUN",
    For => "FOR",
    If => "IF",
    Nil => "NIL",
    Or => "OR",
    Print => "PRINT",
    Return => "RETURN",
    Super => "SUPER",
    This => "THIS",
    True => "TRUE",
    Var => "VAR",
    While => "WHILE",

    Eof => "EOF",
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded value of a string or number literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    /// Contents between the quotes.
    Str(String),
    Number(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),

            // 3 → "3.0", 3.14 → "3.14"
            Literal::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                let mut buf = itoa::Buffer::new();
                write!(f, "{}.0", buf.format(*n as i64))
            }

            Literal::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token<'a> {
    pub kind: TokenKind,

    /// Exact source text of the token.
    pub lexeme: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<Literal>,

    /// 1-based; for a multi-line string, the line it ends on.
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, lexeme: &'a str, line: usize) -> Self {
        trace!("Token {} '{}' on line {}", kind, lexeme, line);

        Token {
            kind,
            lexeme,
            literal: None,
            line,
        }
    }

    pub fn with_literal(kind: TokenKind, lexeme: &'a str, literal: Literal, line: usize) -> Self {
        Token {
            literal: Some(literal),
            ..Token::new(kind, lexeme, line)
        }
    }

    #[inline]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token<'_> {
    /// `KIND lexeme literal`, e.g. `NUMBER 3 3.0` or `IDENTIFIER x null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.kind, self.lexeme)?;

        match &self.literal {
            Some(literal) => write!(f, "{}", literal),
            None => f.write_str("null"),
        }
    }
}
