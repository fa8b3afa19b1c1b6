//! Streaming lexer for Lox source text.
//!
//! [`Scanner`] is an iterator of `Result<Token>`: a lexical error is yielded in
//! place of the offending character and scanning carries on, so one pass
//! surfaces every error.  The final item is always a single `EOF` token and the
//! iterator is fused after it.
//!
//! Lexemes are slices of the input, so tokens never allocate except for the
//! decoded contents of string literals.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use std::iter::FusedIterator;

use log::{info, trace};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Literal, Token, TokenKind};

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and"    => TokenKind::And,
    "class"  => TokenKind::Class,
    "else"   => TokenKind::Else,
    "false"  => TokenKind::False,
    "fun"    => TokenKind::Fun,
    "for"    => TokenKind::For,
    "if"     => TokenKind::If,
    "nil"    => TokenKind::Nil,
    "or"     => TokenKind::Or,
    "print"  => TokenKind::Print,
    "return" => TokenKind::Return,
    "super"  => TokenKind::Super,
    "this"   => TokenKind::This,
    "true"   => TokenKind::True,
    "var"    => TokenKind::Var,
    "while"  => TokenKind::While,
};

pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// First byte of the lexeme being scanned.
    start: usize,
    /// Next byte to examine.
    cursor: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Scanner {
            source,
            bytes: source.as_bytes(),
            start: 0,
            cursor: 0,
            line: 1,
            finished: false,
        }
    }

    #[inline(always)]
    fn has_more(&self) -> bool {
        self.cursor < self.bytes.len()
    }

    /// Byte `offset` positions past the cursor, or NUL beyond the end.
    #[inline(always)]
    fn peek_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.cursor + offset).copied().unwrap_or(b'\0')
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.peek_at(0);
        self.cursor += 1;
        b
    }

    #[inline(always)]
    fn eat(&mut self, expected: u8) -> bool {
        let hit = self.has_more() && self.peek_at(0) == expected;
        if hit {
            self.cursor += 1;
        }
        hit
    }

    /// One- or two-character operator depending on a trailing `=`.
    #[inline]
    fn with_equals(&mut self, paired: TokenKind, single: TokenKind) -> TokenKind {
        if self.eat(b'=') {
            paired
        } else {
            single
        }
    }

    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.cursor]
    }

    /// Scans the lexeme at `start`.  Whitespace and comments give `None`.
    fn scan_token(&mut self) -> Option<Result<Token<'a>>> {
        let kind = match self.bump() {
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => TokenKind::Minus,
            b'+' => TokenKind::Plus,
            b';' => TokenKind::Semicolon,
            b'*' => TokenKind::Star,

            b'!' => self.with_equals(TokenKind::BangEqual, TokenKind::Bang),
            b'=' => self.with_equals(TokenKind::EqualEqual, TokenKind::Equal),
            b'<' => self.with_equals(TokenKind::LessEqual, TokenKind::Less),
            b'>' => self.with_equals(TokenKind::GreaterEqual, TokenKind::Greater),

            b'/' if self.eat(b'/') => {
                self.skip_line_comment();
                return None;
            }
            b'/' => TokenKind::Slash,

            b' ' | b'\r' | b'\t' => return None,
            b'\n' => {
                self.line += 1;
                return None;
            }

            b'"' => return Some(self.string()),
            b'0'..=b'9' => return Some(self.number()),
            b if b == b'_' || b.is_ascii_alphabetic() => return Some(Ok(self.identifier())),

            _ => return Some(Err(self.unexpected_character())),
        };

        Some(Ok(Token::new(kind, self.lexeme(), self.line)))
    }

    /// Stops *before* the newline so the line counter still sees it.
    fn skip_line_comment(&mut self) {
        self.cursor = match memchr(b'\n', &self.bytes[self.cursor..]) {
            Some(offset) => self.cursor + offset,
            None => self.bytes.len(),
        };
    }

    fn string(&mut self) -> Result<Token<'a>> {
        while self.has_more() && self.peek_at(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if !self.has_more() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }
        self.cursor += 1; // closing quote

        let contents = &self.source[self.start + 1..self.cursor - 1];

        Ok(Token::with_literal(
            TokenKind::String,
            self.lexeme(),
            Literal::Str(contents.to_owned()),
            self.line,
        ))
    }

    fn number(&mut self) -> Result<Token<'a>> {
        while self.peek_at(0).is_ascii_digit() {
            self.cursor += 1;
        }

        // A fraction needs at least one digit after the dot.
        if self.peek_at(0) == b'.' && self.peek_at(1).is_ascii_digit() {
            self.cursor += 1;
            while self.peek_at(0).is_ascii_digit() {
                self.cursor += 1;
            }
        }

        let lexeme = self.lexeme();
        let value: f64 = lexeme
            .parse()
            .map_err(|_| LoxError::lex(self.line, format!("Invalid number: {}", lexeme)))?;

        Ok(Token::with_literal(
            TokenKind::Number,
            lexeme,
            Literal::Number(value),
            self.line,
        ))
    }

    fn identifier(&mut self) -> Token<'a> {
        while matches!(self.peek_at(0), b'_' | b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9') {
            self.cursor += 1;
        }

        let lexeme = self.lexeme();
        let kind = KEYWORDS
            .get(lexeme)
            .copied()
            .unwrap_or(TokenKind::Identifier);

        Token::new(kind, lexeme, self.line)
    }

    /// Reports the whole character, which may span several bytes, and resumes
    /// after it.
    fn unexpected_character(&mut self) -> LoxError {
        let ch = self.source[self.start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        self.cursor = self.start + ch.len_utf8();

        LoxError::lex(self.line, format!("Unexpected character: {}", ch))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while self.has_more() {
            self.start = self.cursor;

            if let Some(item) = self.scan_token() {
                trace!("Scanned {:?}", item);
                return Some(item);
            }
        }

        self.finished = true;
        self.start = self.cursor;

        Some(Ok(Token::new(TokenKind::Eof, "", self.line)))
    }
}

impl FusedIterator for Scanner<'_> {}
