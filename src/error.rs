//! Centralised error hierarchy for the **Lox runtime**.
//!
//! Static failures (scanner, parser, resolver) become [`LoxError`] values and
//! are collected so a single run can surface several of them.  Failures that
//! happen while a program executes are [`RuntimeError`]s; the first one aborts
//! the run.  Function `return` is *not* an error and never appears here, see
//! [`crate::interpreter::ExecOutcome`].
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenKind};

/// Canonical static error type used throughout the runtime.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        /// ` at 'lexeme'` or ` at end`.
        location: String,
        line: usize,
    },

    /// Static‑analysis failure found by the resolver.
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::str::Utf8Error),
}

/// Renders the ` at 'x'` suffix the parser and resolver attach to messages.
fn location_of(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Eof => " at end".to_string(),
        _ => format!(" at '{}'", token.lexeme),
    }
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", token.line, message);

        LoxError::Parse {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token<'_>, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", token.line, message);

        LoxError::Resolve {
            message,
            location: location_of(token),
            line: token.line,
        }
    }

    /// Source line the error points at, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            LoxError::Lex { line, .. }
            | LoxError::Parse { line, .. }
            | LoxError::Resolve { line, .. } => Some(*line),
            LoxError::Utf8(_) => None,
        }
    }

    /// Bare message without the `[line N] Error` prefix.
    pub fn message(&self) -> String {
        match self {
            LoxError::Lex { message, .. }
            | LoxError::Parse { message, .. }
            | LoxError::Resolve { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Failures raised while a program is executing.
///
/// Every user-facing variant carries the line of the token that caused it.
/// The `Display` form matches the classic Lox layout: message, newline,
/// `[line N]`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.\n[line {line}]")]
    UndefinedVariable { name: String, line: usize },

    #[error("Undefined property '{name}'.\n[line {line}]")]
    UndefinedProperty { name: String, line: usize },

    #[error("Can only call functions and classes.\n[line {line}]")]
    NotCallable { line: usize },

    #[error("Superclass must be a class.\n[line {line}]")]
    NotAClass { line: usize },

    #[error("Expected {expected} arguments but got {got}.\n[line {line}]")]
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Operand/receiver of the wrong type (`"Operands must be numbers."`, ...).
    #[error("{message}\n[line {line}]")]
    TypeError { message: String, line: usize },

    /// A host-provided function reported a failure.
    #[error("{message}\n[line {line}]")]
    Native { message: String, line: usize },

    /// The output sink refused a `print`.
    #[error("Output error: {0}")]
    Io(#[from] io::Error),

    /// Resolver and evaluator disagree about a binding.  Not reachable from a
    /// program that passed resolution.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub fn type_error<S: Into<String>>(line: usize, msg: S) -> Self {
        RuntimeError::TypeError {
            message: msg.into(),
            line,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UndefinedProperty { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::NotAClass { line }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::Native { line, .. } => Some(*line),
            RuntimeError::Io(_) | RuntimeError::Internal(_) => None,
        }
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_errors_carry_their_line() {
        let err = LoxError::lex(4, "Unterminated string.");
        assert_eq!(err.line(), Some(4));
        assert_eq!(err.message(), "Unterminated string.");
        assert_eq!(err.to_string(), "[line 4] Error: Unterminated string.");
    }

    #[test]
    fn decoding_errors_have_no_line() {
        let utf8 = String::from_utf8(vec![b'a', 0xff]).unwrap_err().utf8_error();
        let err = LoxError::from(utf8);

        assert!(matches!(err, LoxError::Utf8(_)));
        assert_eq!(err.line(), None);
    }

    #[test]
    fn runtime_errors_render_message_then_line() {
        let err = RuntimeError::NotAClass { line: 9 };
        assert_eq!(err.line(), Some(9));
        assert_eq!(err.to_string(), "Superclass must be a class.\n[line 9]");

        let io = RuntimeError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(io.line(), None);
    }
}
