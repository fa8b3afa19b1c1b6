//! End-to-end pipeline: scan, parse, resolve, interpret.
//!
//! Static errors from every stage that ran are reported together; a program
//! with any of them never starts executing.

use std::fmt::Write as _;
use std::io::{self, Write};

use log::{debug, info};
use thiserror::Error;

use crate::error::{LoxError, RuntimeError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Exit status for static (compile-time) errors.
pub const EXIT_STATIC: i32 = 65;
/// Exit status for runtime errors.
pub const EXIT_RUNTIME: i32 = 70;

#[derive(Debug, Error)]
pub enum RunError {
    /// Lex, parse or resolve errors, in the order they were found.
    #[error("{}", join_lines(.0))]
    Static(Vec<LoxError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => EXIT_STATIC,
            RunError::Runtime(_) => EXIT_RUNTIME,
        }
    }
}

fn join_lines(errors: &[LoxError]) -> String {
    let mut joined = String::new();
    for (i, error) in errors.iter().enumerate() {
        if i > 0 {
            joined.push('\n');
        }
        let _ = write!(joined, "{}", error);
    }
    joined
}

/// Tokenize all of `source`, keeping going past lexical errors.
pub fn scan(source: &str) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    debug!("Scanned {} token(s), {} error(s)", tokens.len(), errors.len());
    (tokens, errors)
}

/// Run `source` as a program, sending `print` output to `out`.
pub fn run<W: Write>(source: &str, out: W) -> Result<(), RunError> {
    let (tokens, mut errors) = scan(source);

    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) if errors.is_empty() => statements,
        Ok(_) => return Err(RunError::Static(errors)),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Err(RunError::Static(errors));
        }
    };
    info!("Parsed {} statement(s)", statements.len());

    let locals = Resolver::new()
        .resolve(&statements)
        .map_err(RunError::Static)?;

    let mut interpreter = Interpreter::new(out);
    interpreter.add_locals(locals);
    interpreter.interpret(&statements)?;

    Ok(())
}

/// Evaluate `source` as a single expression and print its value to `out`.
pub fn evaluate_expression<W: Write>(source: &str, mut out: W) -> Result<(), RunError> {
    let (tokens, errors) = scan(source);
    if !errors.is_empty() {
        return Err(RunError::Static(errors));
    }

    let expr = Parser::new(&tokens)
        .parse_expression()
        .map_err(|e| RunError::Static(vec![e]))?;

    let mut interpreter = Interpreter::new(io::sink());
    let value = interpreter.evaluate(&expr)?;
    debug!("Evaluated to: {}", value);

    writeln!(out, "{}", value).map_err(RuntimeError::from)?;
    Ok(())
}
