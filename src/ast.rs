//! Abstract syntax tree produced by [`crate::parser::Parser`].
//!
//! Nodes borrow their tokens from the scanner's token buffer, so an AST never
//! outlives the tokens it was parsed from.  The tree is immutable once built;
//! the resolver and interpreter only ever read it.

use serde::Serialize;

use crate::token::Token;

/// Identity of a name‑reference node (`Variable`, `Assign`, `This`, `Super`).
///
/// The parser hands out a fresh id per node, so two uses of the same name are
/// still two different keys in the resolver's distance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
///
/// The parser copies the value at parse‑time, so literals carry no token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    /// Integral lexemes such as `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr<'a> {
    Literal(LiteralValue),

    /// Prefix unary operator expression: `!isReady` or `-42`.
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Infix arithmetic, comparison or equality operator.
    Binary {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr<'a>>),

    /// Variable access.
    Variable { id: ExprId, name: &'a Token<'a> },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    Call {
        callee: Box<Expr<'a>>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: &'a Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// object.property
    Get {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
    },

    /// object.property = value
    Set {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: &'a Token<'a> },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    },
}

/// A named function or method: shared by `fun` declarations and class bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl<'a> {
    pub name: &'a Token<'a>,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<&'a Token<'a>>,

    pub body: Vec<Stmt<'a>>,
}

/// *Statements*.  A program is a sequence of these.
///
/// There is no `for` node: the parser lowers `for` into a `Block` holding the
/// initializer and a `While` whose body runs the increment last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt<'a> {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr<'a>),

    Print(Expr<'a>),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    Block(Vec<Stmt<'a>>),

    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    Function(FunctionDecl<'a>),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: &'a Token<'a>,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr<'a>>,
    },

    Class {
        name: &'a Token<'a>,
        /// Always an `Expr::Variable` when present.
        superclass: Option<Expr<'a>>,
        methods: Vec<FunctionDecl<'a>>,
    },
}

impl<'a> Expr<'a> {
    /// Best-effort source line for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,
            Expr::Unary { operator, .. } => operator.line,
            Expr::Binary { operator, .. } => operator.line,
            Expr::Grouping(inner) => inner.line(),
            Expr::Variable { name, .. } => name.line,
            Expr::Assign { name, .. } => name.line,
            Expr::Logical { operator, .. } => operator.line,
            Expr::Call { paren, .. } => paren.line,
            Expr::Get { name, .. } => name.line,
            Expr::Set { name, .. } => name.line,
            Expr::This { keyword, .. } => keyword.line,
            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}
