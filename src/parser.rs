/*!
Recursive-descent parser for Lox.

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT ;
```

`for` has no node of its own; it is lowered to
`{ init; while (cond) { body; incr; } }` with `true` for a missing condition.

A syntax error abandons the current declaration only.  The parser records
it, skips to the next statement boundary and carries on, so
[`Parser::parse`] reports every error in the program at once.
*/

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::error::{LoxError, Result};
use crate::token::{Literal, Token, TokenKind};

use log::{debug, info};

/// Upper bound on parameters and call arguments.
const MAX_ARITY: usize = 255;

const EQUALITY: &[TokenKind] = &[TokenKind::BangEqual, TokenKind::EqualEqual];
const COMPARISON: &[TokenKind] = &[
    TokenKind::Greater,
    TokenKind::GreaterEqual,
    TokenKind::Less,
    TokenKind::LessEqual,
];
const TERM: &[TokenKind] = &[TokenKind::Minus, TokenKind::Plus];
const FACTOR: &[TokenKind] = &[TokenKind::Slash, TokenKind::Star];

type Rule<'a> = fn(&mut Parser<'a>) -> Result<Expr<'a>>;

/// Parser over a token slice that ends in `EOF`, as produced by
/// [`crate::scanner::Scanner`].
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    next_id: usize,
    errors: Vec<LoxError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Parser {
            tokens,
            current: 0,
            next_id: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a whole program.
    pub fn parse(mut self) -> std::result::Result<Vec<Stmt<'a>>, Vec<LoxError>> {
        let mut program = Vec::new();

        while !self.at_end() {
            if let Some(stmt) = self.declaration() {
                program.push(stmt);
            }
        }

        if self.errors.is_empty() {
            info!("Parsed {} statement(s)", program.len());
            Ok(program)
        } else {
            info!("Parse finished with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    /// Parse a single expression that must span the whole input.
    pub fn parse_expression(mut self) -> Result<Expr<'a>> {
        let expr = self.expression()?;

        if let Some(err) = self.errors.pop() {
            return Err(err);
        }
        if !self.at_end() {
            return Err(LoxError::parse(self.peek(), "Expected end of expression"));
        }

        Ok(expr)
    }

    // ── declarations ─────────────────────────────────────────────────────

    fn declaration(&mut self) -> Option<Stmt<'a>> {
        let result = match self.peek().kind {
            TokenKind::Class => {
                self.advance();
                self.class_declaration()
            }
            TokenKind::Fun => {
                self.advance();
                self.function("function").map(Stmt::Function)
            }
            TokenKind::Var => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        };

        result
            .map_err(|e| {
                debug!("Recovering from parse error: {}", e);
                self.errors.push(e);
                self.synchronize();
            })
            .ok()
    }

    fn class_declaration(&mut self) -> Result<Stmt<'a>> {
        let name = self.consume(TokenKind::Identifier, "Expected class name")?;

        let superclass = if self.eat(TokenKind::Less) {
            let name = self.consume(TokenKind::Identifier, "Expected superclass name")?;
            Some(Expr::Variable {
                id: self.fresh_id(),
                name,
            })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expected '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RightBrace, "Expected '}' after class body")?;
        debug!("Parsed class '{}' with {} method(s)", name.lexeme, methods.len());

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    /// `kind` is "function" or "method" and only feeds error messages.
    fn function(&mut self, kind: &str) -> Result<FunctionDecl<'a>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expected {} name", kind))?;
        self.consume(
            TokenKind::LeftParen,
            &format!("Expected '(' after {} name", kind),
        )?;

        let params = self.comma_list("parameters", |parser| {
            parser.consume(TokenKind::Identifier, "Expected parameter name")
        })?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        self.consume(
            TokenKind::LeftBrace,
            &format!("Expected '{{' before {} body", kind),
        )?;
        let body = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> Result<Stmt<'a>> {
        let name = self.consume(TokenKind::Identifier, "Expected variable name")?;

        let initializer = if self.eat(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration")?;

        Ok(Stmt::Var { name, initializer })
    }

    // ── statements ───────────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt<'a>> {
        let kind = self.peek().kind;
        if !matches!(
            kind,
            TokenKind::For
                | TokenKind::If
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::While
                | TokenKind::LeftBrace
        ) {
            let expr = self.expression()?;
            self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
            return Ok(Stmt::Expression(expr));
        }

        let keyword = self.advance();
        match kind {
            TokenKind::For => self.for_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::LeftBrace => Ok(Stmt::Block(self.block()?)),

            TokenKind::Print => {
                let value = self.expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after value")?;
                Ok(Stmt::Print(value))
            }

            _ => {
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume(TokenKind::Semicolon, "Expected ';' after return value")?;
                Ok(Stmt::Return { keyword, value })
            }
        }
    }

    fn for_statement(&mut self) -> Result<Stmt<'a>> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        let initializer = if self.eat(TokenKind::Semicolon) {
            None
        } else if self.eat(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            let expr = self.expression()?;
            self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
            Some(Stmt::Expression(expr))
        };

        let condition = self.optional_expression(TokenKind::Semicolon)?;
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition")?;

        let increment = self.optional_expression(TokenKind::RightParen)?;
        self.consume(TokenKind::RightParen, "Expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let mut lowered = Stmt::While {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::True)),
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            lowered = Stmt::Block(vec![initializer, lowered]);
        }

        Ok(lowered)
    }

    fn if_statement(&mut self) -> Result<Stmt<'a>> {
        let condition = self.parenthesized("if")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.eat(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt<'a>> {
        let condition = self.parenthesized("while")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// Declarations up to the closing `}`; the `{` is already consumed.
    fn block(&mut self) -> Result<Vec<Stmt<'a>>> {
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenKind::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    /// `"(" expression ")"` after `if` / `while`.
    fn parenthesized(&mut self, keyword: &str) -> Result<Expr<'a>> {
        self.consume(
            TokenKind::LeftParen,
            &format!("Expected '(' after '{}'", keyword),
        )?;
        let expr = self.expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        Ok(expr)
    }

    fn optional_expression(&mut self, terminator: TokenKind) -> Result<Option<Expr<'a>>> {
        if self.check(terminator) {
            Ok(None)
        } else {
            self.expression().map(Some)
        }
    }

    // ── expressions ──────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr<'a>> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr<'a>> {
        let target = self.logical_or()?;

        if !self.eat(TokenKind::Equal) {
            return Ok(target);
        }

        let equals = self.previous();
        let value = Box::new(self.assignment()?);

        match target {
            Expr::Variable { name, .. } => Ok(Expr::Assign {
                id: self.fresh_id(),
                name,
                value,
            }),

            Expr::Get { object, name } => Ok(Expr::Set {
                object,
                name,
                value,
            }),

            // Reported without unwinding: the parser is not confused.
            other => {
                self.errors
                    .push(LoxError::parse(equals, "Invalid assignment target"));
                Ok(other)
            }
        }
    }

    fn logical_or(&mut self) -> Result<Expr<'a>> {
        let mut expr = self.logical_and()?;

        while self.eat(TokenKind::Or) {
            let operator = self.previous();
            let right = self.logical_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr<'a>> {
        let mut expr = self.equality()?;

        while self.eat(TokenKind::And) {
            let operator = self.previous();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr<'a>> {
        self.binary_level(EQUALITY, Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr<'a>> {
        self.binary_level(COMPARISON, Self::term)
    }

    fn term(&mut self) -> Result<Expr<'a>> {
        self.binary_level(TERM, Self::factor)
    }

    fn factor(&mut self) -> Result<Expr<'a>> {
        self.binary_level(FACTOR, Self::unary)
    }

    /// Left-associative chain of `operand (op operand)*`.
    fn binary_level(&mut self, operators: &[TokenKind], operand: Rule<'a>) -> Result<Expr<'a>> {
        let mut expr = operand(self)?;

        while operators.contains(&self.peek().kind) {
            let operator = self.advance();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr<'a>> {
        if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
            let operator = self.advance();
            let right = Box::new(self.unary()?);
            return Ok(Expr::Unary { operator, right });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr<'a>> {
        let mut expr = self.primary()?;

        loop {
            if self.eat(TokenKind::LeftParen) {
                let arguments = self.comma_list("arguments", Self::expression)?;
                let paren = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    paren,
                    arguments,
                };
            } else if self.eat(TokenKind::Dot) {
                let name =
                    self.consume(TokenKind::Identifier, "Expected property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr<'a>> {
        let token = self.peek();

        let expr = match token.kind {
            TokenKind::False => Expr::Literal(LiteralValue::False),
            TokenKind::True => Expr::Literal(LiteralValue::True),
            TokenKind::Nil => Expr::Literal(LiteralValue::Nil),

            TokenKind::Number | TokenKind::String => Expr::Literal(match &token.literal {
                Some(Literal::Number(n)) => LiteralValue::Number(*n),
                Some(Literal::Str(s)) => LiteralValue::Str(s.clone()),
                None => return Err(LoxError::parse(token, "Literal token without a value")),
            }),

            TokenKind::Identifier => Expr::Variable {
                id: self.fresh_id(),
                name: token,
            },

            TokenKind::This => Expr::This {
                id: self.fresh_id(),
                keyword: token,
            },

            TokenKind::Super => {
                self.advance();
                self.consume(TokenKind::Dot, "Expected '.' after 'super'")?;
                let method =
                    self.consume(TokenKind::Identifier, "Expected superclass method name")?;
                return Ok(Expr::Super {
                    id: self.fresh_id(),
                    keyword: token,
                    method,
                });
            }

            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                return Ok(Expr::Grouping(Box::new(inner)));
            }

            _ => return Err(LoxError::parse(token, "Expected expression")),
        };

        self.advance();
        Ok(expr)
    }

    /// Zero or more comma-separated items before a `)`; past 255 the error is
    /// recorded but parsing continues.
    fn comma_list<T>(
        &mut self,
        what: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        if self.check(TokenKind::RightParen) {
            return Ok(items);
        }

        loop {
            if items.len() >= MAX_ARITY {
                let err = LoxError::parse(
                    self.peek(),
                    format!("Can't have more than {} {}", MAX_ARITY, what),
                );
                self.errors.push(err);
            }

            items.push(item(self)?);

            if !self.eat(TokenKind::Comma) {
                return Ok(items);
            }
        }
    }

    // ── token cursor ─────────────────────────────────────────────────────

    fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    #[inline]
    fn peek(&self) -> &'a Token<'a> {
        &self.tokens[self.current]
    }

    #[inline]
    fn previous(&self) -> &'a Token<'a> {
        &self.tokens[self.current - 1]
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.peek().is(TokenKind::Eof)
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        !self.at_end() && self.peek().is(kind)
    }

    /// Returns the consumed token; never moves past `EOF`.
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        let hit = self.check(kind);
        if hit {
            self.current += 1;
        }
        hit
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&'a Token<'a>> {
        if self.check(kind) {
            return Ok(self.advance());
        }

        debug!("Expected {} but found {}", kind, self.peek().kind);
        Err(LoxError::parse(self.peek(), message))
    }

    /// Skip to just after a `;` or to the next token that starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.at_end() {
            if self.previous().is(TokenKind::Semicolon) {
                return;
            }

            if matches!(
                self.peek().kind,
                TokenKind::Class
                    | TokenKind::Fun
                    | TokenKind::Var
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Print
                    | TokenKind::Return
            ) {
                return;
            }

            self.advance();
        }
    }
}
