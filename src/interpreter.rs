//! Tree-walking evaluator.
//!
//! Statements produce an [`ExecOutcome`]: either they ran to completion or a
//! `return` is travelling up to the nearest function call.  Every construct
//! that opens a scope restores the previous one before passing either outcome
//! (or an error) upward.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::class::{Class, Instance, INITIALIZER};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::function::UserFunction;
use crate::natives;
use crate::resolver::Locals;
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Value};

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome<'a> {
    Completed,
    /// A `return` is unwinding toward the enclosing call.
    Returning(Value<'a>),
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

pub struct Interpreter<'a> {
    globals: EnvRef<'a>,
    environment: EnvRef<'a>,
    locals: Locals,
    out: Box<dyn Write + 'a>,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter writing `print` output to `out`, with the
    /// native functions already defined.
    pub fn new<W: Write + 'a>(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef<'a> = Rc::new(RefCell::new(Environment::new()));
        natives::install(&mut globals.borrow_mut());

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out: Box::new(out),
        }
    }

    /// Merge the resolver's distance table into the one used for lookups.
    pub fn add_locals(&mut self, locals: Locals) {
        debug!("Installing {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Runs a program.  The first runtime error stops it.
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> IResult<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            if let ExecOutcome::Returning(value) = self.execute(stmt)? {
                // The resolver rejects top-level `return`.
                return Err(RuntimeError::Internal(format!(
                    "return of {} escaped to top level",
                    value
                )));
            }
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> IResult<ExecOutcome<'a>> {
        match stmt {
            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                // Capture the current environment as the closure.
                let function = UserFunction::new(decl, Rc::clone(&self.environment), false);
                self.environment.borrow_mut().define(
                    decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(ExecOutcome::Completed)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class(name, superclass.as_ref(), methods)?;
                Ok(ExecOutcome::Completed)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ExecOutcome::Completed)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                self.out.flush()?;
                debug!("Printed value: {}", value);
                Ok(ExecOutcome::Completed)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(ExecOutcome::Completed)
            }

            Stmt::Block(statements) => {
                let scope = Environment::child_of(&self.environment);
                self.execute_block(statements, scope)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(ExecOutcome::Completed)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ExecOutcome::Returning(value) = self.execute(body)? {
                        return Ok(ExecOutcome::Returning(value));
                    }
                }
                Ok(ExecOutcome::Completed)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(ExecOutcome::Returning(value))
            }
        }
    }

    /// Runs `statements` with `environment` as the current scope.  The caller's
    /// scope is put back on every exit path before the result is passed on.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        environment: EnvRef<'a>,
    ) -> IResult<ExecOutcome<'a>> {
        trace!("Entering block with {} statements", statements.len());
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut outcome = Ok(ExecOutcome::Completed);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(ExecOutcome::Completed) => {}
                early => {
                    outcome = early;
                    break;
                }
            }
        }

        self.environment = previous;
        trace!("Exited block");
        outcome
    }

    fn execute_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: Option<&'a Expr<'a>>,
        methods: &'a [FunctionDecl<'a>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<Class<'a>>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => return Err(RuntimeError::NotAClass { line: expr.line() }),
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(name.lexeme, Value::Nil);

        // Methods close over a scope holding `super` when there is one.
        let enclosing: Option<EnvRef<'a>> = superclass.as_ref().map(|parent| {
            let scope = Environment::child_of(&self.environment);
            scope.borrow_mut().define(
                "super",
                Value::Callable(Callable::Class(Rc::clone(parent))),
            );
            std::mem::replace(&mut self.environment, scope)
        });

        let methods: HashMap<String, Rc<UserFunction<'a>>> = methods
            .iter()
            .map(|method| {
                let function = UserFunction::new(
                    method,
                    Rc::clone(&self.environment),
                    method.name.lexeme == INITIALIZER,
                );
                (method.name.lexeme.to_string(), Rc::new(function))
            })
            .collect();

        let class = Rc::new(Class::new(name.lexeme, superclass, methods));

        if let Some(previous) = enclosing {
            self.environment = previous;
        }

        self.environment.borrow_mut().assign(
            name.lexeme,
            Value::Callable(Callable::Class(class)),
            name.line,
        )?;

        info!("Class '{}' defined", name.lexeme);
        Ok(())
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> IResult<Value<'a>> {
        trace!("Evaluating expression: {:?}", expr);
        match expr {
            Expr::Literal(literal) => Ok(evaluate_literal(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                let decided = if operator.kind == TokenKind::Or {
                    left_val.is_truthy()
                } else {
                    !left_val.is_truthy()
                };

                if decided {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        name.lexeme,
                        value.clone(),
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(name.lexeme, value.clone(), name.line)?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut arg_values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg)?);
                }

                self.invoke_callable(callee_val, paren, arg_values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::type_error(
                    name.line,
                    "Only instances have properties.",
                )),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::type_error(
                        name.line,
                        "Only instances have fields.",
                    ));
                };

                let value = self.evaluate(value)?;
                instance.set(name.lexeme, value.clone());
                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, op: &Token<'a>, expr: &'a Expr<'a>) -> IResult<Value<'a>> {
        let right_val = self.evaluate(expr)?;

        match op.kind {
            TokenKind::Minus => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::type_error(
                    op.line,
                    "Operand must be a number.",
                )),
            },
            TokenKind::Bang => Ok(Value::Bool(!right_val.is_truthy())),
            _ => Err(RuntimeError::Internal(format!(
                "invalid unary operator '{}'",
                op.lexeme
            ))),
        }
    }

    /// Evaluates a binary expression; both sides are evaluated, left first.
    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        op: &Token<'a>,
        right: &'a Expr<'a>,
    ) -> IResult<Value<'a>> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;
        trace!("Left operand: {}, Right operand: {}", left_val, right_val);

        match op.kind {
            TokenKind::Plus => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::type_error(
                    op.line,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenKind::Minus => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }
            TokenKind::Star => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }
            // IEEE semantics: x / 0 is ±inf or NaN, not an error.
            TokenKind::Slash => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Number(a / b))
            }
            TokenKind::Greater => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a > b))
            }
            TokenKind::GreaterEqual => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a >= b))
            }
            TokenKind::Less => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a < b))
            }
            TokenKind::LessEqual => {
                let (a, b) = number_operands(op, &left_val, &right_val)?;
                Ok(Value::Bool(a <= b))
            }
            TokenKind::EqualEqual => Ok(Value::Bool(left_val == right_val)),
            TokenKind::BangEqual => Ok(Value::Bool(left_val != right_val)),
            _ => Err(RuntimeError::Internal(format!(
                "invalid binary operator '{}'",
                op.lexeme
            ))),
        }
    }

    /// Resolved names go straight to their scope; unresolved ones are globals.
    fn look_up_variable(&self, id: ExprId, name: &Token<'a>) -> IResult<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => self.environment.borrow().get_at(distance, name.lexeme),
            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    /// `super.method`: look the method up from the superclass captured next
    /// to the method, and bind it to the current `this`.
    fn evaluate_super(
        &mut self,
        id: ExprId,
        keyword: &Token<'a>,
        method: &Token<'a>,
    ) -> IResult<Value<'a>> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            RuntimeError::Internal(format!("unresolved 'super' on line {}", keyword.line))
        })?;

        let Value::Callable(Callable::Class(superclass)) =
            self.environment.borrow().get_at(distance, "super")?
        else {
            return Err(RuntimeError::Internal("'super' is not a class".to_string()));
        };

        // `this` lives in the scope just inside the one holding `super`.
        let this_distance = distance
            .checked_sub(1)
            .ok_or_else(|| RuntimeError::Internal("'super' resolved at depth 0".to_string()))?;

        let Value::Instance(instance) = self.environment.borrow().get_at(this_distance, "this")?
        else {
            return Err(RuntimeError::Internal("'this' is not an instance".to_string()));
        };

        let method_fn = superclass
            .find_method(method.lexeme)
            .ok_or_else(|| RuntimeError::UndefinedProperty {
                name: method.lexeme.to_string(),
                line: method.line,
            })?;

        Ok(Value::Callable(Callable::Function(method_fn.bind(instance))))
    }

    /// Arity-check and dispatch a call.
    fn invoke_callable(
        &mut self,
        callee_val: Value<'a>,
        paren_token: &Token<'a>,
        arg_values: Vec<Value<'a>>,
    ) -> IResult<Value<'a>> {
        let Value::Callable(callable) = callee_val else {
            return Err(RuntimeError::NotCallable {
                line: paren_token.line,
            });
        };

        if arg_values.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arg_values.len(),
                line: paren_token.line,
            });
        }

        let result = match &callable {
            Callable::Native(native) => native.call(&arg_values, paren_token.line),
            Callable::Function(function) => function.call(self, arg_values),
            Callable::Class(class) => Class::instantiate(class, self, arg_values),
        }?;

        debug!("{} returned: {}", callable, result);
        Ok(result)
    }
}

fn evaluate_literal<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn number_operands(op: &Token<'_>, left: &Value<'_>, right: &Value<'_>) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => {
            debug!(
                "'{}' applied to {} and {}",
                op.lexeme,
                left.type_name(),
                right.type_name()
            );
            Err(RuntimeError::type_error(op.line, "Operands must be numbers."))
        }
    }
}
