use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::class::Instance;
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{ExecOutcome, Interpreter};
use crate::value::Value;

/// Host logic behind a native function.  An `Err` message becomes a
/// [`RuntimeError::Native`] at the call site.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> Result<Value<'a>, String>;

/// A callable implemented in Rust rather than in Lox source.
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn<'a>,
}

impl<'a> NativeFunction<'a> {
    pub fn call(&self, arguments: &[Value<'a>], line: usize) -> Result<Value<'a>, RuntimeError> {
        debug!("Calling native function '{}'", self.name);

        (self.func)(arguments).map_err(|message| RuntimeError::Native { message, line })
    }
}

impl<'a> fmt::Debug for NativeFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// A Lox function or method: its declaration plus the scope it closed over.
///
/// The closure is the *defining* scope, never the caller's.  Nothing here is
/// mutated after construction; [`UserFunction::bind`] builds a new function.
pub struct UserFunction<'a> {
    declaration: &'a FunctionDecl<'a>,
    closure: EnvRef<'a>,
    is_initializer: bool,
}

impl<'a> UserFunction<'a> {
    pub fn new(declaration: &'a FunctionDecl<'a>, closure: EnvRef<'a>, is_initializer: bool) -> Self {
        UserFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &'a str {
        self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// A copy of this method whose closure is a new scope holding only
    /// `this`, nested inside the original closure.
    pub fn bind(&self, instance: Rc<Instance<'a>>) -> Rc<UserFunction<'a>> {
        let environment = Environment::child_of(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Rc::new(UserFunction {
            declaration: self.declaration,
            closure: environment,
            is_initializer: self.is_initializer,
        })
    }

    /// Run the body in a fresh scope whose parent is the closure.
    ///
    /// The caller has already checked the argument count.
    pub fn call(
        &self,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>, RuntimeError> {
        debug!("Calling user-defined function '{}'", self.name());

        let declaration: &'a FunctionDecl<'a> = self.declaration;
        let environment = Environment::child_of(&self.closure);

        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in declaration.params.iter().zip(arguments) {
                scope.define(param.lexeme, argument);
            }
        }

        let outcome = interpreter.execute_block(&declaration.body, environment)?;

        // `init()` always yields the instance, whatever the body returned.
        if self.is_initializer {
            return self.closure.borrow().get_at(0, "this");
        }

        match outcome {
            ExecOutcome::Returning(value) => Ok(value),
            ExecOutcome::Completed => Ok(Value::Nil),
        }
    }
}

impl<'a> fmt::Debug for UserFunction<'a> {
    // The closure is left out: it usually contains this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
