use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::RuntimeError;
use crate::function::UserFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{Callable, Value};

/// Name of the method run automatically when a class is called.
pub const INITIALIZER: &str = "init";

pub struct Class<'a> {
    pub name: String,
    superclass: Option<Rc<Class<'a>>>,
    methods: HashMap<String, Rc<UserFunction<'a>>>,
}

impl<'a> Class<'a> {
    pub fn new(
        name: &str,
        superclass: Option<Rc<Class<'a>>>,
        methods: HashMap<String, Rc<UserFunction<'a>>>,
    ) -> Self {
        Class {
            name: name.to_string(),
            superclass,
            methods,
        }
    }

    /// Look in this class, then each ancestor in turn.
    pub fn find_method(&self, name: &str) -> Option<Rc<UserFunction<'a>>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    /// Arity of `init`, or 0 when no class in the chain defines one.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    /// Calling a class: allocate an instance and run `init` on it if present.
    pub fn instantiate(
        class: &Rc<Class<'a>>,
        interpreter: &mut Interpreter<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>, RuntimeError> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(Instance::new(Rc::clone(class)));

        if let Some(initializer) = class.find_method(INITIALIZER) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl<'a> fmt::Debug for Class<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        methods.sort_unstable();

        f.debug_struct("Class")
            .field("name", &self.name)
            .field(
                "superclass",
                &self.superclass.as_ref().map(|superclass| &superclass.name),
            )
            .field("methods", &methods)
            .finish()
    }
}

/// An object created by calling a class.  Fields appear on first assignment.
pub struct Instance<'a> {
    class: Rc<Class<'a>>,
    fields: RefCell<HashMap<String, Value<'a>>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class<'a>> {
        &self.class
    }

    /// Property read: a field shadows a method of the same name.
    pub fn get(instance: &Rc<Instance<'a>>, name: &Token<'_>) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = instance.fields.borrow().get(name.lexeme) {
            return Ok(value.clone());
        }

        match instance.class.find_method(name.lexeme) {
            Some(method) => Ok(Value::Callable(Callable::Function(
                method.bind(Rc::clone(instance)),
            ))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.to_string(),
                line: name.line,
            }),
        }
    }

    pub fn set(&self, name: &str, value: Value<'a>) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl<'a> fmt::Debug for Instance<'a> {
    // Fields may point back at this instance, so they are not printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
