//! Scope-chain records.
//!
//! An [`Environment`] is one lexical scope: a name→value map plus a link to
//! the scope it is nested in.  Environments are shared through
//! [`EnvRef`] (`Rc<RefCell<_>>`) because closures keep their defining scope
//! alive after the block that created it has finished, and every closure that
//! captured the same scope must observe the others' writes.

use crate::error::RuntimeError;
use crate::value::Value;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to an environment.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    /// A root scope with no parent (the global scope).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: wrap a fresh child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &EnvRef<'a>) -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(enclosing))))
    }

    /// Bind `name` in this scope.  Re-defining an existing name overwrites it.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        trace!("define '{}'", name);
        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up here, then outward through the enclosing scopes.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Overwrite the nearest existing binding of `name`.  Never creates one.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Read `name` from the scope exactly `distance` links out, without
    /// searching any further.
    pub fn get_at(&self, distance: usize, name: &str) -> Result<Value<'a>, RuntimeError> {
        if distance == 0 {
            return self.values.get(name).cloned().ok_or_else(|| {
                RuntimeError::Internal(format!("resolved binding '{}' is missing", name))
            });
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name),
            None => Err(RuntimeError::Internal(format!(
                "scope chain too short while looking up '{}'",
                name
            ))),
        }
    }

    /// Write `name` into the scope exactly `distance` links out.
    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &str,
        value: Value<'a>,
    ) -> Result<(), RuntimeError> {
        if distance == 0 {
            return match self.values.get_mut(name) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(RuntimeError::Internal(format!(
                    "resolved binding '{}' is missing",
                    name
                ))),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign_at(distance - 1, name, value),
            None => Err(RuntimeError::Internal(format!(
                "scope chain too short while assigning '{}'",
                name
            ))),
        }
    }
}
