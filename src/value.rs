//! Run-time values.
//!
//! [`Value`] and [`Callable`] are closed sum types: every place that needs to
//! treat values differently (calls, printing, truthiness, equality) matches
//! on them exhaustively.

use std::fmt;
use std::rc::Rc;

use crate::class::{Class, Instance};
use crate::function::{NativeFunction, UserFunction};

#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable<'a>),
    Instance(Rc<Instance<'a>>),
}

/// Anything that can appear before `(...)`.
#[derive(Debug, Clone)]
pub enum Callable<'a> {
    Native(Rc<NativeFunction<'a>>),
    Function(Rc<UserFunction<'a>>),
    Class(Rc<Class<'a>>),
}

impl<'a> Callable<'a> {
    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    fn same(&self, other: &Callable<'a>) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<'a> Value<'a> {
    /// `nil` and `false` are falsey; everything else (`0`, `""`) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(_) | Value::String(_) | Value::Callable(_) | Value::Instance(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Callable(Callable::Native(_)) => "native function",
            Value::Callable(Callable::Function(_)) => "function",
            Value::Callable(Callable::Class(_)) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl<'a> PartialEq for Value<'a> {
    /// Primitives compare by value, with NaN equal to itself.  Functions,
    /// classes and instances compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<'a> fmt::Display for Callable<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => write!(f, "<native fn>"),
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::Class(class) => write!(f, "{}", class.name),
        }
    }
}

impl<'a> fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            // Shortest round-trip decimal, never exponent notation: `2`, `-0`,
            // `1e21` as `1000000000000000000000`.  Rust already prints
            // `2.0_f64` as `2`; strip a stray suffix anyway.
            Value::Number(n) => {
                let text = n.to_string();
                write!(f, "{}", text.strip_suffix(".0").unwrap_or(&text))
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Callable(callable) => write!(f, "{}", callable),

            Value::Instance(instance) => write!(f, "{} instance", instance.class().name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::String(String::new()).is_truthy());
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(Value::Number(2.0).to_string(), "2");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
    }

    #[test]
    fn number_display_edge_cases() {
        assert_eq!(Value::Number(-0.0).to_string(), "-0");
        assert_eq!(Value::Number(1e21).to_string(), "1000000000000000000000");
        assert_eq!(Value::Number(1e-7).to_string(), "0.0000001");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn primitive_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::String("hi".into()).to_string(), "hi");
    }

    #[test]
    fn equality_is_structural_for_primitives() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Number(1.0), Value::String("1".into()));
        assert_eq!(Value::String("a".into()), Value::String("a".into()));
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }
}
