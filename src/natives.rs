//! Host-provided functions registered in the global scope.

use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use log::debug;

use crate::environment::Environment;
use crate::function::NativeFunction;
use crate::value::{Callable, Value};

/// Arbitrary but fixed zero point for `clock()`, shared by every interpreter in
/// the process so readings never go backwards.
static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

/// `clock()`: milliseconds since [`CLOCK_EPOCH`], as a number.
fn clock<'a>(_args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let epoch: &Instant = CLOCK_EPOCH.get_or_init(Instant::now);
    let millis: f64 = epoch.elapsed().as_secs_f64() * 1000.0;

    Ok(Value::Number(millis))
}

/// Define every native in `globals`.
pub fn install(globals: &mut Environment<'_>) {
    CLOCK_EPOCH.get_or_init(Instant::now);

    debug!("Defining native function 'clock'");

    globals.define(
        "clock",
        Value::Callable(Callable::Native(Rc::new(NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        }))),
    );
}
