//! Host-supplied native functions.
//!
//! Natives are explicit construction-time configuration: the interpreter is
//! built from a list of [`NativeFunction`]s that it installs into the global
//! frame before any statement runs.  Hosts extend the language by passing
//! additional entries, never by touching the core.

use log::debug;

use crate::value::Value;

/// A host-defined callable with a fixed arity.
///
/// The function receives the already-evaluated arguments; an `Err` message is
/// surfaced as a runtime error at the call site.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        func: fn(&[Value]) -> Result<Value, String>,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func,
        }
    }
}

/// The default registry: just `clock`, returning seconds since the Unix
/// epoch as a number.
pub fn default_natives() -> Vec<NativeFunction> {
    vec![NativeFunction::new("clock", 0, |_args: &[Value]| {
        let seconds: f64 = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

        debug!("native 'clock' -> {}", seconds);

        Ok(Value::Number(seconds))
    })]
}
