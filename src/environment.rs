//! Lexical scope frames.
//!
//! Frames form an acyclic chain rooted at the global frame: each frame holds
//! its bindings and a fixed link to its enclosing frame, set at creation and
//! never rewritten.  Shared ownership (`Rc<RefCell<_>>`) keeps a frame alive
//! exactly as long as any closure or live computation can still reach it,
//! which is what lets closures outlive the call that created their defining
//! scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::value::Value;

#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// The root (global) frame.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    /// A frame parented at `enclosing`.
    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite `name` in *this* frame.  Re-declaration is legal
    /// and simply shadows.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}'", name);

        self.values.insert(name.to_string(), value);
    }

    /// Search outward through the chain for `name`.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LoxError::runtime(
                RuntimeErrorKind::UndefinedVariable,
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Overwrite `name` in the nearest frame that already binds it.
    /// Assignment never implicitly creates a binding.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                RuntimeErrorKind::UndefinedVariable,
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Follow exactly `distance` enclosing links from `env`.
    ///
    /// Only ever called for resolver-recorded references, so a short chain is
    /// an internal invariant violation, not a user error.
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut frame = env.clone();

        for _ in 0..distance {
            let next = frame
                .borrow()
                .enclosing
                .as_ref()
                .expect("resolved distance exceeds environment chain")
                .clone();

            frame = next;
        }

        frame
    }

    /// Read `name` from the frame exactly `distance` links out.  No scan.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Environment::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolved local missing from its frame")
    }

    /// Write `name` in the frame exactly `distance` links out.  No scan.
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
        Environment::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
