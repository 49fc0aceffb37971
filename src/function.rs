//! User-defined functions and methods.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{IResult, Interpreter, Interrupt};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A closure: a function declaration paired with the environment in effect
/// at its definition, captured by reference.
///
/// Every call builds a fresh frame parented at the *captured* environment,
/// never at the caller's, which is what makes scoping lexical rather than
/// dynamic.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a bound method: a copy of this closure whose environment
    /// pre-defines `this` as the given instance.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the closure.  The caller has already checked arity.
    ///
    /// An initializer always evaluates to the bound instance, no matter what
    /// its body returns; a bare `return;` elsewhere yields nil.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> IResult<Value> {
        debug!("calling <fn {}>", self.name());

        let environment = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));

        for (param, argument) in self.declaration.params.iter().zip(arguments.iter()) {
            environment
                .borrow_mut()
                .define(&param.lexeme, argument.clone());
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Interrupt::Return(value)) => {
                if self.is_initializer {
                    Ok(Environment::get_at(&self.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }

            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for LoxFunction {
    // Shallow on purpose: the captured environment can reach this function
    // again through its own binding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
