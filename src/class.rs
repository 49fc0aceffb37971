//! Classes and instances.
//!
//! A class is its own constructor: calling it allocates an instance, then
//! binds and invokes `init` if the method chain has one.  Method lookup
//! walks the single-parent superclass chain, most-derived class first.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::{LoxError, Result, RuntimeErrorKind};
use crate::function::LoxFunction;
use crate::interpreter::{IResult, Interpreter};
use crate::token::Token;
use crate::value::Value;

pub struct LoxClass {
    name: String,
    superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First match in the most-derived class wins; otherwise recurse into
    /// the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's arity is its initializer's arity, or 0 without one.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map_or(0, |initializer| initializer.arity())
    }

    /// Construct an instance.  The instance is always the result of the call
    /// expression, regardless of what `init` returns.
    pub fn construct(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> IResult<Value> {
        debug!("constructing instance of '{}'", class.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));

        if let Some(initializer) = class.find_method("init") {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// An instance: an immutable class reference plus a field map populated
/// lazily on first assignment.  No declared schema constrains the fields.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property lookup: fields shadow same-named methods; a method hit is
    /// returned *bound* to this instance.
    ///
    /// Associated rather than a method because binding needs the `Rc` handle
    /// to the instance itself.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.borrow().class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(instance.clone()))));
        }

        Err(LoxError::runtime(
            RuntimeErrorKind::UndefinedProperty,
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Unconditionally create or overwrite a field.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for LoxInstance {
    // Shallow on purpose: fields may contain this very instance.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
