//! The tree-walking evaluator.
//!
//! Execution is single-threaded and purely recursive over the AST.  The only
//! state beyond the resolution table is the current-environment pointer,
//! which block execution swaps and restores on every exit path.
//!
//! Variable access comes in two flavours: references the resolver recorded
//! go straight to the frame at the recorded distance (`get_at`/`assign_at`);
//! unrecorded references fall back to dynamic lookup in the global frame.
//!
//! The one non-local control transfer is [`Interrupt::Return`], threaded
//! through statement execution as the `Err` arm of [`IResult`] and consumed
//! only at the function-call boundary.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, RuntimeErrorKind};
use crate::expr::{Expr, LiteralValue};
use crate::function::LoxFunction;
use crate::native::{default_natives, NativeFunction};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Why statement execution stopped early: a genuine runtime error, or a
/// `return` unwinding to the nearest enclosing call.
#[derive(Debug, Error)]
pub enum Interrupt {
    #[error(transparent)]
    Error(#[from] LoxError),

    #[error("return signal with value: {0}")]
    Return(Value),
}

/// Convenient alias for evaluator results.
pub type IResult<T> = Result<T, Interrupt>;

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,

    /// Resolution table: expression node id -> binding distance.  Written by
    /// the resolver before execution, read-only afterwards.  Absent entries
    /// mean "look up by name in the global frame".
    locals: HashMap<usize, usize>,

    /// Sink for `print`; stdout by default, swappable for tests and hosts.
    output: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    /// An interpreter with the default natives, printing to stdout.
    pub fn new() -> Self {
        Self::configure(default_natives(), Rc::new(RefCell::new(io::stdout())))
    }

    /// Build an interpreter from an explicit native registry and output
    /// sink.  The natives are installed into the global frame up front.
    pub fn configure(natives: Vec<NativeFunction>, output: Rc<RefCell<dyn Write>>) -> Self {
        info!("Initializing interpreter with {} native(s)", natives.len());

        let globals = Rc::new(RefCell::new(Environment::new()));

        for native in natives {
            debug!("Registering native function '{}'", native.name);

            let name = native.name.clone();
            globals
                .borrow_mut()
                .define(&name, Value::NativeFunction(Rc::new(native)));
        }

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record a binding distance for a resolved local reference.  Called by
    /// the resolver; entries never change once set.
    pub fn resolve(&mut self, id: usize, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> crate::error::Result<()> {
        debug!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}

                Err(Interrupt::Error(e)) => return Err(e),

                // The resolver rejects top-level `return`, so a Return
                // surviving to here means the call boundary failed to
                // consume it.
                Err(Interrupt::Return(_)) => unreachable!("return escaped its call boundary"),
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ────────────────────────────── statements ──────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                debug!("print: {}", value);

                writeln!(self.output.borrow_mut(), "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("var '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let frame = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(frame)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure captures the current environment by reference,
                // so later mutation of captured variables is shared.
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("return {}", value);

                Err(Interrupt::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Class declaration, in binding order: the class name is bound (to nil)
    /// in its enclosing scope *before* the method table is evaluated, and
    /// the finished class value is assigned into that binding at the end.
    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<crate::stmt::FunctionDecl>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::TypeMismatch,
                        expr.line(),
                        "Superclass must be a class.",
                    )
                    .into());
                }
            },

            None => None,
        };

        // Methods close over a synthetic frame binding "super" when a
        // superclass exists, otherwise over the declaring frame.
        let previous = self.environment.clone();

        if let Some(ref sc) = superclass_value {
            let frame = Environment::with_enclosing(self.environment.clone());
            self.environment = Rc::new(RefCell::new(frame));
            self.environment
                .borrow_mut()
                .define("super", Value::Class(sc.clone()));
        }

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function =
                LoxFunction::new(method.clone(), self.environment.clone(), is_initializer);

            method_table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Rc::new(LoxClass::new(
            name.lexeme.clone(),
            superclass_value,
            method_table,
        ));

        self.environment = previous;

        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name.line)?;

        info!("Class '{}' declared", name.lexeme);

        Ok(())
    }

    /// Run `statements` in `environment`, restoring the prior frame on every
    /// exit path (normal, error, or return-unwind).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());

        for stmt in statements {
            result = self.execute(stmt);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    // ───────────────────────────── expressions ──────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        let value = match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            },

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // Short-circuit, returning the actual operand value.
                let short_circuits = match operator.token_type {
                    TokenType::OR => is_truthy(&left_value),
                    _ => !is_truthy(&left_value),
                };

                if short_circuits {
                    left_value
                } else {
                    self.evaluate(right)?
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id)?,

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        Environment::assign_at(
                            &self.environment,
                            *distance,
                            &name.lexeme,
                            value.clone(),
                        );
                    }

                    None => {
                        self.globals.borrow_mut().assign(
                            &name.lexeme,
                            value.clone(),
                            name.line,
                        )?;
                    }
                }

                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());

                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(&callee_value, paren, &args)?
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name)?,

                _ => {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::NotAnInstance,
                        name.line,
                        "Only instances have properties.",
                    )
                    .into());
                }
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::NotAnInstance,
                        name.line,
                        "Only instances have fields.",
                    )
                    .into());
                };

                let value = self.evaluate(value)?;

                instance.borrow_mut().set(name, value.clone());

                value
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id)?,

            Expr::Super {
                id,
                keyword: _,
                method,
            } => self.evaluate_super(*id, method)?,
        };

        Ok(value)
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_value))),

            TokenType::MINUS => match right_value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    RuntimeErrorKind::TypeMismatch,
                    operator.line,
                    "Operand must be a number.",
                )
                .into()),
            },

            _ => unreachable!("parser produced an invalid unary operator"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        let value = match operator.token_type {
            TokenType::EQUAL_EQUAL => Value::Bool(left_value == right_value),

            TokenType::BANG_EQUAL => Value::Bool(left_value != right_value),

            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),

                (Value::String(a), Value::String(b)) => Value::String(a + &b),

                _ => {
                    return Err(LoxError::runtime(
                        RuntimeErrorKind::TypeMismatch,
                        operator.line,
                        "Operands must be two numbers or two strings.",
                    )
                    .into());
                }
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Number(a - b)
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Number(a * b)
            }

            TokenType::SLASH => {
                // IEEE semantics throughout: x/0 is infinity, no guard.
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Number(a / b)
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Bool(a > b)
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Bool(a >= b)
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Bool(a < b)
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, left_value, right_value)?;
                Value::Bool(a <= b)
            }

            _ => unreachable!("parser produced an invalid binary operator"),
        };

        Ok(value)
    }

    /// `super.m`: the superclass lives at the recorded distance, `this` one
    /// frame nearer; the looked-up method is bound to that instance.
    fn evaluate_super(&mut self, id: usize, method: &Token) -> IResult<Value> {
        let distance = *self
            .locals
            .get(&id)
            .expect("'super' expression missing from the resolution table");

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' frame holds a non-class value"),
        };

        let instance = match Environment::get_at(&self.environment, distance - 1, "this") {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' frame holds a non-instance value"),
        };

        let Some(found) = superclass.find_method(&method.lexeme) else {
            return Err(LoxError::runtime(
                RuntimeErrorKind::UndefinedProperty,
                method.line,
                format!("Undefined property '{}'.", method.lexeme),
            )
            .into());
        };

        Ok(Value::Function(Rc::new(found.bind(instance))))
    }

    fn look_up_variable(&self, name: &Token, id: usize) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(distance) => Ok(Environment::get_at(
                &self.environment,
                *distance,
                &name.lexeme,
            )),

            None => Ok(self.globals.borrow().get(&name.lexeme, name.line)?),
        }
    }

    /// Dispatch a call over the three callable value kinds.
    fn invoke_callable(
        &mut self,
        callee: &Value,
        paren: &Token,
        arguments: &[Value],
    ) -> IResult<Value> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(native.arity, arguments.len(), paren.line)?;

                (native.func)(arguments).map_err(|message| {
                    LoxError::runtime(RuntimeErrorKind::TypeMismatch, paren.line, message).into()
                })
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren.line)?;

                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren.line)?;

                LoxClass::construct(class, self, arguments)
            }

            _ => Err(LoxError::runtime(
                RuntimeErrorKind::NotCallable,
                paren.line,
                "Can only call functions and classes.",
            )
            .into()),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// nil and false are falsy; every other value (including 0 and "") is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn check_arity(expected: usize, got: usize, line: usize) -> Result<(), Interrupt> {
    if expected == got {
        return Ok(());
    }

    Err(LoxError::runtime(
        RuntimeErrorKind::ArityMismatch,
        line,
        format!("Expected {} arguments but got {}.", expected, got),
    )
    .into())
}

fn number_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64), LoxError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),

        _ => Err(LoxError::runtime(
            RuntimeErrorKind::TypeMismatch,
            operator.line,
            "Operands must be numbers.",
        )),
    }
}
