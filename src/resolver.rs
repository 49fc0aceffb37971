//! Static resolver pass.
//!
//! One AST walk does three things:
//! 1. Simulate lexical scopes with a stack of `HashMap<String, bool>`
//!    records (false = declared, true = initialized), without executing
//!    anything.
//! 2. Report static errors: reading a variable in its own initializer,
//!    redeclaration within a scope, `return` outside a function, a value
//!    `return` inside `init`, `this`/`super` misuse, self-inheritance.
//! 3. Record, for every variable occurrence that matches a local
//!    declaration, its binding distance (0 = innermost) in the
//!    interpreter's table.  Unmatched occurrences stay unrecorded and fall
//!    back to global lookup at run time.
//!
//! Errors are *collected*, not fatal to the pass, so one walk reports them
//! all; any reported error must gate execution of the whole program.

use std::collections::HashMap;
use std::mem;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body we are inside, used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body we are inside, used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances by calling back into the interpreter.
pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl<'interp> Resolver<'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements and return every static error found.
    /// An empty result means the program may execute.
    pub fn resolve(mut self, statements: &[Stmt]) -> Vec<LoxError> {
        info!("Resolve pass over {} statement(s)", statements.len());

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        self.errors
    }

    // ─────────────────────────── statement walk ─────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare -> resolve initializer -> define, so the name is
                // visible-but-poisoned inside its own initializer.
                self.declare(name);

                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                self.define(name);
            }

            Stmt::Function(declaration) => {
                // The function name is resolved in its enclosing scope
                // before its own body, enabling recursion by name.
                self.declare(&declaration.name);
                self.define(&declaration.name);

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword.line, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
    ) {
        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(name);
        self.define(name);

        if let Some(expr) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = expr
            {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name.line, "A class can't inherit from itself.");
                }
            }

            self.resolve_expr(expr);

            self.current_class = ClassType::Subclass;

            // Synthetic scope binding "super"; one frame outside "this", so
            // the two distances always differ by exactly one.
            self.begin_scope();
            self.define_keyword("super");
        }

        self.begin_scope();
        self.define_keyword("this");

        for method in methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(method, declaration);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing = mem::replace(&mut self.current_function, function_type);

        self.begin_scope();

        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }

        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────── expression walk ────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }

                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword.line, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, &keyword.lexeme);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword.line, "Can't use 'super' outside of a class.");
                    }

                    ClassType::Class => {
                        self.error(
                            keyword.line,
                            "Can't use 'super' in a class with no superclass.",
                        );
                    }

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, &keyword.lexeme);
            }
        }
    }

    // ─────────────────────────── scope management ───────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.error(
                    name.line,
                    "Already a variable with this name in this scope.",
                );
                return;
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Bind a synthetic name ("this"/"super") in the innermost scope.
    fn define_keyword(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    /// Record this occurrence as a local at the innermost matching depth, or
    /// leave it unrecorded (global) when no scope declares the name.
    fn resolve_local(&mut self, id: usize, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);

                self.interpreter.resolve(id, depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }

    fn error(&mut self, line: usize, message: &str) {
        self.errors.push(LoxError::resolve(line, message));
    }
}
