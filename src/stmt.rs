use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;

/// A function or method declaration: name, ordered parameters, body.
///
/// Shared via `Rc` so closures can hold their declaration without cloning
/// the body on every function value.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// **Abstract-syntax-tree node** for *statements*.  A program is a sequence
/// of these nodes returned by the parser.
///
/// Surface `for` loops are desugared by the parser into `Block`/`While`/`Var`
/// so this set stays closed.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Stand-alone expression terminated by a semicolon.
    Expression(Expr),

    /// `print` statement.
    Print(Expr),

    /// Variable declaration: `"var" IDENT ("=" initializer)? ";"`.
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    /// `if` / `else` conditional.
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop; the condition is re-evaluated fresh each iteration.
    While { condition: Expr, body: Box<Stmt> },

    /// Function declaration.
    Function(Rc<FunctionDecl>),

    /// `return` with an optional value (absent means nil).
    Return {
        keyword: Token,
        value: Option<Expr>,
    },

    /// Class declaration with an optional superclass (always a
    /// `Expr::Variable` when present) and a list of methods.
    Class {
        name: Token,
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
