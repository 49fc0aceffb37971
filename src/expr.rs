use crate::token::Token;

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree and
/// therefore do **not** retain a reference to the originating [`Token`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal, stored as IEEE-754 `f64`.  Integral lexemes such as
    /// `"3"` are still parsed as `3.0`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    /// The boolean constant `true`.
    True,

    /// The boolean constant `false`.
    False,

    /// The `nil` literal.
    Nil,
}

/// **Abstract-syntax-tree node** representing every kind of *expression*.
///
/// The four resolvable forms (`Variable`, `Assign`, `This`, `Super`) carry a
/// parser-assigned `id`.  The resolver keys its distance table on that id, so
/// each syntactic occurrence is a distinct identity even after the node is
/// cloned or moved.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub-expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    /// Prefix unary operator expression, e.g. `!isReady` or `-42`.
    Unary {
        /// The operator token (`!` or `-`).
        operator: Token,

        /// Operand to which the operator is applied.
        right: Box<Expr>,
    },

    /// Infix binary operator expression, e.g. `a + b`, `x <= y`.
    Binary {
        left: Box<Expr>,

        /// Operator token such as `+`, `*`, `==`, ...
        operator: Token,

        right: Box<Expr>,
    },

    /// Short-circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Variable access.
    Variable { id: usize, name: Token },

    /// Assignment expression: `identifier "=" expression`.
    Assign {
        id: usize,
        name: Token,
        value: Box<Expr>,
    },

    /// Function- or method-call expression, e.g. `clock()` or `add(1, 2)`.
    Call {
        /// Expression that evaluates to a callable.
        callee: Box<Expr>,

        /// The closing `)` token, retained for error reporting.
        paren: Token,

        /// Argument list (may be empty).
        arguments: Vec<Expr>,
    },

    /// Property access: `object.property`.
    Get { object: Box<Expr>, name: Token },

    /// Property assignment: `object.property = value`.
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: usize, keyword: Token },

    /// `super.method` inside a subclass method.
    Super {
        id: usize,
        keyword: Token,
        method: Token,
    },
}

impl Expr {
    /// Source line of the token anchoring this expression, for diagnostics.
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,

            Expr::Grouping(inner) => inner.line(),

            Expr::Unary { operator, .. } => operator.line,

            Expr::Binary { operator, .. } => operator.line,

            Expr::Logical { operator, .. } => operator.line,

            Expr::Variable { name, .. } => name.line,

            Expr::Assign { name, .. } => name.line,

            Expr::Call { paren, .. } => paren.line,

            Expr::Get { name, .. } => name.line,

            Expr::Set { name, .. } => name.line,

            Expr::This { keyword, .. } => keyword.line,

            Expr::Super { keyword, .. } => keyword.line,
        }
    }
}
