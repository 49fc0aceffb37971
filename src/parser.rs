/*!
Recursive-descent parser for Lox.

Grammar (EBNF, Crafting Interpreters dialect):

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fun" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | printStmt
               | returnStmt | whileStmt | block ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
exprStmt       → expression ";" ;
printStmt      → "print" expression ";" ;
returnStmt     → "return" expression? ";" ;
whileStmt      → "while" "(" expression ")" statement ;
block          → "{" declaration* "}" ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → term ( ( ">" | ">=" | "<" | "<=" ) term )* ;
term           → factor ( ( "-" | "+" ) factor )* ;
factor         → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | IDENT | "(" expression ")" | "super" "." IDENT ;
```

`for` loops are desugared here into `Block`/`While`/`Var`, so the statement
AST stays closed over the nine core variants.

Each token is consumed once; `synchronize()` discards tokens up to the next
statement boundary after a parse error so the pass can report every error in
one run.
*/

use std::rc::Rc;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Hard cap on call arguments and function parameters.
const MAX_ARGS: usize = 255;

/// Recursive-descent parser over a scanned token buffer.
///
/// The parser is also the authority on AST node identity: every
/// Variable/Assign/This/Super expression receives a unique `id` from a
/// monotonically increasing counter.  Hosts that parse repeatedly into the
/// same interpreter (the REPL) must thread the counter through
/// [`Parser::starting_at`] so ids never collide across inputs.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: usize,
}

impl Parser {
    /// Create a parser with node ids starting from zero.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::starting_at(tokens, 0)
    }

    /// Create a parser whose first node id is `first_id`.
    pub fn starting_at(tokens: Vec<Token>, first_id: usize) -> Self {
        info!("Parser created over {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            next_id: first_id,
        }
    }

    /// The next id this parser would hand out; a REPL passes this to the
    /// parser for the following input line.
    pub fn next_node_id(&self) -> usize {
        self.next_id
    }

    /// Parse a whole program.  All parse errors are collected; the AST is
    /// only returned when there were none.
    pub fn parse(&mut self) -> std::result::Result<Vec<Stmt>, Vec<LoxError>> {
        let mut statements: Vec<Stmt> = Vec::new();
        let mut errors: Vec<LoxError> = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),

                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);
                    errors.push(e);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            info!("Parsed {} statement(s)", statements.len());
            Ok(statements)
        } else {
            Err(errors)
        }
    }

    /// Parse a single expression (the `evaluate`/`parse` CLI subcommands).
    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.expression()
    }

    // ───────────────────────────── declarations ─────────────────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        if self.advance_if(&TokenType::CLASS) {
            return self.class_declaration();
        }

        if self.advance_if(&TokenType::FUN) {
            return Ok(Stmt::Function(self.function("function")?));
        }

        if self.advance_if(&TokenType::VAR) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expect class name.")?;

        let superclass = if self.advance_if(&TokenType::LESS) {
            let super_name = self.consume(&TokenType::IDENTIFIER, "Expect superclass name.")?;

            Some(Expr::Variable {
                id: self.fresh_id(),
                name: super_name,
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expect '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after class body.")?;

        debug!(
            "Parsed class '{}' with {} method(s)",
            name.lexeme,
            methods.len()
        );

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name = self.consume(&TokenType::IDENTIFIER, format!("Expect {} name.", kind))?;

        self.consume(
            &TokenType::LEFT_PAREN,
            format!("Expect '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(self.error_at_peek("Can't have more than 255 parameters."));
                }

                params.push(self.consume(&TokenType::IDENTIFIER, "Expect parameter name.")?);

                if !self.advance_if(&TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after parameters.")?;
        self.consume(
            &TokenType::LEFT_BRACE,
            format!("Expect '{{' before {} body.", kind),
        )?;

        let body = self.block()?;

        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expect variable name.")?;

        let initializer = if self.advance_if(&TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expect ';' after variable declaration.",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ────────────────────────────── statements ──────────────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.advance_if(&TokenType::FOR) {
            return self.for_statement();
        }

        if self.advance_if(&TokenType::IF) {
            return self.if_statement();
        }

        if self.advance_if(&TokenType::PRINT) {
            let value = self.expression()?;
            self.consume(&TokenType::SEMICOLON, "Expect ';' after value.")?;

            return Ok(Stmt::Print(value));
        }

        if self.advance_if(&TokenType::RETURN) {
            return self.return_statement();
        }

        if self.advance_if(&TokenType::WHILE) {
            return self.while_statement();
        }

        if self.advance_if(&TokenType::LEFT_BRACE) {
            return Ok(Stmt::Block(self.block()?));
        }

        let expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expect ';' after expression.")?;

        Ok(Stmt::Expression(expr))
    }

    /// Desugar `for (init; cond; incr) body` into the equivalent
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'for'.")?;

        let initializer = if self.advance_if(&TokenType::SEMICOLON) {
            None
        } else if self.advance_if(&TokenType::VAR) {
            Some(self.var_declaration()?)
        } else {
            let expr = self.expression()?;
            self.consume(&TokenType::SEMICOLON, "Expect ';' after loop initializer.")?;

            Some(Stmt::Expression(expr))
        };

        let condition = if self.check(&TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(&TokenType::SEMICOLON, "Expect ';' after loop condition.")?;

        let increment = if self.check(&TokenType::RIGHT_PAREN) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(incr) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(incr)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::True));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.advance_if(&TokenType::ELSE) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        let value = if self.check(&TokenType::SEMICOLON) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(&TokenType::SEMICOLON, "Expect ';' after return value.")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// The opening `{` has already been consumed.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expect '}' after block.")?;

        Ok(statements)
    }

    // ───────────────────────────── expressions ──────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.logic_or()?;

        if self.advance_if(&TokenType::EQUAL) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: self.fresh_id(),
                    name,
                    value,
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),

                _ => Err(LoxError::parse(equals.line, "Invalid assignment target.")),
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> Result<Expr> {
        let mut expr = self.logic_and()?;

        while self.advance_if(&TokenType::OR) {
            let operator = self.previous().clone();
            let right = self.logic_and()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.advance_if(&TokenType::AND) {
            let operator = self.previous().clone();
            let right = self.equality()?;

            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.advance_if_any(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.advance_if_any(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;

        while self.advance_if_any(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.advance_if_any(&[TokenType::SLASH, TokenType::STAR]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.advance_if_any(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.advance_if(&TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.advance_if(&TokenType::DOT) {
                let name =
                    self.consume(&TokenType::IDENTIFIER, "Expect property name after '.'.")?;

                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(self.error_at_peek("Can't have more than 255 arguments."));
                }

                arguments.push(self.expression()?);

                if !self.advance_if(&TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren = self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after arguments.")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let token_type = self.peek().token_type.clone();

        let expr = match token_type {
            TokenType::FALSE => {
                self.advance();
                Expr::Literal(LiteralValue::False)
            }

            TokenType::TRUE => {
                self.advance();
                Expr::Literal(LiteralValue::True)
            }

            TokenType::NIL => {
                self.advance();
                Expr::Literal(LiteralValue::Nil)
            }

            TokenType::NUMBER(n) => {
                self.advance();
                Expr::Literal(LiteralValue::Number(n))
            }

            TokenType::STRING(s) => {
                self.advance();
                Expr::Literal(LiteralValue::Str(s))
            }

            TokenType::THIS => {
                let keyword = self.advance().clone();

                Expr::This {
                    id: self.fresh_id(),
                    keyword,
                }
            }

            TokenType::SUPER => {
                let keyword = self.advance().clone();
                self.consume(&TokenType::DOT, "Expect '.' after 'super'.")?;
                let method =
                    self.consume(&TokenType::IDENTIFIER, "Expect superclass method name.")?;

                Expr::Super {
                    id: self.fresh_id(),
                    keyword,
                    method,
                }
            }

            TokenType::IDENTIFIER => {
                let name = self.advance().clone();

                Expr::Variable {
                    id: self.fresh_id(),
                    name,
                }
            }

            TokenType::LEFT_PAREN => {
                self.advance();
                let inner = self.expression()?;
                self.consume(&TokenType::RIGHT_PAREN, "Expect ')' after expression.")?;

                Expr::Grouping(Box::new(inner))
            }

            _ => return Err(self.error_at_peek("Expect expression.")),
        };

        Ok(expr)
    }

    // ─────────────────────────────── plumbing ───────────────────────────────

    fn fresh_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        // The scanner always terminates the buffer with EOF.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    /// Discriminant comparison, so `NUMBER(_)`/`STRING(_)` match any payload.
    fn check(&self, tt: &TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == *tt
    }

    /// Consume the next token iff it has the given type.
    fn advance_if(&mut self, tt: &TokenType) -> bool {
        if self.check(tt) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance_if_any(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn consume(&mut self, tt: &TokenType, msg: impl Into<String>) -> Result<Token> {
        if self.check(tt) {
            return Ok(self.advance().clone());
        }

        Err(self.error_at_peek(msg))
    }

    fn error_at_peek(&self, msg: impl Into<String>) -> LoxError {
        let token = self.peek();
        let msg: String = msg.into();

        if token.token_type == TokenType::EOF {
            LoxError::parse(token.line, format!("at end: {}", msg))
        } else {
            LoxError::parse(token.line, format!("at '{}': {}", token.lexeme, msg))
        }
    }

    /// Discard tokens until a likely statement boundary, so one error does
    /// not cascade into dozens of bogus follow-ups.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN => return,

                _ => {
                    self.advance();
                }
            }
        }
    }
}
