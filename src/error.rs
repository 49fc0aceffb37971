//! Centralised error hierarchy for the **rlox** interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow`, while still preserving rich diagnostic
//! detail.
//!
//! The module **does not** print diagnostics itself; the CLI owns formatting
//! and exit codes.

use std::io;

use log::info;
use thiserror::Error;

/// Classification of runtime failures.  Every runtime error carries exactly
/// one of these kinds alongside its message and source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// An operator was applied to operands of the wrong type.
    TypeMismatch,

    /// A name was read or assigned that is bound nowhere in the chain.
    UndefinedVariable,

    /// A property lookup missed both the instance fields and the method chain.
    UndefinedProperty,

    /// The callee of a call expression is not a function or class.
    NotCallable,

    /// A property access targeted a value that is not an instance.
    NotAnInstance,

    /// Argument count did not match the callee's declared arity.
    ArityMismatch,
}

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static-analysis or resolution failure (e.g. early-binding errors).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error.
    #[error("{message}\n[line {line}]")]
    Runtime {
        kind: RuntimeErrorKind,
        message: String,
        line: usize,
    },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF-8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        LoxError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(kind: RuntimeErrorKind, line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Runtime error: kind={:?}, line={}, msg={}",
            kind, line, message
        );

        LoxError::Runtime {
            kind,
            message,
            line,
        }
    }

    /// The runtime kind of this error, if it is a runtime error.
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            LoxError::Runtime { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
