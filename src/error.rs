// ABOUTME: Error kinds and the runtime error type raised by the interpreter

use thiserror::Error;

/// Every failure the interpreter can raise, ordered so the numeric value of
/// a kind doubles as the process exit code for uncaught errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorKind {
    Arity = 1,
    Type = 2,
    Lookup = 3,
    Internal = 4,
    Syntax = 5,
    System = 6,
    Raise = 7,
    Warn = 8,
    Div = 9,
}

impl ErrorKind {
    /// Short lowercase name, used in error output and backtraces.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Arity => "arity",
            ErrorKind::Type => "type",
            ErrorKind::Lookup => "lookup",
            ErrorKind::Internal => "internal",
            ErrorKind::Syntax => "syntax",
            ErrorKind::System => "system",
            ErrorKind::Raise => "raise",
            ErrorKind::Warn => "warn",
            ErrorKind::Div => "div",
        }
    }

    /// Process exit code for an uncaught error of this kind.
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A runtime failure: a kind plus a human-readable message.
///
/// Raising is modeled as returning `Err(LispError)` and letting `?` carry it
/// to the nearest handler; the execution context unwinds its stacks when one
/// reaches the top level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct LispError {
    pub kind: ErrorKind,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, LispError>;

impl LispError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        LispError {
            kind,
            message: message.into(),
        }
    }

    pub fn arity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Lookup, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::System, message)
    }

    pub fn div(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Div, message)
    }
}
