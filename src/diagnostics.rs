//! Compile errors and warnings.
//!
//! Compilation is fail-fast: the first violation anywhere in parsing or
//! lowering aborts the run, so the fallible surface is a single
//! [`CompileError`] carried through [`CompileResult`]. Errors render as
//! `Line: <n> | Error: <message>` on the error stream; warnings use the
//! same prefix but never stop the run.

use crate::span::Span;
use thiserror::Error;

/// Result alias used through parsing and lowering.
///
/// Boxed: the error never sits on a hot path, keep the Ok variant small.
pub type CompileResult<T> = Result<T, Box<CompileError>>;

/// The kinds of compile error, with their display messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("duplicate symbol `{0}`")]
    DuplicateSymbol(String),

    #[error("undeclared symbol `{0}`")]
    UndeclaredSymbol(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("unsupported cast from `{from}` to `{to}`")]
    UnsupportedCast { from: String, to: String },

    #[error("internal lowering error: {0}")]
    Internal(String),
}

/// A fatal compile error with the source line it originated on, when one
/// is known (backend verification failures have none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub line: Option<u32>,
}

impl CompileError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, line: None }
    }

    /// Attach the line of a span; dummy spans carry no line.
    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self {
            kind,
            line: if span.line == 0 { None } else { Some(span.line) },
        }
    }

    /// Convert into the error arm of a [`CompileResult`].
    pub fn into_err<T>(self) -> CompileResult<T> {
        Err(Box::new(self))
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line: {} | Error: {}", line, self.kind),
            None => write!(f, "Error: {}", self.kind),
        }
    }
}

impl std::error::Error for CompileError {}

/// A non-fatal diagnostic; printed with the line prefix, never exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub line: u32,
}

impl Warning {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            line: span.line,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line: {} | Warning: {}", self.line, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_line() {
        let err = CompileError::at(
            ErrorKind::DuplicateSymbol("x".to_string()),
            Span::new(0, 1, 3),
        );
        assert_eq!(err.to_string(), "Line: 3 | Error: duplicate symbol `x`");
    }

    #[test]
    fn test_error_display_without_line() {
        let err = CompileError::new(ErrorKind::Internal("broken module".to_string()));
        assert_eq!(err.to_string(), "Error: internal lowering error: broken module");
    }

    #[test]
    fn test_cast_error_display() {
        let err = CompileError::at(
            ErrorKind::UnsupportedCast {
                from: "string".to_string(),
                to: "int".to_string(),
            },
            Span::new(0, 1, 7),
        );
        assert_eq!(
            err.to_string(),
            "Line: 7 | Error: unsupported cast from `string` to `int`"
        );
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::new("unreachable statement", Span::new(0, 1, 9));
        assert_eq!(warning.to_string(), "Line: 9 | Warning: unreachable statement");
    }
}
