//! # Mica Compiler Library
//!
//! The compiler core for Mica, a small statically typed, C-like procedural
//! language: variables and constants, functions, structs, loops and
//! conditionals, scalar arithmetic with explicit casts.
//!
//! ## Pipeline
//!
//! ```text
//! Source -> Lexer -> Parser (inline semantic checks) -> typed AST -> LLVM IR
//! ```
//!
//! Semantic analysis is not a separate pass. Every statement production
//! resolves names, checks types, and only then builds its node, so the AST
//! that reaches lowering is already validated; lowering is a single walk
//! that emits IR through [inkwell](https://crates.io/crates/inkwell).
//!
//! ## Quick Start
//!
//! ### Lexing
//!
//! ```rust
//! use micac::Lexer;
//!
//! let source = "var int x = 42;";
//! for token in Lexer::new(source) {
//!     println!("{:?}", token.kind);
//! }
//! ```
//!
//! ### Parsing
//!
//! ```rust
//! use micac::Parser;
//!
//! let source = "var int x = 41; x = x + 1;";
//! let mut parser = Parser::new(source);
//! let program = parser.parse_program().expect("program parses");
//! assert_eq!(program.statements.len(), 2);
//! ```
//!
//! ### Diagnostics
//!
//! Compilation is fail-fast: the first violation aborts with a single
//! [`CompileError`] that renders as `Line: <n> | Error: <message>`.
//!
//! ```rust
//! use micac::Parser;
//!
//! let mut parser = Parser::new("var int x = true;");
//! let err = parser.parse_program().unwrap_err();
//! assert!(err.to_string().starts_with("Line: 1 | Error:"));
//! ```
//!
//! ## Module Overview
//!
//! - [`span`] - Source spans and line recovery
//! - [`lexer`] - Tokenization (logos-derived)
//! - [`types`] - The Mica type system and equivalence rules
//! - [`ast`] - Typed AST node enums
//! - [`scope`] - Symbol table and lexical scope stack
//! - [`diagnostics`] - Errors, warnings, result alias
//! - [`parser`] - Statement grammar and the two-stack expression engine
//! - [`codegen`] - AST to LLVM IR lowering, verification, JIT execution

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod span;
pub mod types;

// Re-export commonly used types
pub use diagnostics::{CompileError, CompileResult, ErrorKind, Warning};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use span::Span;
