//! Parser for Mica.
//!
//! Recursive-descent over statements with a two-stack precedence engine for
//! expressions (`parser/expr.rs`). Semantic analysis is not a separate pass:
//! each production resolves names against the scope stack, checks types, and
//! only then builds its node, so a structurally valid but semantically
//! invalid program is rejected at the point of construction.
//!
//! Parsing is fail-fast: the first violation aborts with a `CompileError`.
//! Non-fatal findings (unreachable statements) are collected as warnings.

mod expr;
mod stmt;

#[cfg(test)]
mod tests;

use crate::ast::Program;
use crate::diagnostics::{CompileError, CompileResult, ErrorKind, Warning};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::scope::{ScopeKind, ScopeStack, Symbol};
use crate::span::Span;
use crate::types::{Name, Type};
use string_interner::DefaultStringInterner;

/// The Mica parser.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    source: &'src str,
    interner: DefaultStringInterner,
    /// Symbol scope used by the inline semantic checks.
    scopes: ScopeStack,
    warnings: Vec<Warning>,
    current: Token,
    next: Token,
    previous: Token,
}

impl<'src> Parser<'src> {
    /// Create a parser for the given source.
    pub fn new(source: &'src str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next().unwrap_or_else(|| Token::dummy(TokenKind::Eof));
        let next = lexer.next().unwrap_or_else(|| Token::dummy(TokenKind::Eof));
        Self {
            lexer,
            source,
            interner: DefaultStringInterner::new(),
            scopes: ScopeStack::new(),
            warnings: Vec::new(),
            current,
            next,
            previous: Token::dummy(TokenKind::Eof),
        }
    }

    /// Parse a whole program: statements until end of input.
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    /// Take ownership of the interner for the lowering phase.
    pub fn take_interner(&mut self) -> DefaultStringInterner {
        std::mem::take(&mut self.interner)
    }

    /// Drain the warnings collected so far.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Current symbol-scope nesting depth (1 = only the global scope).
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    // ============================================================
    // Token helpers
    // ============================================================

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Move to the next token.
    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        self.current = self.next;
        self.next = self
            .lexer
            .next()
            .unwrap_or_else(|| Token::dummy(TokenKind::Eof));
    }

    /// Consume a token of the given kind or fail with a syntax error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(kind) {
            self.advance();
            Ok(self.previous)
        } else {
            self.error_expected(kind.description())
        }
    }

    /// Consume the token if it matches; report whether it did.
    pub(crate) fn try_consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Fail with `expected <what>, found <current>` at the current token.
    pub(crate) fn error_expected<T>(&self, what: &str) -> CompileResult<T> {
        CompileError::at(
            ErrorKind::Syntax(format!(
                "expected {}, found {}",
                what,
                self.current.kind.description()
            )),
            self.current.span,
        )
        .into_err()
    }

    // ============================================================
    // Names and scopes
    // ============================================================

    /// Source text of a span.
    pub(crate) fn text(&self, span: &Span) -> &'src str {
        &self.source[span.start..span.end]
    }

    /// Intern the text of a token (used for identifiers).
    pub(crate) fn name_of(&mut self, token: Token) -> Name {
        let text = self.text(&token.span);
        self.interner.get_or_intern(text)
    }

    /// Resolve an interned name for error messages.
    pub(crate) fn resolve(&self, name: Name) -> &str {
        self.interner.resolve(name).unwrap_or("<unknown>")
    }

    /// Render a type's source-level name for error messages.
    pub(crate) fn type_name(&self, ty: &Type) -> String {
        ty.name(&self.interner)
    }

    /// Run `f` inside a fresh scope of the given kind. The scope pops on
    /// every exit path, so error returns cannot leak a push.
    pub(crate) fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.scopes.push(kind);
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Declare into the innermost scope, failing on redeclaration.
    pub(crate) fn declare(
        &mut self,
        name: Name,
        symbol: Symbol,
        span: Span,
    ) -> CompileResult<()> {
        if self.scopes.declare(name, symbol) {
            Ok(())
        } else {
            CompileError::at(
                ErrorKind::DuplicateSymbol(self.resolve(name).to_string()),
                span,
            )
            .into_err()
        }
    }

    /// Look up a name, failing with `UndeclaredSymbol` if absent.
    pub(crate) fn lookup(&self, name: Name, span: Span) -> CompileResult<&Symbol> {
        match self.scopes.lookup(name) {
            Some(symbol) => Ok(symbol),
            None => CompileError::at(
                ErrorKind::UndeclaredSymbol(self.resolve(name).to_string()),
                span,
            )
            .into_err(),
        }
    }

    /// Resolve the type of `base.member`: the base must be a struct-typed
    /// variable and the member must exist in its declaration.
    pub(crate) fn member_type(
        &self,
        base: Name,
        member: Name,
        base_span: Span,
        member_span: Span,
    ) -> CompileResult<Type> {
        let base_ty = match self.lookup(base, base_span)? {
            Symbol::Variable { ty, .. } => *ty,
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a variable",
                        self.resolve(base)
                    )),
                    base_span,
                )
                .into_err()
            }
        };
        let Type::Struct(struct_name) = base_ty else {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "`{}` is not a struct value",
                    self.resolve(base)
                )),
                base_span,
            )
            .into_err();
        };
        let members = match self.lookup(struct_name, base_span)? {
            Symbol::Struct { members } => members,
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a struct type",
                        self.resolve(struct_name)
                    )),
                    base_span,
                )
                .into_err()
            }
        };
        match members.iter().find(|(name, _)| *name == member) {
            Some((_, ty)) => Ok(*ty),
            None => CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "`{}` has no member `{}`",
                    self.resolve(struct_name),
                    self.resolve(member)
                )),
                member_span,
            )
            .into_err(),
        }
    }

    pub(crate) fn warn(&mut self, message: &str, span: Span) {
        self.warnings.push(Warning::new(message, span));
    }
}
