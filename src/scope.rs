//! Lexical scopes and symbols.
//!
//! One stack serves the parser's semantic checks; lowering keeps its own
//! storage scope (see `codegen::context`) with the same nesting. Lookups
//! walk innermost to outermost; declarations always land in the innermost
//! scope. Scopes are tagged with why they were opened, which is what
//! `break`/`continue`/`return` legality checks walk.

use crate::types::{Name, Type};
use std::collections::HashMap;

/// The compile-time record of a declared name.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable {
        ty: Type,
        is_const: bool,
    },
    Function {
        ret: Type,
        params: Vec<Type>,
    },
    Struct {
        /// Ordered member layout; position is the member index.
        members: Vec<(Name, Type)>,
    },
}

/// Why a scope was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Block,
    Loop,
    /// A function body; carries the declared return type.
    Function(Type),
}

#[derive(Debug)]
struct ScopeData {
    kind: ScopeKind,
    symbols: HashMap<Name, Symbol>,
}

/// A stack of name→symbol scopes, outermost first.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<ScopeData>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData {
                kind: ScopeKind::Global,
                symbols: HashMap::new(),
            }],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(ScopeData {
            kind,
            symbols: HashMap::new(),
        });
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "attempted to pop the global scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Current nesting depth; 1 when only the global scope is open.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare into the innermost scope. Returns false if the name is
    /// already declared there (redeclaration in an outer scope shadows
    /// and is fine).
    pub fn declare(&mut self, name: Name, symbol: Symbol) -> bool {
        let innermost = self
            .scopes
            .last_mut()
            .expect("scope stack always holds the global scope");
        if innermost.symbols.contains_key(&name) {
            return false;
        }
        innermost.symbols.insert(name, symbol);
        true
    }

    /// Resolve a name, walking innermost to outermost.
    pub fn lookup(&self, name: Name) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(&name))
    }

    /// Whether parsing is currently inside a loop body. A function scope
    /// cuts the walk: a loop outside the nearest function does not make
    /// its body's `break` legal.
    pub fn in_loop(&self) -> bool {
        for scope in self.scopes.iter().rev() {
            match scope.kind {
                ScopeKind::Loop => return true,
                ScopeKind::Function(_) => return false,
                _ => {}
            }
        }
        false
    }

    /// Declared return type of the innermost enclosing function, if any.
    pub fn current_return(&self) -> Option<Type> {
        self.scopes.iter().rev().find_map(|scope| match scope.kind {
            ScopeKind::Function(ret) => Some(ret),
            _ => None,
        })
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
