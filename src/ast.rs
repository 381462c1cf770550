//! Abstract syntax tree for Mica.
//!
//! A closed set of node kinds, one enum variant per kind, so statement and
//! lowering dispatch are exhaustive matches. Every expression node carries
//! the semantic type computed while it was built; nothing re-derives types
//! after parsing.

use crate::span::Span;
use crate::types::{Name, Type};

/// Wrapper for f64 that implements Eq and Hash via bit patterns.
///
/// Literal floats come from source text, so NaN never appears in practice,
/// but the derive requirements still need total equality.
#[derive(Debug, Clone, Copy, PartialOrd)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for OrderedFloat {}

impl std::hash::Hash for OrderedFloat {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// A parsed program: the top-level statement sequence in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Variable(VarDecl),
    Assign(Assign),
    /// A bare call in statement position; its value is discarded.
    Call(Call, Span),
    If(If),
    While(While),
    DoWhile(DoWhile),
    For(For),
    Function(Function),
    Struct(StructDecl),
    Return(Return),
    LoopControl(LoopControl),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Variable(v) => v.span,
            Stmt::Assign(a) => a.span,
            Stmt::Call(_, span) => *span,
            Stmt::If(i) => i.span,
            Stmt::While(w) => w.span,
            Stmt::DoWhile(d) => d.span,
            Stmt::For(f) => f.span,
            Stmt::Function(f) => f.span,
            Stmt::Struct(s) => s.span,
            Stmt::Return(r) => r.span,
            Stmt::LoopControl(l) => l.span,
        }
    }
}

/// `var` or `const` introduction keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKeyword {
    Var,
    Const,
}

/// `var int x = 5;` or `const Point p = { 1, 2 };`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub keyword: VarKeyword,
    pub ty: Type,
    pub name: Name,
    pub init: Option<Initializer>,
    pub span: Span,
}

/// Initializer of a variable: a plain expression, or the positional
/// member list of a struct-typed variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Expr(Expr),
    StructMembers(Vec<Expr>),
}

/// Assignment statement. `member` is set for struct member targets
/// (`p.x = v;`), absent for plain identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Name,
    pub member: Option<Name>,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

/// The assignment operator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any.
    pub fn binop(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinOp::Add),
            AssignOp::Sub => Some(BinOp::Sub),
            AssignOp::Mul => Some(BinOp::Mul),
            AssignOp::Div => Some(BinOp::Div),
            AssignOp::Rem => Some(BinOp::Rem),
        }
    }
}

/// `if (cond) { ... } else if (cond) { ... } else { ... }`
///
/// Else-if clauses keep source order; lowering wires fallthrough blocks
/// from it.
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub else_ifs: Vec<ElseIf>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhile {
    pub body: Vec<Stmt>,
    pub cond: Expr,
    pub span: Span,
}

/// `for (init; cond; update) { ... }`; the header introduces its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub init: ForInit,
    pub cond: Expr,
    pub update: Assign,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Variable(VarDecl),
    Assign(Assign),
}

/// `func int add(int a, int b) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub ret: Type,
    pub name: Name,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: Name,
    pub span: Span,
}

/// `struct Point { int x; int y; }`; member order is the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: Name,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub ty: Type,
    pub name: Name,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopControl {
    pub kind: LoopControlKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControlKind {
    Break,
    Continue,
}

/// An expression with its statically computed type.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Name),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Explicit cast `type(expr)`; the target type is the node's `ty`.
    Cast {
        operand: Box<Expr>,
    },
    /// Struct member read `p.x`.
    Member {
        base: Name,
        member: Name,
    },
    Call(Call),
}

/// A call, usable in expression position or as a bare statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Name,
    pub args: Vec<Expr>,
}

/// Literal values, decoded from source text at parse time.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(u64),
    Float(OrderedFloat),
    Char(u8),
    Str(String),
    Bool(bool),
}

/// The only unary operator in the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
