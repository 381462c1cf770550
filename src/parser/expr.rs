//! Expression parsing: the two-stack precedence engine.
//!
//! One operand stack of typed expressions and one operator stack are
//! maintained while scanning a flat token run. Literals, identifiers,
//! calls, member reads, and casts push operands; a binary operator first
//! reduces every stacked operator of greater-or-equal precedence (all
//! operators are left-associative), then pushes itself. `(` is pushed as a
//! marker that reduction never crosses; `)` reduces down to the matching
//! marker, or, when no marker is on the stack, ends the run with the
//! token left unconsumed so that call argument lists, casts, and
//! parenthesized conditions can share it. The run also ends at any token
//! that cannot continue an expression.
//!
//! Typing happens as nodes are built: operand types must be equivalent
//! (the family relaxation applies, the concrete width winning), comparisons
//! yield `bool`, `&&`/`||`/`!` demand `bool`, arithmetic demands char or a
//! numeric family.

use super::Parser;
use crate::ast::{BinOp, Call, Expr, ExprKind, Literal, OrderedFloat, UnaryOp};
use crate::diagnostics::{CompileError, CompileResult, ErrorKind};
use crate::lexer::{unescape_char, unescape_string, TokenKind};
use crate::scope::Symbol;
use crate::span::Span;
use crate::types::{Name, Type};

/// An operator-stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpEntry {
    Binary(BinOp, Span),
    /// Unary `!`; reduces by popping exactly one operand.
    Not(Span),
    /// `(` marker; reduction stops here.
    Paren(Span),
}

impl OpEntry {
    fn precedence(&self) -> u8 {
        match self {
            OpEntry::Paren(_) => 0,
            OpEntry::Not(_) => 3,
            OpEntry::Binary(op, _) => binary_precedence(*op),
        }
    }

    fn is_paren(&self) -> bool {
        matches!(self, OpEntry::Paren(_))
    }
}

/// The shared precedence table. `&&` sits with `* / %` and `||` with
/// `+ -`, while comparisons bind tightest; the relative orderings are
/// user-observable and kept exactly.
fn binary_precedence(op: BinOp) -> u8 {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Or => 1,
        BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::And => 2,
        BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => 3,
    }
}

/// Map a token to its binary operator, if it is one.
fn token_binop(kind: TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Plus => Some(BinOp::Add),
        TokenKind::Minus => Some(BinOp::Sub),
        TokenKind::Star => Some(BinOp::Mul),
        TokenKind::Slash => Some(BinOp::Div),
        TokenKind::Percent => Some(BinOp::Rem),
        TokenKind::EqEq => Some(BinOp::Eq),
        TokenKind::NotEq => Some(BinOp::NotEq),
        TokenKind::Lt => Some(BinOp::Lt),
        TokenKind::Gt => Some(BinOp::Gt),
        TokenKind::LtEq => Some(BinOp::LtEq),
        TokenKind::GtEq => Some(BinOp::GtEq),
        TokenKind::AndAnd => Some(BinOp::And),
        TokenKind::OrOr => Some(BinOp::Or),
        _ => None,
    }
}

impl<'src> Parser<'src> {
    /// Parse one expression starting at the current token.
    ///
    /// On return the current token is the first one that is not part of
    /// the expression (`;`, `,`, an unmatched `)`) stays for the caller.
    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        let mut operands: Vec<Expr> = Vec::new();
        let mut operators: Vec<OpEntry> = Vec::new();
        let start = self.current.span;

        loop {
            match self.current.kind {
                TokenKind::IntLit
                | TokenKind::FloatLit
                | TokenKind::CharLit
                | TokenKind::StringLit
                | TokenKind::True
                | TokenKind::False => {
                    operands.push(self.parse_literal()?);
                }
                TokenKind::Ident => {
                    operands.push(self.parse_operand_ident()?);
                }
                kind if kind.is_type_keyword() => {
                    operands.push(self.parse_cast()?);
                }
                TokenKind::LParen => {
                    operators.push(OpEntry::Paren(self.current.span));
                    self.advance();
                }
                TokenKind::RParen => {
                    if operators.iter().any(OpEntry::is_paren) {
                        self.reduce_to_paren(&mut operands, &mut operators)?;
                        self.advance();
                    } else {
                        // No matching `(` in this run: the caller owns the
                        // token (call argument lists, casts, conditions).
                        break;
                    }
                }
                TokenKind::Not => {
                    operators.push(OpEntry::Not(self.current.span));
                    self.advance();
                }
                kind => {
                    let Some(op) = token_binop(kind) else {
                        break;
                    };
                    let span = self.current.span;
                    let incoming = binary_precedence(op);
                    while operators
                        .last()
                        .is_some_and(|top| !top.is_paren() && top.precedence() >= incoming)
                    {
                        self.reduce_once(&mut operands, &mut operators)?;
                    }
                    operators.push(OpEntry::Binary(op, span));
                    self.advance();
                }
            }
        }

        while let Some(top) = operators.last().copied() {
            if let OpEntry::Paren(span) = top {
                return CompileError::at(
                    ErrorKind::Syntax("mismatched parentheses".to_string()),
                    span,
                )
                .into_err();
            }
            self.reduce_once(&mut operands, &mut operators)?;
        }

        let Some(expr) = operands.pop() else {
            return CompileError::at(
                ErrorKind::InvalidExpression("expression expected".to_string()),
                start,
            )
            .into_err();
        };
        if !operands.is_empty() {
            return CompileError::at(
                ErrorKind::InvalidExpression(
                    "operands are not joined by an operator".to_string(),
                ),
                expr.span,
            )
            .into_err();
        }
        Ok(expr)
    }

    /// Reduce operators until the `(` marker is popped.
    fn reduce_to_paren(
        &self,
        operands: &mut Vec<Expr>,
        operators: &mut Vec<OpEntry>,
    ) -> CompileResult<()> {
        loop {
            match operators.last() {
                Some(entry) if entry.is_paren() => {
                    operators.pop();
                    return Ok(());
                }
                Some(_) => self.reduce_once(operands, operators)?,
                None => {
                    // Callers only get here with a marker on the stack.
                    return CompileError::new(ErrorKind::Syntax(
                        "mismatched parentheses".to_string(),
                    ))
                    .into_err();
                }
            }
        }
    }

    /// Pop one operator and fold its operand(s) into a new typed node.
    fn reduce_once(
        &self,
        operands: &mut Vec<Expr>,
        operators: &mut Vec<OpEntry>,
    ) -> CompileResult<()> {
        let Some(entry) = operators.pop() else {
            return CompileError::new(ErrorKind::InvalidExpression(
                "operator stack underflow".to_string(),
            ))
            .into_err();
        };
        match entry {
            OpEntry::Not(span) => {
                let Some(operand) = operands.pop() else {
                    return CompileError::at(
                        ErrorKind::InvalidExpression("missing operand for `!`".to_string()),
                        span,
                    )
                    .into_err();
                };
                if operand.ty != Type::Bool {
                    return CompileError::at(
                        ErrorKind::TypeMismatch(format!(
                            "`!` requires a `bool` operand, found `{}`",
                            self.type_name(&operand.ty)
                        )),
                        span,
                    )
                    .into_err();
                }
                let expr_span = span.merge(operand.span);
                operands.push(Expr {
                    kind: ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    ty: Type::Bool,
                    span: expr_span,
                });
            }
            OpEntry::Binary(op, span) => {
                let Some(right) = operands.pop() else {
                    return CompileError::at(
                        ErrorKind::InvalidExpression(format!("missing operand for `{op}`")),
                        span,
                    )
                    .into_err();
                };
                let Some(left) = operands.pop() else {
                    return CompileError::at(
                        ErrorKind::InvalidExpression(format!("missing operand for `{op}`")),
                        span,
                    )
                    .into_err();
                };
                let ty = self.binary_result_type(op, &left, &right, span)?;
                let expr_span = left.span.merge(right.span);
                operands.push(Expr {
                    kind: ExprKind::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                    span: expr_span,
                });
            }
            OpEntry::Paren(span) => {
                return CompileError::at(
                    ErrorKind::Syntax("mismatched parentheses".to_string()),
                    span,
                )
                .into_err();
            }
        }
        Ok(())
    }

    /// Type a binary node from its operand types.
    fn binary_result_type(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        op_span: Span,
    ) -> CompileResult<Type> {
        if op.is_logical() {
            if left.ty != Type::Bool || right.ty != Type::Bool {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` requires `bool` operands, found `{}` and `{}`",
                        op,
                        self.type_name(&left.ty),
                        self.type_name(&right.ty)
                    )),
                    op_span,
                )
                .into_err();
            }
            return Ok(Type::Bool);
        }

        let Some(unified) = left.ty.unified(&right.ty) else {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "operands of `{}` have mismatched types `{}` and `{}`",
                    op,
                    self.type_name(&left.ty),
                    self.type_name(&right.ty)
                )),
                op_span,
            )
            .into_err();
        };

        if op.is_comparison() {
            if !unified.supports_comparison() {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` cannot compare `{}` values",
                        op,
                        self.type_name(&unified)
                    )),
                    op_span,
                )
                .into_err();
            }
            Ok(Type::Bool)
        } else {
            if !unified.supports_arithmetic() {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not defined for `{}` values",
                        op,
                        self.type_name(&unified)
                    )),
                    op_span,
                )
                .into_err();
            }
            Ok(unified)
        }
    }

    // ============================================================
    // Operands
    // ============================================================

    /// Literal operand; the value is decoded here so lowering never
    /// re-parses text.
    fn parse_literal(&mut self) -> CompileResult<Expr> {
        let token = self.current;
        self.advance();
        let text = self.text(&token.span);
        let (literal, ty) = match token.kind {
            TokenKind::IntLit => {
                let value = text.parse::<u64>().map_err(|_| {
                    Box::new(CompileError::at(
                        ErrorKind::Syntax(format!("integer literal `{text}` is out of range")),
                        token.span,
                    ))
                })?;
                (Literal::Int(value), Type::Int)
            }
            TokenKind::FloatLit => {
                let value = text.parse::<f64>().map_err(|_| {
                    Box::new(CompileError::at(
                        ErrorKind::Syntax(format!("malformed float literal `{text}`")),
                        token.span,
                    ))
                })?;
                (Literal::Float(OrderedFloat(value)), Type::Float)
            }
            TokenKind::CharLit => {
                let body = &text[1..text.len() - 1];
                let value = unescape_char(body).ok_or_else(|| {
                    Box::new(CompileError::at(
                        ErrorKind::Syntax(format!("invalid character literal `{text}`")),
                        token.span,
                    ))
                })?;
                (Literal::Char(value), Type::Char)
            }
            TokenKind::StringLit => {
                let body = &text[1..text.len() - 1];
                let value = unescape_string(body).ok_or_else(|| {
                    Box::new(CompileError::at(
                        ErrorKind::Syntax("invalid escape in string literal".to_string()),
                        token.span,
                    ))
                })?;
                (Literal::Str(value), Type::Str)
            }
            TokenKind::True => (Literal::Bool(true), Type::Bool),
            TokenKind::False => (Literal::Bool(false), Type::Bool),
            _ => return self.error_expected("a literal"),
        };
        Ok(Expr {
            kind: ExprKind::Literal(literal),
            ty,
            span: token.span,
        })
    }

    /// Identifier operand: a call, a member read, or a plain variable.
    fn parse_operand_ident(&mut self) -> CompileResult<Expr> {
        let ident = self.current;
        let name = self.name_of(ident);

        if self.check_next(TokenKind::LParen) {
            self.advance();
            let (call, ty) = self.parse_call(name, ident.span)?;
            let span = ident.span.merge(self.previous.span);
            return Ok(Expr {
                kind: ExprKind::Call(call),
                ty,
                span,
            });
        }

        if self.check_next(TokenKind::Dot) {
            self.advance();
            self.expect(TokenKind::Dot)?;
            let member_token = self.expect(TokenKind::Ident)?;
            let member = self.name_of(member_token);
            let ty = self.member_type(name, member, ident.span, member_token.span)?;
            return Ok(Expr {
                kind: ExprKind::Member { base: name, member },
                ty,
                span: ident.span.merge(member_token.span),
            });
        }

        self.advance();
        let ty = match self.lookup(name, ident.span)? {
            Symbol::Variable { ty, .. } => *ty,
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a variable",
                        self.resolve(name)
                    )),
                    ident.span,
                )
                .into_err()
            }
        };
        Ok(Expr {
            kind: ExprKind::Identifier(name),
            ty,
            span: ident.span,
        })
    }

    /// Cast operand `type(expr)`. Legality of the conversion pair is a
    /// lowering concern; here the node just takes the target type.
    fn parse_cast(&mut self) -> CompileResult<Expr> {
        let type_token = self.current;
        let Some(target) = Type::from_token(type_token.kind) else {
            return self.error_expected("a type");
        };
        self.advance();
        self.expect(TokenKind::LParen)?;
        let operand = self.parse_expr()?;
        let close = self.expect(TokenKind::RParen)?;
        Ok(Expr {
            kind: ExprKind::Cast {
                operand: Box::new(operand),
            },
            ty: target,
            span: type_token.span.merge(close.span),
        })
    }

    /// Parse `(args...)` for `callee` and check the call against its symbol:
    /// the callee must be a function, arity must match, argument types must
    /// match parameters positionally.
    pub(crate) fn parse_call(
        &mut self,
        callee: Name,
        callee_span: Span,
    ) -> CompileResult<(Call, Type)> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let (ret, params) = match self.lookup(callee, callee_span)? {
            Symbol::Function { ret, params } => (*ret, params.clone()),
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a function",
                        self.resolve(callee)
                    )),
                    callee_span,
                )
                .into_err()
            }
        };

        if args.len() != params.len() {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "`{}` expects {} argument(s), found {}",
                    self.resolve(callee),
                    params.len(),
                    args.len()
                )),
                callee_span,
            )
            .into_err();
        }
        for (arg, param) in args.iter().zip(&params) {
            if !arg.ty.equivalent(param) {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "argument of type `{}` does not match parameter type `{}`",
                        self.type_name(&arg.ty),
                        self.type_name(param)
                    )),
                    arg.span,
                )
                .into_err();
            }
        }

        Ok((Call { callee, args }, ret))
    }
}
