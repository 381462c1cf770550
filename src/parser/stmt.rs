//! Statement parsing.
//!
//! Each production consumes its tokens in source order and runs its
//! semantic checks at the earliest point the needed facts exist, so the
//! leftmost violation is the one reported. Declarations enter the scope
//! stack as part of parsing; there is no later binding pass.

use super::Parser;
use crate::ast::{
    Assign, AssignOp, DoWhile, ElseIf, Expr, For, ForInit, Function, If, Initializer,
    LoopControl, LoopControlKind, Member, Param, Return, Stmt, StructDecl, VarDecl, VarKeyword,
    While,
};
use crate::diagnostics::{CompileError, CompileResult, ErrorKind};
use crate::lexer::TokenKind;
use crate::scope::{ScopeKind, Symbol};
use crate::span::Span;
use crate::types::Type;

impl<'src> Parser<'src> {
    pub(crate) fn parse_statement(&mut self) -> CompileResult<Stmt> {
        match self.current.kind {
            TokenKind::Var | TokenKind::Const => self.parse_var_decl().map(Stmt::Variable),
            TokenKind::If => self.parse_if().map(Stmt::If),
            TokenKind::While => self.parse_while().map(Stmt::While),
            TokenKind::Do => self.parse_do_while().map(Stmt::DoWhile),
            TokenKind::For => self.parse_for().map(Stmt::For),
            TokenKind::Func => self.parse_func().map(Stmt::Function),
            TokenKind::Struct => self.parse_struct().map(Stmt::Struct),
            TokenKind::Return => self.parse_return().map(Stmt::Return),
            TokenKind::Break | TokenKind::Continue => {
                self.parse_loop_control().map(Stmt::LoopControl)
            }
            TokenKind::Ident => self.parse_assign_or_call(),
            _ => self.error_expected("a statement"),
        }
    }

    /// A type position: a type keyword, or an identifier naming a struct.
    fn parse_type(&mut self) -> CompileResult<Type> {
        if self.current.kind.is_type_keyword() {
            let token = self.current;
            self.advance();
            match Type::from_token(token.kind) {
                Some(ty) => Ok(ty),
                None => self.error_expected("a type"),
            }
        } else if self.check(TokenKind::Ident) {
            let token = self.current;
            let name = self.name_of(token);
            self.advance();
            match self.lookup(name, token.span)? {
                Symbol::Struct { .. } => Ok(Type::Struct(name)),
                _ => CompileError::at(
                    ErrorKind::TypeMismatch(format!("`{}` is not a type", self.resolve(name))),
                    token.span,
                )
                .into_err(),
            }
        } else {
            self.error_expected("a type")
        }
    }

    // ============================================================
    // Declarations
    // ============================================================

    /// `var`/`const` declaration. The name becomes visible only after the
    /// whole statement parses, so an initializer cannot read it.
    fn parse_var_decl(&mut self) -> CompileResult<VarDecl> {
        let start = self.current.span;
        let keyword = if self.try_consume(TokenKind::Const) {
            VarKeyword::Const
        } else {
            self.expect(TokenKind::Var)?;
            VarKeyword::Var
        };

        let ty_span = self.current.span;
        let ty = self.parse_type()?;
        if ty == Type::Nothing {
            return CompileError::at(
                ErrorKind::TypeMismatch("variables cannot have type `nothing`".to_string()),
                ty_span,
            )
            .into_err();
        }

        let name_token = self.expect(TokenKind::Ident)?;
        let name = self.name_of(name_token);

        let init = if self.try_consume(TokenKind::Assign) {
            if self.check(TokenKind::LBrace) {
                Some(Initializer::StructMembers(
                    self.parse_struct_init(&ty, ty_span)?,
                ))
            } else {
                let value = self.parse_expr()?;
                if ty.is_struct() {
                    return CompileError::at(
                        ErrorKind::TypeMismatch(format!(
                            "`{}` takes a `{{...}}` member-list initializer",
                            self.type_name(&ty)
                        )),
                        value.span,
                    )
                    .into_err();
                }
                if !value.ty.equivalent(&ty) {
                    return CompileError::at(
                        ErrorKind::TypeMismatch(format!(
                            "cannot initialize `{}` with a value of type `{}`",
                            self.type_name(&ty),
                            self.type_name(&value.ty)
                        )),
                        value.span,
                    )
                    .into_err();
                }
                Some(Initializer::Expr(value))
            }
        } else {
            None
        };

        let semi = self.expect(TokenKind::Semi)?;
        self.declare(
            name,
            Symbol::Variable {
                ty,
                is_const: keyword == VarKeyword::Const,
            },
            name_token.span,
        )?;
        Ok(VarDecl {
            keyword,
            ty,
            name,
            init,
            span: start.merge(semi.span),
        })
    }

    /// `{ expr, ... }` member-list initializer for a struct-typed variable.
    /// Values bind to members positionally.
    fn parse_struct_init(&mut self, ty: &Type, ty_span: Span) -> CompileResult<Vec<Expr>> {
        let open = self.expect(TokenKind::LBrace)?;
        let Type::Struct(struct_name) = ty else {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "`{}` does not take a member-list initializer",
                    self.type_name(ty)
                )),
                open.span,
            )
            .into_err();
        };
        let member_types: Vec<Type> = match self.lookup(*struct_name, ty_span)? {
            Symbol::Struct { members } => members.iter().map(|(_, ty)| *ty).collect(),
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a struct type",
                        self.resolve(*struct_name)
                    )),
                    ty_span,
                )
                .into_err()
            }
        };

        let mut values = Vec::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                values.push(self.parse_expr()?);
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RBrace)?;

        if values.len() != member_types.len() {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "`{}` has {} member(s), initializer provides {}",
                    self.resolve(*struct_name),
                    member_types.len(),
                    values.len()
                )),
                close.span,
            )
            .into_err();
        }
        for (value, member_ty) in values.iter().zip(&member_types) {
            if !value.ty.equivalent(member_ty) {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "member initializer of type `{}` does not match member type `{}`",
                        self.type_name(&value.ty),
                        self.type_name(member_ty)
                    )),
                    value.span,
                )
                .into_err();
            }
        }
        Ok(values)
    }

    /// `func type name(params) { body }`. The function symbol is declared
    /// before the body parses so recursive calls resolve; parameters and
    /// body share one function scope.
    fn parse_func(&mut self) -> CompileResult<Function> {
        let start = self.expect(TokenKind::Func)?.span;
        let ret = self.parse_type()?;
        let name_token = self.expect(TokenKind::Ident)?;
        let name = self.name_of(name_token);

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ty_span = self.current.span;
                let ty = self.parse_type()?;
                if ty == Type::Nothing {
                    return CompileError::at(
                        ErrorKind::TypeMismatch(
                            "parameters cannot have type `nothing`".to_string(),
                        ),
                        ty_span,
                    )
                    .into_err();
                }
                let param_token = self.expect(TokenKind::Ident)?;
                let param_name = self.name_of(param_token);
                params.push(Param {
                    ty,
                    name: param_name,
                    span: ty_span.merge(param_token.span),
                });
                if !self.try_consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        self.declare(
            name,
            Symbol::Function {
                ret,
                params: params.iter().map(|param| param.ty).collect(),
            },
            name_token.span,
        )?;

        let body = self.with_scope(ScopeKind::Function(ret), |parser| {
            for param in &params {
                parser.declare(
                    param.name,
                    Symbol::Variable {
                        ty: param.ty,
                        is_const: false,
                    },
                    param.span,
                )?;
            }
            parser.parse_braced_block()
        })?;

        Ok(Function {
            ret,
            name,
            params,
            body,
            span: start.merge(self.previous.span),
        })
    }

    /// `struct Name { type member; ... }`. Members are checked for duplicates
    /// as they parse; an empty body is rejected.
    fn parse_struct(&mut self) -> CompileResult<StructDecl> {
        let start = self.expect(TokenKind::Struct)?.span;
        let name_token = self.expect(TokenKind::Ident)?;
        let name = self.name_of(name_token);

        self.expect(TokenKind::LBrace)?;
        let mut members: Vec<Member> = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                return self.error_expected(TokenKind::RBrace.description());
            }
            let ty_span = self.current.span;
            let ty = self.parse_type()?;
            if ty == Type::Nothing {
                return CompileError::at(
                    ErrorKind::TypeMismatch(
                        "struct members cannot have type `nothing`".to_string(),
                    ),
                    ty_span,
                )
                .into_err();
            }
            let member_token = self.expect(TokenKind::Ident)?;
            let member_name = self.name_of(member_token);
            if members.iter().any(|member| member.name == member_name) {
                return CompileError::at(
                    ErrorKind::DuplicateSymbol(self.resolve(member_name).to_string()),
                    member_token.span,
                )
                .into_err();
            }
            let semi = self.expect(TokenKind::Semi)?;
            members.push(Member {
                ty,
                name: member_name,
                span: ty_span.merge(semi.span),
            });
        }
        let close = self.expect(TokenKind::RBrace)?;

        if members.is_empty() {
            return CompileError::at(
                ErrorKind::Syntax(format!("struct `{}` has no members", self.resolve(name))),
                close.span,
            )
            .into_err();
        }

        self.declare(
            name,
            Symbol::Struct {
                members: members.iter().map(|member| (member.name, member.ty)).collect(),
            },
            name_token.span,
        )?;
        Ok(StructDecl {
            name,
            members,
            span: start.merge(close.span),
        })
    }

    // ============================================================
    // Assignment and calls
    // ============================================================

    fn parse_assign_or_call(&mut self) -> CompileResult<Stmt> {
        let ident = self.current;
        if self.check_next(TokenKind::LParen) {
            let name = self.name_of(ident);
            self.advance();
            let (call, _) = self.parse_call(name, ident.span)?;
            let semi = self.expect(TokenKind::Semi)?;
            return Ok(Stmt::Call(call, ident.span.merge(semi.span)));
        }
        let assign = self.parse_assign()?;
        self.expect(TokenKind::Semi)?;
        Ok(Stmt::Assign(assign))
    }

    /// `target[.member] op value` without the trailing `;` so the for-loop
    /// header can reuse it. Checks run left to right: the target must be a
    /// non-const variable, a member access must resolve, a compound
    /// operator needs an arithmetic slot, and the value must be equivalent
    /// to the slot's type.
    fn parse_assign(&mut self) -> CompileResult<Assign> {
        let target_token = self.expect(TokenKind::Ident)?;
        let target = self.name_of(target_token);

        let (target_ty, is_const) = match self.lookup(target, target_token.span)? {
            Symbol::Variable { ty, is_const } => (*ty, *is_const),
            _ => {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not a variable",
                        self.resolve(target)
                    )),
                    target_token.span,
                )
                .into_err()
            }
        };
        if is_const {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "cannot assign to constant `{}`",
                    self.resolve(target)
                )),
                target_token.span,
            )
            .into_err();
        }

        let (member, slot_ty) = if self.try_consume(TokenKind::Dot) {
            let member_token = self.expect(TokenKind::Ident)?;
            let member_name = self.name_of(member_token);
            let ty =
                self.member_type(target, member_name, target_token.span, member_token.span)?;
            (Some(member_name), ty)
        } else {
            (None, target_ty)
        };

        let op_token = self.current;
        let op = match op_token.kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            TokenKind::PercentAssign => AssignOp::Rem,
            _ => return self.error_expected("an assignment operator"),
        };
        self.advance();

        if let Some(binop) = op.binop() {
            if !slot_ty.supports_arithmetic() {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "`{}` is not defined for `{}` values",
                        binop,
                        self.type_name(&slot_ty)
                    )),
                    op_token.span,
                )
                .into_err();
            }
        }

        let value = self.parse_expr()?;
        if !value.ty.equivalent(&slot_ty) {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "cannot assign a value of type `{}` to `{}`",
                    self.type_name(&value.ty),
                    self.type_name(&slot_ty)
                )),
                value.span,
            )
            .into_err();
        }

        let span = target_token.span.merge(value.span);
        Ok(Assign {
            target,
            member,
            op,
            value,
            span,
        })
    }

    // ============================================================
    // Control flow
    // ============================================================

    /// `( expr )` that must type as `bool`.
    fn parse_condition(&mut self) -> CompileResult<Expr> {
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        if cond.ty != Type::Bool {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "condition must be `bool`, found `{}`",
                    self.type_name(&cond.ty)
                )),
                cond.span,
            )
            .into_err();
        }
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> CompileResult<If> {
        let start = self.expect(TokenKind::If)?.span;
        let cond = self.parse_condition()?;
        let body = self.parse_scoped_block(ScopeKind::Block)?;

        let mut else_ifs = Vec::new();
        let mut else_body = None;
        while self.try_consume(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let kw = self.expect(TokenKind::If)?.span;
                let cond = self.parse_condition()?;
                let body = self.parse_scoped_block(ScopeKind::Block)?;
                else_ifs.push(ElseIf {
                    cond,
                    body,
                    span: kw.merge(self.previous.span),
                });
            } else {
                else_body = Some(self.parse_scoped_block(ScopeKind::Block)?);
                break;
            }
        }

        Ok(If {
            cond,
            body,
            else_ifs,
            else_body,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_while(&mut self) -> CompileResult<While> {
        let start = self.expect(TokenKind::While)?.span;
        let cond = self.parse_condition()?;
        let body = self.parse_scoped_block(ScopeKind::Loop)?;
        Ok(While {
            cond,
            body,
            span: start.merge(self.previous.span),
        })
    }

    fn parse_do_while(&mut self) -> CompileResult<DoWhile> {
        let start = self.expect(TokenKind::Do)?.span;
        let body = self.parse_scoped_block(ScopeKind::Loop)?;
        self.expect(TokenKind::While)?;
        let cond = self.parse_condition()?;
        let semi = self.expect(TokenKind::Semi)?;
        Ok(DoWhile {
            body,
            cond,
            span: start.merge(semi.span),
        })
    }

    /// `for (init; cond; update) { body }`. The header opens the loop
    /// scope so an `init` declaration is visible to the condition, the
    /// update, and the body; the body itself nests a block scope.
    fn parse_for(&mut self) -> CompileResult<For> {
        let start = self.expect(TokenKind::For)?.span;
        self.expect(TokenKind::LParen)?;
        self.with_scope(ScopeKind::Loop, |parser| {
            let init = if parser.check(TokenKind::Var) || parser.check(TokenKind::Const) {
                // consumes its own `;`
                ForInit::Variable(parser.parse_var_decl()?)
            } else {
                let assign = parser.parse_assign()?;
                parser.expect(TokenKind::Semi)?;
                ForInit::Assign(assign)
            };

            let cond = parser.parse_expr()?;
            if cond.ty != Type::Bool {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "condition must be `bool`, found `{}`",
                        parser.type_name(&cond.ty)
                    )),
                    cond.span,
                )
                .into_err();
            }
            parser.expect(TokenKind::Semi)?;

            let update = parser.parse_assign()?;
            parser.expect(TokenKind::RParen)?;

            let body = parser.parse_scoped_block(ScopeKind::Block)?;
            Ok(For {
                init,
                cond,
                update,
                body,
                span: start.merge(parser.previous.span),
            })
        })
    }

    fn parse_return(&mut self) -> CompileResult<Return> {
        let start = self.expect(TokenKind::Return)?.span;
        let Some(expected) = self.scopes.current_return() else {
            return CompileError::at(
                ErrorKind::Syntax("`return` outside of a function".to_string()),
                start,
            )
            .into_err();
        };

        if self.check(TokenKind::Semi) {
            let semi = self.expect(TokenKind::Semi)?;
            if expected != Type::Nothing {
                return CompileError::at(
                    ErrorKind::TypeMismatch(format!(
                        "function returns `{}`, `return` needs a value",
                        self.type_name(&expected)
                    )),
                    start,
                )
                .into_err();
            }
            return Ok(Return {
                value: None,
                span: start.merge(semi.span),
            });
        }

        let value = self.parse_expr()?;
        if expected == Type::Nothing {
            return CompileError::at(
                ErrorKind::TypeMismatch(
                    "function returns `nothing`, `return` cannot carry a value".to_string(),
                ),
                value.span,
            )
            .into_err();
        }
        if !value.ty.equivalent(&expected) {
            return CompileError::at(
                ErrorKind::TypeMismatch(format!(
                    "returned `{}` does not match function return type `{}`",
                    self.type_name(&value.ty),
                    self.type_name(&expected)
                )),
                value.span,
            )
            .into_err();
        }
        let semi = self.expect(TokenKind::Semi)?;
        Ok(Return {
            value: Some(value),
            span: start.merge(semi.span),
        })
    }

    fn parse_loop_control(&mut self) -> CompileResult<LoopControl> {
        let token = self.current;
        let kind = match token.kind {
            TokenKind::Break => LoopControlKind::Break,
            TokenKind::Continue => LoopControlKind::Continue,
            _ => return self.error_expected("`break` or `continue`"),
        };
        self.advance();

        if !self.scopes.in_loop() {
            let word = match kind {
                LoopControlKind::Break => "break",
                LoopControlKind::Continue => "continue",
            };
            return CompileError::at(
                ErrorKind::Syntax(format!("`{word}` outside of a loop")),
                token.span,
            )
            .into_err();
        }

        let semi = self.expect(TokenKind::Semi)?;
        Ok(LoopControl {
            kind,
            span: token.span.merge(semi.span),
        })
    }

    // ============================================================
    // Blocks
    // ============================================================

    /// `{ statements... }` in a fresh scope of the given kind.
    fn parse_scoped_block(&mut self, kind: ScopeKind) -> CompileResult<Vec<Stmt>> {
        self.with_scope(kind, |parser| parser.parse_braced_block())
    }

    /// `{ statements... }` in the current scope. Statements following a
    /// `return`, `break`, or `continue` draw one warning per block.
    fn parse_braced_block(&mut self) -> CompileResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        let mut terminated = false;
        let mut warned = false;
        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                return self.error_expected(TokenKind::RBrace.description());
            }
            if terminated && !warned {
                self.warn("unreachable statement", self.current.span);
                warned = true;
            }
            let stmt = self.parse_statement()?;
            terminated |= matches!(stmt, Stmt::Return(_) | Stmt::LoopControl(_));
            statements.push(stmt);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(statements)
    }
}
