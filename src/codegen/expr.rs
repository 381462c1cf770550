//! Expression lowering.
//!
//! Instruction selection is two-way: when both operands are floating
//! point the float forms are used, otherwise the signed integer forms;
//! unsigned types share `sdiv`/`srem`/`slt` with the signed ones. Float
//! equality uses the unordered `UEQ`/`ONE` predicates, the orderings the
//! ordered `OLT`-family. `&&` and `||` evaluate both sides and combine
//! the `i1`s with `and`/`or`; there is no short-circuit path.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FloatValue, IntValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::ast::{BinOp, Call, Expr, ExprKind, Literal};
use crate::diagnostics::{CompileError, CompileResult, ErrorKind};
use crate::span::Span;
use crate::types::{Name, Type};

use super::Codegen;

impl<'ctx, 'a> Codegen<'ctx, 'a> {
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> CompileResult<BasicValueEnum<'ctx>> {
        match &expr.kind {
            ExprKind::Literal(literal) => self.lower_literal(literal, &expr.ty, expr.span),
            ExprKind::Identifier(name) => {
                let slot = self.slot(*name, expr.span)?;
                self.builder
                    .build_load(slot.ptr, self.resolve(*name))
                    .map_err(|e| self.internal(format!("load failed: {e}"), expr.span))
            }
            ExprKind::Member { base, member } => self.lower_member_read(*base, *member, expr.span),
            ExprKind::Unary { operand, .. } => {
                let value = self.lower_expr(operand)?.into_int_value();
                let out = self
                    .builder
                    .build_not(value, "not")
                    .map_err(|e| self.internal(format!("not failed: {e}"), expr.span))?;
                Ok(out.into())
            }
            ExprKind::Binary { op, left, right } => self.lower_binary(*op, left, right, expr.span),
            ExprKind::Cast { operand } => self.lower_cast(operand, &expr.ty, expr.span),
            ExprKind::Call(call) => self.lower_call(call, expr.span)?.ok_or_else(|| {
                self.internal(
                    format!(
                        "call to `{}` produces no value",
                        self.resolve(call.callee)
                    ),
                    expr.span,
                )
            }),
        }
    }

    /// Literal constants. Integer literals materialize at their node's
    /// generic width; binding points adjust from there.
    fn lower_literal(
        &mut self,
        literal: &Literal,
        ty: &Type,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        Ok(match literal {
            Literal::Int(value) => {
                let int_ty = self.basic_type(ty, span)?.into_int_type();
                int_ty.const_int(*value, ty.is_signed_int()).into()
            }
            Literal::Float(value) => {
                let float_ty = self.basic_type(ty, span)?.into_float_type();
                float_ty.const_float(value.0).into()
            }
            Literal::Char(value) => self.context.i8_type().const_int(*value as u64, false).into(),
            Literal::Bool(value) => self
                .context
                .bool_type()
                .const_int(*value as u64, false)
                .into(),
            Literal::Str(value) => {
                let global = self
                    .builder
                    .build_global_string_ptr(value, "str")
                    .map_err(|e| self.internal(format!("string constant failed: {e}"), span))?;
                global.as_pointer_value().into()
            }
        })
    }

    fn lower_member_read(
        &mut self,
        base: Name,
        member: Name,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        let slot = self.slot(base, span)?;
        let Type::Struct(struct_name) = slot.ty else {
            return Err(self.internal(
                format!("`{}` is not struct storage", self.resolve(base)),
                span,
            ));
        };
        let Some((index, _)) = self.member_index(struct_name, member) else {
            return Err(self.internal(
                format!(
                    "`{}` has no member `{}`",
                    self.resolve(struct_name),
                    self.resolve(member)
                ),
                span,
            ));
        };
        let member_ptr = self
            .builder
            .build_struct_gep(slot.ptr, index, "member")
            .map_err(|e| self.internal(format!("member access failed: {e}"), span))?;
        self.builder
            .build_load(member_ptr, self.resolve(member))
            .map_err(|e| self.internal(format!("load failed: {e}"), span))
    }

    fn lower_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        if op.is_logical() {
            let lhs = self.lower_expr(left)?.into_int_value();
            let rhs = self.lower_expr(right)?.into_int_value();
            let out = match op {
                BinOp::And => self.builder.build_and(lhs, rhs, "and"),
                _ => self.builder.build_or(lhs, rhs, "or"),
            }
            .map_err(|e| self.internal(format!("logical operation failed: {e}"), span))?;
            return Ok(out.into());
        }

        // Operands meet at their unified type before selection.
        let Some(operand_ty) = left.ty.unified(&right.ty) else {
            return Err(self.internal("binary operands do not unify".to_string(), span));
        };
        let lhs_raw = self.lower_expr(left)?;
        let rhs_raw = self.lower_expr(right)?;
        let lhs = self.coerce(lhs_raw, &left.ty, &operand_ty, span)?;
        let rhs = self.coerce(rhs_raw, &right.ty, &operand_ty, span)?;

        if operand_ty.is_float() {
            self.lower_float_binary(op, lhs.into_float_value(), rhs.into_float_value(), span)
        } else {
            self.lower_int_binary(op, lhs.into_int_value(), rhs.into_int_value(), span)
        }
    }

    pub(super) fn lower_int_binary(
        &mut self,
        op: BinOp,
        lhs: IntValue<'ctx>,
        rhs: IntValue<'ctx>,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        let result = match op {
            BinOp::Add => self.builder.build_int_add(lhs, rhs, "add"),
            BinOp::Sub => self.builder.build_int_sub(lhs, rhs, "sub"),
            BinOp::Mul => self.builder.build_int_mul(lhs, rhs, "mul"),
            BinOp::Div => self.builder.build_int_signed_div(lhs, rhs, "div"),
            BinOp::Rem => self.builder.build_int_signed_rem(lhs, rhs, "rem"),
            BinOp::Eq => self.builder.build_int_compare(IntPredicate::EQ, lhs, rhs, "eq"),
            BinOp::NotEq => self.builder.build_int_compare(IntPredicate::NE, lhs, rhs, "ne"),
            BinOp::Lt => self.builder.build_int_compare(IntPredicate::SLT, lhs, rhs, "lt"),
            BinOp::LtEq => self.builder.build_int_compare(IntPredicate::SLE, lhs, rhs, "le"),
            BinOp::Gt => self.builder.build_int_compare(IntPredicate::SGT, lhs, rhs, "gt"),
            BinOp::GtEq => self.builder.build_int_compare(IntPredicate::SGE, lhs, rhs, "ge"),
            BinOp::And | BinOp::Or => {
                return Err(self.internal(
                    "logical operator reached arithmetic selection".to_string(),
                    span,
                ))
            }
        }
        .map_err(|e| self.internal(format!("integer operation failed: {e}"), span))?;
        Ok(result.into())
    }

    pub(super) fn lower_float_binary(
        &mut self,
        op: BinOp,
        lhs: FloatValue<'ctx>,
        rhs: FloatValue<'ctx>,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        let result: BasicValueEnum<'ctx> = match op {
            BinOp::Add => self
                .builder
                .build_float_add(lhs, rhs, "fadd")
                .map_err(|e| self.internal(format!("float operation failed: {e}"), span))?
                .into(),
            BinOp::Sub => self
                .builder
                .build_float_sub(lhs, rhs, "fsub")
                .map_err(|e| self.internal(format!("float operation failed: {e}"), span))?
                .into(),
            BinOp::Mul => self
                .builder
                .build_float_mul(lhs, rhs, "fmul")
                .map_err(|e| self.internal(format!("float operation failed: {e}"), span))?
                .into(),
            BinOp::Div => self
                .builder
                .build_float_div(lhs, rhs, "fdiv")
                .map_err(|e| self.internal(format!("float operation failed: {e}"), span))?
                .into(),
            BinOp::Rem => self
                .builder
                .build_float_rem(lhs, rhs, "frem")
                .map_err(|e| self.internal(format!("float operation failed: {e}"), span))?
                .into(),
            BinOp::Eq => self
                .builder
                .build_float_compare(FloatPredicate::UEQ, lhs, rhs, "feq")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::NotEq => self
                .builder
                .build_float_compare(FloatPredicate::ONE, lhs, rhs, "fne")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::Lt => self
                .builder
                .build_float_compare(FloatPredicate::OLT, lhs, rhs, "flt")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::LtEq => self
                .builder
                .build_float_compare(FloatPredicate::OLE, lhs, rhs, "fle")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::Gt => self
                .builder
                .build_float_compare(FloatPredicate::OGT, lhs, rhs, "fgt")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::GtEq => self
                .builder
                .build_float_compare(FloatPredicate::OGE, lhs, rhs, "fge")
                .map_err(|e| self.internal(format!("float compare failed: {e}"), span))?
                .into(),
            BinOp::And | BinOp::Or => {
                return Err(self.internal(
                    "logical operator reached arithmetic selection".to_string(),
                    span,
                ))
            }
        };
        Ok(result)
    }

    /// Explicit casts. Pairs outside the conversion table fail with
    /// `UnsupportedCast`; a same-type cast is a no-op.
    fn lower_cast(
        &mut self,
        operand: &Expr,
        target: &Type,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        let from = operand.ty;
        if from == *target {
            return self.lower_expr(operand);
        }
        // char casts like the i8 it is stored as
        let int_like = |ty: &Type| ty.is_integer() || *ty == Type::Char;

        if from == Type::Nothing {
            return self.unsupported_cast(&from, target, span);
        }
        let value = self.lower_expr(operand)?;

        if int_like(&from) && int_like(target) {
            let int_val = value.into_int_value();
            let int_ty = self.basic_type(target, span)?.into_int_type();
            let src_bits = int_val.get_type().get_bit_width();
            let dst_bits = int_ty.get_bit_width();
            let out = if src_bits == dst_bits {
                int_val
            } else if src_bits < dst_bits {
                // widening is always zero-extension here; a negative
                // `int8` comes back positive, as documented
                self.builder
                    .build_int_z_extend(int_val, int_ty, "zext")
                    .map_err(|e| self.internal(format!("cast failed: {e}"), span))?
            } else {
                self.builder
                    .build_int_truncate(int_val, int_ty, "trunc")
                    .map_err(|e| self.internal(format!("cast failed: {e}"), span))?
            };
            return Ok(out.into());
        }

        if from.is_signed_int() && target.is_float() {
            let float_ty = self.basic_type(target, span)?.into_float_type();
            let out = self
                .builder
                .build_signed_int_to_float(value.into_int_value(), float_ty, "sitofp")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from.is_unsigned_int() && target.is_float() {
            let float_ty = self.basic_type(target, span)?.into_float_type();
            let out = self
                .builder
                .build_unsigned_int_to_float(value.into_int_value(), float_ty, "uitofp")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from.is_float() && target.is_signed_int() {
            let int_ty = self.basic_type(target, span)?.into_int_type();
            let out = self
                .builder
                .build_float_to_signed_int(value.into_float_value(), int_ty, "fptosi")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from.is_float() && target.is_float() {
            return self.coerce(value, &from, target, span);
        }

        if int_like(&from) && *target == Type::Bool {
            let int_val = value.into_int_value();
            let zero = int_val.get_type().const_zero();
            let out = self
                .builder
                .build_int_compare(IntPredicate::NE, int_val, zero, "tobool")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from == Type::Bool && int_like(target) {
            let int_ty = self.basic_type(target, span)?.into_int_type();
            let out = self
                .builder
                .build_int_z_extend(value.into_int_value(), int_ty, "zext")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from.is_float() && *target == Type::Bool {
            let float_val = value.into_float_value();
            let zero = float_val.get_type().const_float(0.0);
            let out = self
                .builder
                .build_float_compare(FloatPredicate::ONE, float_val, zero, "tobool")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }
        if from == Type::Bool && target.is_float() {
            let float_ty = self.basic_type(target, span)?.into_float_type();
            let out = self
                .builder
                .build_unsigned_int_to_float(value.into_int_value(), float_ty, "uitofp")
                .map_err(|e| self.internal(format!("cast failed: {e}"), span))?;
            return Ok(out.into());
        }

        self.unsupported_cast(&from, target, span)
    }

    fn unsupported_cast<T>(&self, from: &Type, to: &Type, span: Span) -> CompileResult<T> {
        CompileError::at(
            ErrorKind::UnsupportedCast {
                from: self.type_name(from),
                to: self.type_name(to),
            },
            span,
        )
        .into_err()
    }

    /// Lower a call; `None` for `nothing`-returning callees.
    pub(super) fn lower_call(
        &mut self,
        call: &Call,
        span: Span,
    ) -> CompileResult<Option<BasicValueEnum<'ctx>>> {
        let Some(entry) = self.functions.get(&call.callee) else {
            return Err(self.internal(
                format!("call to unlowered function `{}`", self.resolve(call.callee)),
                span,
            ));
        };
        let fn_value = entry.value;
        let param_tys = entry.params.clone();

        let mut args: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(call.args.len());
        for (arg, param_ty) in call.args.iter().zip(&param_tys) {
            let raw = self.lower_expr(arg)?;
            let value = self.coerce(raw, &arg.ty, param_ty, arg.span)?;
            args.push(value.into());
        }

        let site = self
            .builder
            .build_call(fn_value, &args, "call")
            .map_err(|e| self.internal(format!("call failed: {e}"), span))?;
        Ok(site.try_as_basic_value().left())
    }
}
