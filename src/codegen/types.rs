//! Type mapping and width adjustment.
//!
//! Scalars map onto fixed LLVM widths; the generic `int`, `uint`, and
//! `float` spellings share a width with their 32-bit forms. The parser
//! admits mixed widths within one family, so values are brought to the
//! exact width of their destination at every binding point (initializer,
//! assignment, argument, return, binary operand).

use inkwell::types::BasicTypeEnum;
use inkwell::values::BasicValueEnum;
use inkwell::AddressSpace;

use crate::diagnostics::CompileResult;
use crate::span::Span;
use crate::types::Type;

use super::Codegen;

impl<'ctx, 'a> Codegen<'ctx, 'a> {
    /// The LLVM value type of a Mica type. `nothing` has no value type
    /// and is special-cased where it can appear.
    pub(super) fn basic_type(&self, ty: &Type, span: Span) -> CompileResult<BasicTypeEnum<'ctx>> {
        Ok(match ty {
            Type::Bool => self.context.bool_type().into(),
            Type::Char | Type::Int8 | Type::UInt8 => self.context.i8_type().into(),
            Type::Int16 | Type::UInt16 => self.context.i16_type().into(),
            Type::Int | Type::Int32 | Type::UInt | Type::UInt32 => {
                self.context.i32_type().into()
            }
            Type::Int64 | Type::UInt64 => self.context.i64_type().into(),
            Type::Float | Type::Float32 => self.context.f32_type().into(),
            Type::Float64 => self.context.f64_type().into(),
            Type::Str => self
                .context
                .i8_type()
                .ptr_type(AddressSpace::default())
                .into(),
            Type::Struct(name) => match self.structs.get(name) {
                Some(layout) => layout.llvm.into(),
                None => {
                    return Err(self.internal(
                        format!("struct `{}` has no layout", self.resolve(*name)),
                        span,
                    ))
                }
            },
            Type::Nothing => {
                return Err(self.internal("`nothing` has no value type".to_string(), span))
            }
        })
    }

    /// The all-zero value of a type, used for default returns.
    pub(super) fn zero_value(&self, ty: &Type, span: Span) -> CompileResult<BasicValueEnum<'ctx>> {
        Ok(match self.basic_type(ty, span)? {
            BasicTypeEnum::IntType(int_ty) => int_ty.const_zero().into(),
            BasicTypeEnum::FloatType(float_ty) => float_ty.const_zero().into(),
            BasicTypeEnum::PointerType(ptr_ty) => ptr_ty.const_null().into(),
            BasicTypeEnum::StructType(struct_ty) => struct_ty.const_zero().into(),
            other => {
                return Err(self.internal(format!("no zero value for {other:?}"), span))
            }
        })
    }

    /// Bring `value` of type `from` to the exact width of `to`.
    ///
    /// Both types come out of a successful equivalence check, so only
    /// in-family width changes happen here: sign-aware extension or
    /// truncation for integers, `fpext`/`fptrunc` for floats. Matching
    /// widths pass through untouched.
    pub(super) fn coerce(
        &self,
        value: BasicValueEnum<'ctx>,
        from: &Type,
        to: &Type,
        span: Span,
    ) -> CompileResult<BasicValueEnum<'ctx>> {
        let target = self.basic_type(to, span)?;
        match (value, target) {
            (BasicValueEnum::IntValue(int_val), BasicTypeEnum::IntType(int_ty)) => {
                let src_bits = int_val.get_type().get_bit_width();
                let dst_bits = int_ty.get_bit_width();
                if src_bits == dst_bits {
                    return Ok(int_val.into());
                }
                let out = if src_bits < dst_bits {
                    if from.is_unsigned_int() {
                        self.builder
                            .build_int_z_extend(int_val, int_ty, "zext")
                            .map_err(|e| self.internal(format!("extend failed: {e}"), span))?
                    } else {
                        self.builder
                            .build_int_s_extend(int_val, int_ty, "sext")
                            .map_err(|e| self.internal(format!("extend failed: {e}"), span))?
                    }
                } else {
                    self.builder
                        .build_int_truncate(int_val, int_ty, "trunc")
                        .map_err(|e| self.internal(format!("truncate failed: {e}"), span))?
                };
                Ok(out.into())
            }
            (BasicValueEnum::FloatValue(float_val), BasicTypeEnum::FloatType(float_ty)) => {
                if float_val.get_type() == float_ty {
                    return Ok(float_val.into());
                }
                let out = if float_ty == self.context.f64_type() {
                    self.builder
                        .build_float_ext(float_val, float_ty, "fpext")
                        .map_err(|e| self.internal(format!("extend failed: {e}"), span))?
                } else {
                    self.builder
                        .build_float_trunc(float_val, float_ty, "fptrunc")
                        .map_err(|e| self.internal(format!("truncate failed: {e}"), span))?
                };
                Ok(out.into())
            }
            _ => Ok(value),
        }
    }
}
