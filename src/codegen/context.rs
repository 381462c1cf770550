//! The lowering context.
//!
//! `Codegen` carries everything statement and expression lowering share:
//! the LLVM handles, per-scope variable storage, the function and struct
//! tables, and the loop stack for `break`/`continue` targets.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicType, BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, PointerValue};

use string_interner::DefaultStringInterner;

use crate::ast::{Function, Program, StructDecl};
use crate::diagnostics::{CompileError, CompileResult, ErrorKind};
use crate::span::Span;
use crate::types::{Name, Type};

/// Stack storage of one variable.
#[derive(Clone, Copy)]
pub(super) struct Slot<'ctx> {
    pub(super) ptr: PointerValue<'ctx>,
    pub(super) ty: Type,
}

/// Branch targets of the innermost loop.
#[derive(Clone, Copy)]
pub(super) struct LoopFrame<'ctx> {
    pub(super) continue_block: BasicBlock<'ctx>,
    pub(super) exit_block: BasicBlock<'ctx>,
}

/// A declared function and the parameter types its arguments coerce to.
pub(super) struct FnEntry<'ctx> {
    pub(super) value: FunctionValue<'ctx>,
    pub(super) params: Vec<Type>,
}

/// A registered struct: its LLVM type and members in declaration order.
pub(super) struct StructLayout<'ctx> {
    pub(super) llvm: StructType<'ctx>,
    pub(super) members: Vec<(Name, Type)>,
}

/// The code generator.
pub struct Codegen<'ctx, 'a> {
    pub(super) context: &'ctx Context,
    pub(super) module: &'a Module<'ctx>,
    pub(super) builder: &'a Builder<'ctx>,
    pub(super) interner: &'a DefaultStringInterner,
    /// Variable storage, one map per lexical scope.
    scopes: Vec<HashMap<Name, Slot<'ctx>>>,
    /// Declared functions by name. LLVM functions are module-level, so
    /// a block-scoped redeclaration rebinds later calls to that name.
    pub(super) functions: HashMap<Name, FnEntry<'ctx>>,
    pub(super) structs: HashMap<Name, StructLayout<'ctx>>,
    pub(super) loop_stack: Vec<LoopFrame<'ctx>>,
    /// The function whose body is being built.
    pub(super) current_fn: Option<FunctionValue<'ctx>>,
    /// Its return type, for `return` coercion and default returns.
    pub(super) current_ret: Type,
}

impl<'ctx, 'a> Codegen<'ctx, 'a> {
    pub fn new(
        context: &'ctx Context,
        module: &'a Module<'ctx>,
        builder: &'a Builder<'ctx>,
        interner: &'a DefaultStringInterner,
    ) -> Self {
        Self {
            context,
            module,
            builder,
            interner,
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            structs: HashMap::new(),
            loop_stack: Vec::new(),
            current_fn: None,
            current_ret: Type::Int32,
        }
    }

    /// Lower a whole program into the module.
    ///
    /// Top-level statements become the body of a synthesized `i32 main`
    /// which returns 0 when execution falls off its end. Function and
    /// struct declarations encountered along the way define module-level
    /// entities and continue the entry body afterwards.
    pub fn lower_program(&mut self, program: &Program) -> CompileResult<()> {
        let main_type = self.context.i32_type().fn_type(&[], false);
        let main_fn = self.module.add_function("main", main_type, None);
        let entry = self.context.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);
        self.current_fn = Some(main_fn);
        self.current_ret = Type::Int32;

        for stmt in &program.statements {
            if self.block_terminated()? {
                break;
            }
            self.lower_stmt(stmt)?;
        }

        if !self.block_terminated()? {
            let zero = self.context.i32_type().const_int(0, false);
            self.builder
                .build_return(Some(&zero))
                .map_err(|e| self.internal(format!("return failed: {e}"), Span::dummy()))?;
        }
        self.verify_function(main_fn, "main")
    }

    /// Declare and lower one `func`.
    ///
    /// The declaration may appear in the middle of another body, so the
    /// builder's insertion point is saved and restored around it. The
    /// function is registered before its body lowers, which is what lets
    /// recursive calls bind.
    pub(super) fn lower_function(&mut self, decl: &Function) -> CompileResult<()> {
        let name = self.resolve(decl.name).to_string();
        let mut param_types = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            param_types.push(self.basic_type(&param.ty, param.span)?.into());
        }
        let fn_type = match decl.ret {
            Type::Nothing => self.context.void_type().fn_type(&param_types, false),
            _ => self
                .basic_type(&decl.ret, decl.span)?
                .fn_type(&param_types, false),
        };
        let fn_value = self.module.add_function(&name, fn_type, None);
        self.functions.insert(
            decl.name,
            FnEntry {
                value: fn_value,
                params: decl.params.iter().map(|param| param.ty).collect(),
            },
        );

        let saved_block = self.builder.get_insert_block();
        let saved_fn = self.current_fn;
        let saved_ret = self.current_ret;

        let entry = self.context.append_basic_block(fn_value, "entry");
        self.builder.position_at_end(entry);
        self.current_fn = Some(fn_value);
        self.current_ret = decl.ret;

        self.push_scope();
        let body_result = self.lower_function_body(decl, fn_value);
        self.pop_scope();
        body_result?;

        // A body may fall off its end without `return`; complete the
        // final block with the return type's zero value.
        if !self.block_terminated()? {
            self.emit_default_return(decl.ret, decl.span)?;
        }

        self.current_fn = saved_fn;
        self.current_ret = saved_ret;
        if let Some(block) = saved_block {
            self.builder.position_at_end(block);
        }

        self.verify_function(fn_value, &name)
    }

    fn lower_function_body(
        &mut self,
        decl: &Function,
        fn_value: FunctionValue<'ctx>,
    ) -> CompileResult<()> {
        for (index, param) in decl.params.iter().enumerate() {
            let llvm_ty = self.basic_type(&param.ty, param.span)?;
            let ptr = self
                .builder
                .build_alloca(llvm_ty, self.resolve(param.name))
                .map_err(|e| self.internal(format!("alloca failed: {e}"), param.span))?;
            let value = fn_value.get_nth_param(index as u32).ok_or_else(|| {
                self.internal(format!("missing parameter {index}"), param.span)
            })?;
            self.builder
                .build_store(ptr, value)
                .map_err(|e| self.internal(format!("store failed: {e}"), param.span))?;
            self.define(
                param.name,
                Slot {
                    ptr,
                    ty: param.ty,
                },
            );
        }
        self.lower_block(&decl.body)
    }

    fn emit_default_return(&mut self, ret: Type, span: Span) -> CompileResult<()> {
        match ret {
            Type::Nothing => {
                self.builder
                    .build_return(None)
                    .map_err(|e| self.internal(format!("return failed: {e}"), span))?;
            }
            _ => {
                let zero = self.zero_value(&ret, span)?;
                self.builder
                    .build_return(Some(&zero))
                    .map_err(|e| self.internal(format!("return failed: {e}"), span))?;
            }
        }
        Ok(())
    }

    /// Register a struct declaration as a named LLVM aggregate.
    pub(super) fn lower_struct(&mut self, decl: &StructDecl) -> CompileResult<()> {
        let llvm = self.context.opaque_struct_type(self.resolve(decl.name));
        let mut fields: Vec<BasicTypeEnum<'ctx>> = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            fields.push(self.basic_type(&member.ty, member.span)?);
        }
        llvm.set_body(&fields, false);
        self.structs.insert(
            decl.name,
            StructLayout {
                llvm,
                members: decl
                    .members
                    .iter()
                    .map(|member| (member.name, member.ty))
                    .collect(),
            },
        );
        Ok(())
    }

    // ============================================================
    // Storage scopes
    // ============================================================

    pub(super) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(super) fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "global storage scope must remain");
        self.scopes.pop();
    }

    pub(super) fn define(&mut self, name: Name, slot: Slot<'ctx>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, slot);
        }
    }

    /// Innermost-first slot lookup. The parser has already resolved
    /// names, so a miss is an internal inconsistency.
    pub(super) fn slot(&self, name: Name, span: Span) -> CompileResult<Slot<'ctx>> {
        for scope in self.scopes.iter().rev() {
            if let Some(slot) = scope.get(&name) {
                return Ok(*slot);
            }
        }
        Err(self.internal(
            format!("no storage for `{}`", self.resolve(name)),
            span,
        ))
    }

    /// Position of `member` within `struct_name`, with its type.
    pub(super) fn member_index(&self, struct_name: Name, member: Name) -> Option<(u32, Type)> {
        let layout = self.structs.get(&struct_name)?;
        layout
            .members
            .iter()
            .position(|(name, _)| *name == member)
            .map(|index| (index as u32, layout.members[index].1))
    }

    /// Member name and type at `index` within `struct_name`.
    pub(super) fn member_at(&self, struct_name: Name, index: usize) -> Option<(Name, Type)> {
        self.structs
            .get(&struct_name)
            .and_then(|layout| layout.members.get(index))
            .copied()
    }

    // ============================================================
    // Shared plumbing
    // ============================================================

    pub(super) fn resolve(&self, name: Name) -> &str {
        self.interner.resolve(name).unwrap_or("<unknown>")
    }

    pub(super) fn type_name(&self, ty: &Type) -> String {
        ty.name(self.interner)
    }

    pub(super) fn current_function(&self, span: Span) -> CompileResult<FunctionValue<'ctx>> {
        self.current_fn
            .ok_or_else(|| self.internal("no function under construction".to_string(), span))
    }

    pub(super) fn current_block(&self) -> CompileResult<BasicBlock<'ctx>> {
        self.builder.get_insert_block().ok_or_else(|| {
            Box::new(CompileError::new(ErrorKind::Internal(
                "builder is not positioned in a block".to_string(),
            )))
        })
    }

    /// Whether the block under construction already ends in a terminator.
    pub(super) fn block_terminated(&self) -> CompileResult<bool> {
        Ok(self.current_block()?.get_terminator().is_some())
    }

    pub(super) fn internal(&self, message: String, span: Span) -> Box<CompileError> {
        Box::new(CompileError::at(ErrorKind::Internal(message), span))
    }

    fn verify_function(&self, function: FunctionValue<'ctx>, name: &str) -> CompileResult<()> {
        if function.verify(false) {
            Ok(())
        } else {
            CompileError::new(ErrorKind::Internal(format!(
                "function `{name}` failed verification"
            )))
            .into_err()
        }
    }
}
