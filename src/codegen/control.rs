//! Statement lowering and control-flow graph construction.
//!
//! Each construct gets its own labeled block family (`if.then`,
//! `while.cond`, `for.update`, ...). Loop headers push a [`LoopFrame`]
//! so `break` and `continue` can branch to the right place; the frame
//! is popped as soon as the body is lowered, before the result is
//! propagated.

use inkwell::basic_block::BasicBlock;

use crate::ast::{
    Assign, DoWhile, For, ForInit, If, Initializer, LoopControl, LoopControlKind, Return, Stmt,
    VarDecl, While,
};
use crate::diagnostics::CompileResult;
use crate::types::Type;

use super::context::{LoopFrame, Slot};
use super::Codegen;

impl<'ctx, 'a> Codegen<'ctx, 'a> {
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Variable(decl) => self.lower_var_decl(decl),
            Stmt::Assign(assign) => self.lower_assign(assign),
            Stmt::Call(call, span) => self.lower_call(call, *span).map(|_| ()),
            Stmt::If(stmt) => self.lower_if(stmt),
            Stmt::While(stmt) => self.lower_while(stmt),
            Stmt::DoWhile(stmt) => self.lower_do_while(stmt),
            Stmt::For(stmt) => self.lower_for(stmt),
            Stmt::Function(decl) => self.lower_function(decl),
            Stmt::Struct(decl) => self.lower_struct(decl),
            Stmt::Return(stmt) => self.lower_return(stmt),
            Stmt::LoopControl(stmt) => self.lower_loop_control(stmt),
        }
    }

    /// Lower a statement list into the current block. Statements after a
    /// terminator are dropped; the parser has already warned about them.
    pub(super) fn lower_block(&mut self, statements: &[Stmt]) -> CompileResult<()> {
        for stmt in statements {
            if self.block_terminated()? {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    pub(super) fn lower_scoped_block(&mut self, statements: &[Stmt]) -> CompileResult<()> {
        self.push_scope();
        let result = self.lower_block(statements);
        self.pop_scope();
        result
    }

    fn lower_var_decl(&mut self, decl: &VarDecl) -> CompileResult<()> {
        let llvm_ty = self.basic_type(&decl.ty, decl.span)?;
        let ptr = self
            .builder
            .build_alloca(llvm_ty, self.resolve(decl.name))
            .map_err(|e| self.internal(format!("alloca failed: {e}"), decl.span))?;

        match &decl.init {
            Some(Initializer::Expr(value)) => {
                let raw = self.lower_expr(value)?;
                let stored = self.coerce(raw, &value.ty, &decl.ty, decl.span)?;
                self.builder
                    .build_store(ptr, stored)
                    .map_err(|e| self.internal(format!("store failed: {e}"), decl.span))?;
            }
            Some(Initializer::StructMembers(values)) => {
                let Type::Struct(struct_name) = decl.ty else {
                    return Err(self.internal(
                        format!("`{}` is not struct storage", self.resolve(decl.name)),
                        decl.span,
                    ));
                };
                for (index, value) in values.iter().enumerate() {
                    let Some((_, member_ty)) = self.member_at(struct_name, index) else {
                        return Err(self.internal(
                            format!("`{}` has no member {index}", self.resolve(struct_name)),
                            value.span,
                        ));
                    };
                    let raw = self.lower_expr(value)?;
                    let stored = self.coerce(raw, &value.ty, &member_ty, value.span)?;
                    let member_ptr = self
                        .builder
                        .build_struct_gep(ptr, index as u32, "member")
                        .map_err(|e| {
                            self.internal(format!("member access failed: {e}"), value.span)
                        })?;
                    self.builder
                        .build_store(member_ptr, stored)
                        .map_err(|e| self.internal(format!("store failed: {e}"), value.span))?;
                }
            }
            None => {}
        }

        // visible only after the initializer, same as the name table
        self.define(decl.name, Slot { ptr, ty: decl.ty });
        Ok(())
    }

    fn lower_assign(&mut self, assign: &Assign) -> CompileResult<()> {
        let slot = self.slot(assign.target, assign.span)?;
        let (ptr, slot_ty) = match assign.member {
            Some(member) => {
                let Type::Struct(struct_name) = slot.ty else {
                    return Err(self.internal(
                        format!("`{}` is not struct storage", self.resolve(assign.target)),
                        assign.span,
                    ));
                };
                let Some((index, member_ty)) = self.member_index(struct_name, member) else {
                    return Err(self.internal(
                        format!(
                            "`{}` has no member `{}`",
                            self.resolve(struct_name),
                            self.resolve(member)
                        ),
                        assign.span,
                    ));
                };
                let member_ptr = self
                    .builder
                    .build_struct_gep(slot.ptr, index, "member")
                    .map_err(|e| self.internal(format!("member access failed: {e}"), assign.span))?;
                (member_ptr, member_ty)
            }
            None => (slot.ptr, slot.ty),
        };

        let raw = self.lower_expr(&assign.value)?;
        let value = self.coerce(raw, &assign.value.ty, &slot_ty, assign.span)?;
        let stored = match assign.op.binop() {
            Some(op) => {
                let current = self
                    .builder
                    .build_load(ptr, "load")
                    .map_err(|e| self.internal(format!("load failed: {e}"), assign.span))?;
                if slot_ty.is_float() {
                    self.lower_float_binary(
                        op,
                        current.into_float_value(),
                        value.into_float_value(),
                        assign.span,
                    )?
                } else {
                    self.lower_int_binary(
                        op,
                        current.into_int_value(),
                        value.into_int_value(),
                        assign.span,
                    )?
                }
            }
            None => value,
        };
        self.builder
            .build_store(ptr, stored)
            .map_err(|e| self.internal(format!("store failed: {e}"), assign.span))?;
        Ok(())
    }

    /// `if`/`else if`/`else` chain. Arms that fall off their body branch
    /// to a shared `if.end` block, which is created only after every arm
    /// is lowered so the block order follows the source.
    fn lower_if(&mut self, stmt: &If) -> CompileResult<()> {
        let function = self.current_function(stmt.span)?;
        let mut pending: Vec<BasicBlock<'ctx>> = Vec::new();

        let arms = std::iter::once((&stmt.cond, &stmt.body))
            .chain(stmt.else_ifs.iter().map(|arm| (&arm.cond, &arm.body)));
        for (cond, body) in arms {
            let cond_val = self.lower_expr(cond)?.into_int_value();
            let then_bb = self.context.append_basic_block(function, "if.then");
            let next_bb = self.context.append_basic_block(function, "if.next");
            self.builder
                .build_conditional_branch(cond_val, then_bb, next_bb)
                .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;

            self.builder.position_at_end(then_bb);
            self.lower_scoped_block(body)?;
            if !self.block_terminated()? {
                pending.push(self.current_block()?);
            }
            self.builder.position_at_end(next_bb);
        }

        if let Some(else_body) = &stmt.else_body {
            self.lower_scoped_block(else_body)?;
        }
        if !self.block_terminated()? {
            pending.push(self.current_block()?);
        }

        let merge_bb = self.context.append_basic_block(function, "if.end");
        for block in pending {
            self.builder.position_at_end(block);
            self.builder
                .build_unconditional_branch(merge_bb)
                .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        }
        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn lower_while(&mut self, stmt: &While) -> CompileResult<()> {
        let function = self.current_function(stmt.span)?;
        let cond_bb = self.context.append_basic_block(function, "while.cond");
        let body_bb = self.context.append_basic_block(function, "while.body");
        let end_bb = self.context.append_basic_block(function, "while.end");

        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        self.builder.position_at_end(cond_bb);
        let cond_val = self.lower_expr(&stmt.cond)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_val, body_bb, end_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;

        self.builder.position_at_end(body_bb);
        self.loop_stack.push(LoopFrame {
            continue_block: cond_bb,
            exit_block: end_bb,
        });
        let body_result = self.lower_scoped_block(&stmt.body);
        self.loop_stack.pop();
        body_result?;
        if !self.block_terminated()? {
            self.builder
                .build_unconditional_branch(cond_bb)
                .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// `do { ... } while (cond);` lowering: the body runs before the condition is
    /// first evaluated, so entry branches straight into it.
    fn lower_do_while(&mut self, stmt: &DoWhile) -> CompileResult<()> {
        let function = self.current_function(stmt.span)?;
        let body_bb = self.context.append_basic_block(function, "do.body");
        let cond_bb = self.context.append_basic_block(function, "do.cond");
        let end_bb = self.context.append_basic_block(function, "do.end");

        self.builder
            .build_unconditional_branch(body_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        self.builder.position_at_end(body_bb);
        self.loop_stack.push(LoopFrame {
            continue_block: cond_bb,
            exit_block: end_bb,
        });
        let body_result = self.lower_scoped_block(&stmt.body);
        self.loop_stack.pop();
        body_result?;
        if !self.block_terminated()? {
            self.builder
                .build_unconditional_branch(cond_bb)
                .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        }

        self.builder.position_at_end(cond_bb);
        let cond_val = self.lower_expr(&stmt.cond)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_val, body_bb, end_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    fn lower_for(&mut self, stmt: &For) -> CompileResult<()> {
        // header scope: the init variable lives for the whole loop
        self.push_scope();
        let result = self.lower_for_inner(stmt);
        self.pop_scope();
        result
    }

    fn lower_for_inner(&mut self, stmt: &For) -> CompileResult<()> {
        match &stmt.init {
            ForInit::Variable(decl) => self.lower_var_decl(decl)?,
            ForInit::Assign(assign) => self.lower_assign(assign)?,
        }

        let function = self.current_function(stmt.span)?;
        let cond_bb = self.context.append_basic_block(function, "for.cond");
        let body_bb = self.context.append_basic_block(function, "for.body");
        let update_bb = self.context.append_basic_block(function, "for.update");
        let end_bb = self.context.append_basic_block(function, "for.end");

        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        self.builder.position_at_end(cond_bb);
        let cond_val = self.lower_expr(&stmt.cond)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_val, body_bb, end_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;

        self.builder.position_at_end(body_bb);
        self.loop_stack.push(LoopFrame {
            continue_block: update_bb,
            exit_block: end_bb,
        });
        let body_result = self.lower_scoped_block(&stmt.body);
        self.loop_stack.pop();
        body_result?;
        if !self.block_terminated()? {
            self.builder
                .build_unconditional_branch(update_bb)
                .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        }

        self.builder.position_at_end(update_bb);
        self.lower_assign(&stmt.update)?;
        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    fn lower_return(&mut self, stmt: &Return) -> CompileResult<()> {
        match &stmt.value {
            Some(value) => {
                let target = self.current_ret;
                let raw = self.lower_expr(value)?;
                let out = self.coerce(raw, &value.ty, &target, stmt.span)?;
                self.builder
                    .build_return(Some(&out))
                    .map_err(|e| self.internal(format!("return failed: {e}"), stmt.span))?;
            }
            None => {
                self.builder
                    .build_return(None)
                    .map_err(|e| self.internal(format!("return failed: {e}"), stmt.span))?;
            }
        }
        Ok(())
    }

    fn lower_loop_control(&mut self, stmt: &LoopControl) -> CompileResult<()> {
        let Some(frame) = self.loop_stack.last().copied() else {
            return Err(self.internal("loop control outside of a loop".to_string(), stmt.span));
        };
        let target = match stmt.kind {
            LoopControlKind::Break => frame.exit_block,
            LoopControlKind::Continue => frame.continue_block,
        };
        self.builder
            .build_unconditional_branch(target)
            .map_err(|e| self.internal(format!("branch failed: {e}"), stmt.span))?;
        Ok(())
    }
}
