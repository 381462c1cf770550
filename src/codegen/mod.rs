//! LLVM lowering for Mica.
//!
//! The typed AST is translated straight to LLVM IR through inkwell. Every
//! variable gets a stack slot (`alloca`) where its declaration executes;
//! reads are loads, writes are stores, and mem2reg is left to later LLVM
//! passes. Top-level statements execute inside a synthesized `i32 main`
//! that returns 0, so a source file is runnable without declaring an
//! entry point.
//!
//! Each function is verified as soon as its body is complete, and the
//! whole module is verified once more before IR is printed or executed.

mod context;
mod control;
mod expr;
mod types;

pub use context::Codegen;

use inkwell::context::Context;
use inkwell::OptimizationLevel;

use string_interner::DefaultStringInterner;

use crate::ast::Program;
use crate::diagnostics::{CompileError, CompileResult, ErrorKind};

/// Lower a parsed program to LLVM IR text.
pub fn compile_to_ir(
    program: &Program,
    interner: &DefaultStringInterner,
    module_name: &str,
) -> CompileResult<String> {
    let context = Context::create();
    let module = context.create_module(module_name);
    let builder = context.create_builder();

    let mut codegen = Codegen::new(&context, &module, &builder, interner);
    codegen.lower_program(program)?;

    if let Err(err) = module.verify() {
        return CompileError::new(ErrorKind::Internal(format!(
            "module verification failed: {err}"
        )))
        .into_err();
    }

    Ok(module.print_to_string().to_string())
}

/// Lower a parsed program and run its entry point in-process, returning
/// the exit value of the synthesized `main`.
pub fn execute(
    program: &Program,
    interner: &DefaultStringInterner,
    module_name: &str,
) -> CompileResult<i32> {
    let context = Context::create();
    let module = context.create_module(module_name);
    let builder = context.create_builder();

    let mut codegen = Codegen::new(&context, &module, &builder, interner);
    codegen.lower_program(program)?;

    if let Err(err) = module.verify() {
        return CompileError::new(ErrorKind::Internal(format!(
            "module verification failed: {err}"
        )))
        .into_err();
    }

    let engine = module
        .create_jit_execution_engine(OptimizationLevel::None)
        .map_err(|err| {
            Box::new(CompileError::new(ErrorKind::Internal(format!(
                "failed to create execution engine: {err}"
            ))))
        })?;

    let exit = unsafe {
        let main_fn = engine
            .get_function::<unsafe extern "C" fn() -> i32>("main")
            .map_err(|err| {
                Box::new(CompileError::new(ErrorKind::Internal(format!(
                    "entry point lookup failed: {err}"
                ))))
            })?;
        main_fn.call()
    };
    Ok(exit)
}
