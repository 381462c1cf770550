//! Mica Compiler CLI
//!
//! The main entry point for the Mica compiler.
//!
//! # Usage
//!
//! ```text
//! micac [OPTIONS] <FILE>
//!
//! Arguments:
//!   <FILE>  Source file to compile
//!
//! Options:
//!   --tokens   Dump the token stream and stop
//!   --ast      Pretty-print the parsed AST and stop
//!   --run      JIT-execute the program instead of printing IR
//!   -h, --help     Print help information
//!   -V, --version  Print version information
//! ```
//!
//! By default the lowered module's textual LLVM IR is printed to stdout.
//! Compile errors print `Line: <n> | Error: <message>` to stderr and exit
//! with status 1; warnings print in the same format but do not fail the
//! run. With `--run` the synthesized entry function is executed in-process
//! and its return value becomes the exit status.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use micac::{codegen, Lexer, TokenKind};

/// The Mica programming language compiler
#[derive(Parser)]
#[command(name = "micac")]
#[command(version)]
#[command(about = "The Mica programming language compiler", long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Dump the token stream and stop
    #[arg(long, conflicts_with_all = ["ast", "run"])]
    tokens: bool,

    /// Pretty-print the parsed AST and stop
    #[arg(long, conflicts_with = "run")]
    ast: bool,

    /// JIT-execute the program instead of printing IR
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match read_source(&cli.file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    if cli.tokens {
        return dump_tokens(&source);
    }

    let mut parser = micac::Parser::new(&source);
    let result = parser.parse_program();
    for warning in parser.take_warnings() {
        eprintln!("{warning}");
    }
    let program = match result {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(1);
        }
    };

    if cli.ast {
        println!("{program:#?}");
        return ExitCode::SUCCESS;
    }

    let interner = parser.take_interner();
    let module_name = module_name(&cli.file);

    if cli.run {
        match codegen::execute(&program, &interner, module_name) {
            Ok(exit) => ExitCode::from(exit as u8),
            Err(err) => {
                eprintln!("{err}");
                ExitCode::from(1)
            }
        }
    } else {
        match codegen::compile_to_ir(&program, &interner, module_name) {
            Ok(ir) => {
                print!("{ir}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("{err}");
                ExitCode::from(1)
            }
        }
    }
}

/// Read source file and return contents
fn read_source(path: &Path) -> Result<String, ExitCode> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            Err(ExitCode::from(1))
        }
    }
}

fn module_name(path: &Path) -> &str {
    path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("mica")
}

/// Tokenize and print the stream, one token per line with its source line
/// number and text. Lexical errors are reported but scanning continues.
fn dump_tokens(source: &str) -> ExitCode {
    let mut has_errors = false;
    for token in Lexer::new(source) {
        match token.kind {
            TokenKind::Error => {
                has_errors = true;
                eprintln!(
                    "Line: {} | Error: unexpected character `{}`",
                    token.span.line,
                    &source[token.span.start..token.span.end]
                );
            }
            TokenKind::Eof => {}
            _ => {
                println!(
                    "{:4}  {:?} '{}'",
                    token.span.line,
                    token.kind,
                    &source[token.span.start..token.span.end]
                );
            }
        }
    }
    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
