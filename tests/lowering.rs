//! Lowering tests: compile Mica source to LLVM IR text and assert on the
//! emitted instructions.
//!
//! Arithmetic fixtures route operands through variables; the LLVM builder
//! constant-folds operations on two literals, which would fold away the
//! very instruction under test.

use micac::{codegen, Parser};

/// Compile source to IR text, panicking on any front-end or lowering error.
fn lower(source: &str) -> String {
    let mut parser = Parser::new(source);
    let program = parser
        .parse_program()
        .expect("fixture should parse without errors");
    let interner = parser.take_interner();
    codegen::compile_to_ir(&program, &interner, "test")
        .expect("fixture should lower without errors")
}

/// Compile source expecting lowering to fail; returns the rendered error.
fn lower_err(source: &str) -> String {
    let mut parser = Parser::new(source);
    let program = parser
        .parse_program()
        .expect("fixture should parse without errors");
    let interner = parser.take_interner();
    codegen::compile_to_ir(&program, &interner, "test")
        .expect_err("lowering should fail")
        .to_string()
}

fn assert_ir_contains(ir: &str, needle: &str) {
    assert!(
        ir.contains(needle),
        "IR should contain `{needle}`, got:\n{ir}"
    );
}

// ============================================================
// Entry function and literals
// ============================================================

#[test]
fn test_synthesized_entry_function() {
    let ir = lower("");
    assert_ir_contains(&ir, "; ModuleID = 'test'");
    assert_ir_contains(&ir, "define i32 @main()");
    assert_ir_contains(&ir, "ret i32 0");
}

#[test]
fn test_literal_constants_round_trip() {
    let ir = lower(
        r#"
        var int a = 42;
        var char c = 'A';
        var bool t = true;
        var float f = 1.5;
        var float64 d = 2.5;
        "#,
    );
    assert_ir_contains(&ir, "store i32 42");
    assert_ir_contains(&ir, "store i8 65");
    assert_ir_contains(&ir, "store i1 true");
    assert_ir_contains(&ir, "store float 1.500000e+00");
    assert_ir_contains(&ir, "store double 2.500000e+00");
}

#[test]
fn test_string_literal_global() {
    let ir = lower(r#"var string s = "hi";"#);
    assert_ir_contains(&ir, "c\"hi\\00\"");
    assert_ir_contains(&ir, "store i8*");
}

// ============================================================
// Instruction selection
// ============================================================

#[test]
fn test_integer_arithmetic_selection() {
    let ir = lower(
        r#"
        var int x = 5;
        var int y = 3;
        var int s = x + y;
        var int d = x - y;
        var int m = x * y;
        var int q = x / y;
        var int r = x % y;
        "#,
    );
    assert_ir_contains(&ir, "add i32");
    assert_ir_contains(&ir, "sub i32");
    assert_ir_contains(&ir, "mul i32");
    assert_ir_contains(&ir, "sdiv i32");
    assert_ir_contains(&ir, "srem i32");
}

#[test]
fn test_float_arithmetic_selection() {
    let ir = lower(
        r#"
        var float x = 1.5;
        var float y = 2.5;
        var float s = x + y;
        var float d = x - y;
        var float m = x * y;
        var float q = x / y;
        var float r = x % y;
        "#,
    );
    assert_ir_contains(&ir, "fadd float");
    assert_ir_contains(&ir, "fsub float");
    assert_ir_contains(&ir, "fmul float");
    assert_ir_contains(&ir, "fdiv float");
    assert_ir_contains(&ir, "frem float");
}

#[test]
fn test_integer_comparison_predicates() {
    let ir = lower(
        r#"
        var int x = 1;
        var int y = 2;
        var bool a = x == y;
        var bool b = x != y;
        var bool c = x < y;
        var bool d = x <= y;
        var bool e = x > y;
        var bool f = x >= y;
        "#,
    );
    assert_ir_contains(&ir, "icmp eq i32");
    assert_ir_contains(&ir, "icmp ne i32");
    assert_ir_contains(&ir, "icmp slt i32");
    assert_ir_contains(&ir, "icmp sle i32");
    assert_ir_contains(&ir, "icmp sgt i32");
    assert_ir_contains(&ir, "icmp sge i32");
}

#[test]
fn test_float_comparison_predicates() {
    let ir = lower(
        r#"
        var float x = 1.0;
        var float y = 2.0;
        var bool a = x == y;
        var bool b = x != y;
        var bool c = x < y;
        var bool d = x <= y;
        var bool e = x > y;
        var bool f = x >= y;
        "#,
    );
    assert_ir_contains(&ir, "fcmp ueq float");
    assert_ir_contains(&ir, "fcmp one float");
    assert_ir_contains(&ir, "fcmp olt float");
    assert_ir_contains(&ir, "fcmp ole float");
    assert_ir_contains(&ir, "fcmp ogt float");
    assert_ir_contains(&ir, "fcmp oge float");
}

#[test]
fn test_unsigned_shares_signed_instructions() {
    let ir = lower(
        r#"
        var uint x = uint(6);
        var uint y = uint(3);
        var uint q = x / y;
        var bool c = x < y;
        "#,
    );
    assert_ir_contains(&ir, "sdiv i32");
    assert_ir_contains(&ir, "icmp slt i32");
}

#[test]
fn test_char_arithmetic_is_i8() {
    let ir = lower(
        r#"
        var char a = 'a';
        var char s = a + 'b';
        "#,
    );
    assert_ir_contains(&ir, "add i8");
}

#[test]
fn test_logical_connectives_are_eager() {
    let ir = lower(
        r#"
        var bool a = true;
        var bool b = false;
        var bool c = a && b;
        var bool d = a || b;
        var bool n = !a;
        "#,
    );
    assert_ir_contains(&ir, "and i1");
    assert_ir_contains(&ir, "or i1");
    // build_not emits xor with all-ones
    assert_ir_contains(&ir, "xor i1");
    assert!(!ir.contains("br i1"), "no short-circuit branches expected");
}

// ============================================================
// Casts and width adjustment
// ============================================================

#[test]
fn test_cast_matrix() {
    let ir = lower(
        r#"
        var int x = 65;
        var char c = char(x);
        var int y = int(c);
        var float f = float(x);
        var uint u = uint(9);
        var float g = float(u);
        var int t = int(f);
        var bool bx = bool(x);
        var int bi = int(bx);
        var bool bf = bool(f);
        var float fb = float(bx);
        var float64 w = float64(f);
        "#,
    );
    assert_ir_contains(&ir, "trunc i32"); // char(x)
    assert_ir_contains(&ir, "zext i8"); // int(c)
    assert_ir_contains(&ir, "sitofp i32"); // float(x)
    assert_ir_contains(&ir, "uitofp i32"); // float(u)
    assert_ir_contains(&ir, "fptosi float"); // int(f)
    assert_ir_contains(&ir, "icmp ne i32"); // bool(x)
    assert_ir_contains(&ir, "zext i1"); // int(bx)
    assert_ir_contains(&ir, "fcmp one float"); // bool(f)
    assert_ir_contains(&ir, "uitofp i1"); // float(bx)
    assert_ir_contains(&ir, "fpext float"); // float64(f)
}

#[test]
fn test_unsupported_cast_is_fatal() {
    let message = lower_err("var string s = string(1);");
    assert_eq!(
        message,
        "Line: 1 | Error: unsupported cast from `int` to `string`"
    );

    let message = lower_err(
        r#"
        struct Point { int x; int y; }
        var Point p = { 1, 2 };
        var int bad = int(p);
        "#,
    );
    assert!(
        message.contains("unsupported cast from `Point` to `int`"),
        "got: {message}"
    );
}

#[test]
fn test_width_adjustment_at_binding_points() {
    let ir = lower(
        r#"
        var int g = 200;
        var int64 wide = g;
        var int8 narrow = g;
        var uint u = uint(5);
        var uint64 uwide = u;
        "#,
    );
    assert_ir_contains(&ir, "sext i32");
    assert_ir_contains(&ir, "trunc i32");
    assert_ir_contains(&ir, "zext i32");
}

// ============================================================
// Structs
// ============================================================

#[test]
fn test_struct_layout_and_member_access() {
    let ir = lower(
        r#"
        struct Point { int x; int y; }
        var Point p = { 1, 2 };
        p.x = 3;
        var int my = p.y;
        "#,
    );
    assert_ir_contains(&ir, "%Point = type { i32, i32 }");
    assert_ir_contains(&ir, "getelementptr inbounds %Point");
    assert_ir_contains(&ir, "store i32 1");
    assert_ir_contains(&ir, "store i32 2");
    assert_ir_contains(&ir, "store i32 3");
}

#[test]
fn test_whole_struct_assignment() {
    let ir = lower(
        r#"
        struct Point { int x; int y; }
        var Point p = { 1, 2 };
        var Point q = { 3, 4 };
        p = q;
        "#,
    );
    assert_ir_contains(&ir, "load %Point");
}

// ============================================================
// Functions
// ============================================================

#[test]
fn test_function_definition_and_call() {
    let ir = lower(
        r#"
        func int add(int a, int b) { return a + b; }
        var int r = add(2, 3);
        "#,
    );
    assert_ir_contains(&ir, "define i32 @add(");
    assert_ir_contains(&ir, "add i32");
    assert_ir_contains(&ir, "call i32 @add(i32 2, i32 3)");
}

#[test]
fn test_nothing_function() {
    let ir = lower(
        r#"
        func nothing noop() { }
        noop();
        "#,
    );
    assert_ir_contains(&ir, "define void @noop()");
    assert_ir_contains(&ir, "ret void");
    assert_ir_contains(&ir, "call void @noop()");
}

#[test]
fn test_fall_off_end_returns_zero() {
    let ir = lower("func int f() { var int x = 1; }");
    assert_ir_contains(&ir, "define i32 @f()");
    // one default return in f, one in the synthesized entry
    assert_eq!(ir.matches("ret i32 0").count(), 2);
}

#[test]
fn test_struct_default_return() {
    let ir = lower(
        r#"
        struct Point { int x; int y; }
        func Point make() { }
        "#,
    );
    assert_ir_contains(&ir, "ret %Point zeroinitializer");
}

#[test]
fn test_recursive_function() {
    let ir = lower(
        r#"
        func int fact(int n) {
            if (n <= 1) { return 1; }
            return n * fact(n - 1);
        }
        var int r = fact(5);
        "#,
    );
    assert_ir_contains(&ir, "define i32 @fact(");
    assert_ir_contains(&ir, "call i32 @fact");
    assert_ir_contains(&ir, "mul i32");
}

// ============================================================
// Control flow
// ============================================================

#[test]
fn test_if_else_chain_blocks() {
    let ir = lower(
        r#"
        var int x = 1;
        var int r = 0;
        if (x == 1) { r = 1; }
        else if (x == 2) { r = 2; }
        else { r = 3; }
        "#,
    );
    assert_ir_contains(&ir, "if.then:");
    assert_ir_contains(&ir, "if.next:");
    assert_ir_contains(&ir, "if.end:");
    assert_ir_contains(&ir, "br i1");
}

#[test]
fn test_while_loop_blocks() {
    let ir = lower(
        r#"
        var int i = 0;
        while (i < 3) {
            i = i + 1;
        }
        "#,
    );
    assert_ir_contains(&ir, "while.cond:");
    assert_ir_contains(&ir, "while.body:");
    assert_ir_contains(&ir, "while.end:");
    assert_ir_contains(&ir, "icmp slt i32");
}

#[test]
fn test_do_while_enters_body_first() {
    let ir = lower(
        r#"
        var int i = 0;
        do {
            i = i + 1;
        } while (i < 3);
        "#,
    );
    assert_ir_contains(&ir, "br label %do.body");
    assert_ir_contains(&ir, "do.cond:");
    assert_ir_contains(&ir, "do.end:");
}

#[test]
fn test_for_loop_blocks() {
    let ir = lower(
        r#"
        for (var int i = 0; i < 3; i = i + 1) {
            var int t = i;
        }
        "#,
    );
    assert_ir_contains(&ir, "for.cond:");
    assert_ir_contains(&ir, "for.body:");
    assert_ir_contains(&ir, "for.update:");
    assert_ir_contains(&ir, "for.end:");
}

#[test]
fn test_break_and_continue_targets() {
    let ir = lower(
        r#"
        var int i = 0;
        while (i < 10) {
            i = i + 1;
            if (i == 5) { break; }
            if (i == 7) { continue; }
        }
        "#,
    );
    assert_ir_contains(&ir, "br label %while.end");
    assert_ir_contains(&ir, "br label %while.cond");
}

#[test]
fn test_compound_assignment() {
    let ir = lower(
        r#"
        var int x = 10;
        x += 5;
        x *= 2;
        var float f = 1.0;
        f /= 2.0;
        "#,
    );
    assert_ir_contains(&ir, "add i32");
    assert_ir_contains(&ir, "mul i32");
    assert_ir_contains(&ir, "fdiv float");
}

// ============================================================
// Execution
// ============================================================

#[test]
fn test_execute_runs_entry_function() {
    let mut parser = Parser::new("var int x = 41; x = x + 1;");
    let program = parser.parse_program().expect("fixture should parse");
    let interner = parser.take_interner();
    let exit = codegen::execute(&program, &interner, "jit").expect("fixture should execute");
    assert_eq!(exit, 0, "the synthesized entry returns 0");
}
