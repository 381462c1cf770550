use crate::ast::{
    AssignOp, Expr, ExprKind, Initializer, Literal, Stmt,
};
use crate::diagnostics::{CompileError, ErrorKind};
use crate::parser::Parser;
use crate::types::Type;

fn parse(source: &str) -> crate::ast::Program {
    let mut parser = Parser::new(source);
    match parser.parse_program() {
        Ok(program) => {
            assert_eq!(parser.scope_depth(), 1, "scope stack must unwind to global");
            program
        }
        Err(error) => panic!("parse failed for {source:?}: {error}"),
    }
}

fn parse_err(source: &str) -> CompileError {
    let mut parser = Parser::new(source);
    match parser.parse_program() {
        Ok(_) => panic!("expected a compile error for {source:?}"),
        Err(error) => {
            assert_eq!(
                parser.scope_depth(),
                1,
                "scope stack must unwind to global even on error"
            );
            *error
        }
    }
}

/// The initializer expression of the last statement, which the structure
/// tests write as a `var` declaration.
fn expr_of(source: &str) -> Expr {
    let program = parse(source);
    match program.statements.into_iter().last() {
        Some(Stmt::Variable(decl)) => match decl.init {
            Some(Initializer::Expr(expr)) => expr,
            other => panic!("expected an expression initializer, got {other:?}"),
        },
        other => panic!("expected a variable declaration, got {other:?}"),
    }
}

/// Parenthesized rendering of an expression tree for shape asserts.
fn shape(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(Literal::Int(value)) => value.to_string(),
        ExprKind::Literal(Literal::Float(value)) => value.0.to_string(),
        ExprKind::Literal(Literal::Bool(value)) => value.to_string(),
        ExprKind::Literal(Literal::Char(value)) => format!("'{}'", *value as char),
        ExprKind::Literal(Literal::Str(value)) => format!("{value:?}"),
        ExprKind::Identifier(_) => "id".to_string(),
        ExprKind::Unary { operand, .. } => format!("(!{})", shape(operand)),
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", shape(left), op, shape(right))
        }
        ExprKind::Cast { operand } => format!("cast({})", shape(operand)),
        ExprKind::Member { .. } => "member".to_string(),
        ExprKind::Call(call) => format!("call/{}", call.args.len()),
    }
}

// ============================================================
// Expression shapes and precedence
// ============================================================

#[test]
fn subtraction_is_left_associative() {
    let expr = expr_of("var int x = 1 - 2 - 3;");
    assert_eq!(shape(&expr), "((1 - 2) - 3)");
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = expr_of("var int x = 1 + 2 * 3;");
    assert_eq!(shape(&expr), "(1 + (2 * 3))");
}

#[test]
fn parentheses_override_precedence() {
    let expr = expr_of("var int x = (1 + 2) * 3;");
    assert_eq!(shape(&expr), "((1 + 2) * 3)");
}

#[test]
fn comparison_binds_tighter_than_logical_and() {
    let expr = expr_of("var bool x = 1 < 2 && 3 < 4;");
    assert_eq!(shape(&expr), "((1 < 2) && (3 < 4))");
    assert_eq!(expr.ty, Type::Bool);
}

#[test]
fn logical_or_binds_loosest() {
    let expr = expr_of("var bool x = true && false || true;");
    assert_eq!(shape(&expr), "((true && false) || true)");
}

#[test]
fn not_applies_twice() {
    let expr = expr_of("var bool x = !!true;");
    assert_eq!(shape(&expr), "(!(!true))");
}

#[test]
fn not_binds_tighter_than_logical_and() {
    let expr = expr_of("var bool x = !true && false;");
    assert_eq!(shape(&expr), "((!true) && false)");
}

#[test]
fn comparison_binds_tighter_than_addition_too() {
    // `+` sits below the comparisons, so the comparison folds first and
    // the addition then sees a bool operand.
    let err = parse_err("var int a = 1; var int b = 2; var int c = 3; var int x = a + b < c;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn nested_call_arguments_reuse_closing_paren() {
    let program = parse(
        "func int id(int v) { return v; }\n\
         var int x = id(id(1 + 2));",
    );
    assert_eq!(program.statements.len(), 2);
}

#[test]
fn cast_takes_type_from_keyword() {
    let expr = expr_of("var float32 f = float32(1);");
    assert!(matches!(expr.kind, ExprKind::Cast { .. }));
    assert_eq!(expr.ty, Type::Float32);
}

#[test]
fn cast_result_feeds_arithmetic() {
    let expr = expr_of("var int x = int(1.5) + 2;");
    assert_eq!(shape(&expr), "(cast(1.5) + 2)");
    assert_eq!(expr.ty, Type::Int);
}

#[test]
fn mismatched_open_paren_is_rejected() {
    let err = parse_err("var int x = (1 + 2;");
    match err.kind {
        ErrorKind::Syntax(message) => assert!(message.contains("mismatched parentheses")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn empty_expression_is_rejected() {
    let err = parse_err("var int x = ;");
    assert!(matches!(err.kind, ErrorKind::InvalidExpression(_)), "{err}");
}

#[test]
fn adjacent_operands_are_rejected() {
    let err = parse_err("var int x = 1 2;");
    assert!(matches!(err.kind, ErrorKind::InvalidExpression(_)), "{err}");
}

#[test]
fn trailing_operator_is_rejected() {
    let err = parse_err("var int x = 1 + ;");
    assert!(matches!(err.kind, ErrorKind::InvalidExpression(_)), "{err}");
}

// ============================================================
// Expression typing
// ============================================================

#[test]
fn logical_operators_require_bool() {
    let err = parse_err("var bool x = 1 && 2;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn not_requires_bool() {
    let err = parse_err("var bool x = !1;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn arithmetic_rejects_bool_operands() {
    let err = parse_err("var bool x = true + false;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn strings_do_not_compare() {
    let err = parse_err(r#"var bool x = "a" < "b";"#);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn concrete_width_wins_within_a_family() {
    let expr = expr_of("var int8 a = 1; var int x = a + 2;");
    assert_eq!(expr.ty, Type::Int8);
}

#[test]
fn signed_and_unsigned_families_do_not_mix() {
    let err = parse_err("var uint u = 1; var int x = u + 1;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn float_literal_fits_both_float_widths() {
    parse("var float32 s = 1.5; var float64 d = 2.5; var float f = 3.5;");
}

#[test]
fn char_takes_part_in_arithmetic() {
    let expr = expr_of("var char c = 'a'; var char d = c + 'b';");
    assert_eq!(expr.ty, Type::Char);
}

// ============================================================
// Declarations
// ============================================================

#[test]
fn duplicate_declaration_in_one_scope() {
    let err = parse_err("var int x = 1; var int x = 2;");
    assert!(matches!(err.kind, ErrorKind::DuplicateSymbol(_)), "{err}");
}

#[test]
fn inner_scope_may_shadow() {
    parse("var int x = 1; if (true) { var int x = 2; }");
}

#[test]
fn assignment_to_undeclared_name() {
    let err = parse_err("x = 1;");
    assert!(matches!(err.kind, ErrorKind::UndeclaredSymbol(_)), "{err}");
}

#[test]
fn undeclared_name_in_expression() {
    let err = parse_err("var int x = y + 1;");
    assert!(matches!(err.kind, ErrorKind::UndeclaredSymbol(_)), "{err}");
}

#[test]
fn constants_cannot_be_reassigned() {
    let err = parse_err("const int x = 1; x = 2;");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("constant")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn constant_without_initializer_parses() {
    parse("const int x;");
}

#[test]
fn initializer_must_match_declared_type() {
    let err = parse_err(r#"var int x = "hi";"#);
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn nothing_is_not_a_variable_type() {
    let err = parse_err("var nothing x;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn compound_assignment_parses() {
    let program = parse("var int x = 1; x += 2;");
    match &program.statements[1] {
        Stmt::Assign(assign) => assert_eq!(assign.op, AssignOp::Add),
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn compound_assignment_needs_arithmetic_type() {
    let err = parse_err("var bool b = true; b += true;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

// ============================================================
// Functions and calls
// ============================================================

#[test]
fn call_statement_discards_value() {
    let program = parse("func nothing ping() { } ping();");
    assert!(matches!(program.statements[1], Stmt::Call(..)));
}

#[test]
fn call_arity_is_checked() {
    let err = parse_err("func int id(int v) { return v; } var int x = id();");
    match err.kind {
        ErrorKind::TypeMismatch(message) => {
            assert!(message.contains("expects 1 argument(s), found 0"), "{message}");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn call_argument_types_are_checked() {
    let err = parse_err("func int id(int v) { return v; } var int x = id(true);");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn calling_an_undeclared_function() {
    let err = parse_err("var int x = f(1);");
    assert!(matches!(err.kind, ErrorKind::UndeclaredSymbol(_)), "{err}");
}

#[test]
fn calling_a_variable_is_rejected() {
    let err = parse_err("var int x = 1; var int y = x(2);");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("not a function")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn recursive_calls_resolve() {
    parse(
        "func int fact(int n) {\n\
             if (n <= 1) { return 1; }\n\
             return n * fact(n - 1);\n\
         }",
    );
}

#[test]
fn parameters_share_the_function_scope() {
    let err = parse_err("func int f(int a, int a) { return a; }");
    assert!(matches!(err.kind, ErrorKind::DuplicateSymbol(_)), "{err}");
}

#[test]
fn nothing_is_not_a_parameter_type() {
    let err = parse_err("func int f(nothing x) { return 1; }");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn return_type_is_checked() {
    let err = parse_err("func int f() { return true; }");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn nothing_function_rejects_a_return_value() {
    let err = parse_err("func nothing f() { return 1; }");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn value_function_rejects_a_bare_return() {
    let err = parse_err("func int f() { return; }");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("needs a value")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn return_at_top_level_is_rejected() {
    let err = parse_err("return 1;");
    assert!(matches!(err.kind, ErrorKind::Syntax(_)), "{err}");
}

// ============================================================
// Structs
// ============================================================

#[test]
fn struct_declaration_member_access_and_assignment() {
    let program = parse(
        "struct Point { int x; int y; }\n\
         var Point p = { 1, 2 };\n\
         var int x = p.x;\n\
         p.y += 1;",
    );
    assert_eq!(program.statements.len(), 4);
}

#[test]
fn missing_member_is_rejected() {
    let err = parse_err("struct Point { int x; } var Point p = { 1 }; var int y = p.y;");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("has no member")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn member_access_on_a_scalar_is_rejected() {
    let err = parse_err("var int x = 1; var int y = x.len;");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn empty_struct_is_rejected() {
    let err = parse_err("struct Empty { }");
    match err.kind {
        ErrorKind::Syntax(message) => assert!(message.contains("no members")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn duplicate_members_are_rejected() {
    let err = parse_err("struct P { int x; int x; }");
    assert!(matches!(err.kind, ErrorKind::DuplicateSymbol(_)), "{err}");
}

#[test]
fn initializer_arity_matches_member_count() {
    let err = parse_err("struct Point { int x; int y; } var Point p = { 1 };");
    match err.kind {
        ErrorKind::TypeMismatch(message) => {
            assert!(message.contains("2 member(s), initializer provides 1"), "{message}");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn initializer_values_match_member_types() {
    let err = parse_err("struct Point { int x; } var Point p = { true };");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch(_)), "{err}");
}

#[test]
fn struct_variable_rejects_a_scalar_initializer() {
    let err = parse_err("struct Point { int x; } var Point p = 1;");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("member-list")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn unknown_struct_type_is_rejected() {
    let err = parse_err("var Point p;");
    assert!(matches!(err.kind, ErrorKind::UndeclaredSymbol(_)), "{err}");
}

#[test]
fn function_name_is_not_a_type() {
    let err = parse_err("func int f() { return 1; } var f x;");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("not a type")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

// ============================================================
// Control flow
// ============================================================

#[test]
fn else_if_chain_keeps_order() {
    let program = parse(
        "var int x = 0;\n\
         if (x < 1) { x = 1; } else if (x < 2) { x = 2; } else { x = 3; }",
    );
    match &program.statements[1] {
        Stmt::If(stmt) => {
            assert_eq!(stmt.else_ifs.len(), 1);
            assert!(stmt.else_body.is_some());
        }
        other => panic!("expected an if statement, got {other:?}"),
    }
}

#[test]
fn condition_must_be_bool() {
    let err = parse_err("if (1) { }");
    match err.kind {
        ErrorKind::TypeMismatch(message) => assert!(message.contains("condition must be `bool`")),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn while_loop_allows_break_and_continue() {
    parse(
        "var int i = 0;\n\
         while (i < 10) {\n\
             i += 1;\n\
             if (i == 5) { break; }\n\
             continue;\n\
         }",
    );
}

#[test]
fn do_while_parses() {
    parse("var int i = 0; do { i += 1; } while (i < 3);");
}

#[test]
fn for_header_declaration_is_loop_local() {
    parse("for (var int i = 0; i < 3; i += 1) { var int j = i; }");
    let err = parse_err("for (var int i = 0; i < 3; i += 1) { } var int x = i;");
    assert!(matches!(err.kind, ErrorKind::UndeclaredSymbol(_)), "{err}");
}

#[test]
fn for_init_may_assign_an_existing_variable() {
    parse("var int i = 9; for (i = 0; i < 3; i += 1) { }");
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let err = parse_err("break;");
    match err.kind {
        ErrorKind::Syntax(message) => assert!(message.contains("outside of a loop")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn continue_in_a_function_without_a_loop_is_rejected() {
    let err = parse_err("func nothing f() { continue; }");
    assert!(matches!(err.kind, ErrorKind::Syntax(_)), "{err}");
}

#[test]
fn function_bodies_do_not_inherit_enclosing_loops() {
    let err = parse_err(
        "var bool t = true;\n\
         while (t) { func nothing f() { break; } }",
    );
    match err.kind {
        ErrorKind::Syntax(message) => assert!(message.contains("outside of a loop")),
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

// ============================================================
// Warnings and diagnostics
// ============================================================

#[test]
fn statements_after_return_warn_once_per_block() {
    let mut parser = Parser::new("func int f() { return 1; var int a = 2; var int b = 3; }");
    parser.parse_program().expect("program should parse");
    let warnings = parser.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].to_string().contains("unreachable"));
}

#[test]
fn errors_carry_the_source_line() {
    let err = parse_err("var int x = 1;\nvar int x = 2;");
    assert_eq!(err.line, Some(2));
    assert_eq!(err.to_string(), "Line: 2 | Error: duplicate symbol `x`");
}

#[test]
fn eof_inside_a_block_is_a_syntax_error() {
    let err = parse_err("func int f() { return 1;");
    assert!(matches!(err.kind, ErrorKind::Syntax(_)), "{err}");
}
