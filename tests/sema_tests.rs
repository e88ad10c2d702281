use v_compiler::ast::{ExprId, ExprKind, Program, StmtKind, Value};
use v_compiler::diag::DiagSink;
use v_compiler::driver::analyze_source;
use v_compiler::reflect::Registry;
use v_compiler::sema::evaluate;

fn analyze(src: &str) -> (Option<Program>, DiagSink) {
    let mut diag = DiagSink::new();
    let provider = Registry::standard();
    let program = analyze_source(src, &[], &provider, &mut diag).expect("fatal scan error");
    (program, diag)
}

fn analyze_ok(src: &str) -> (Program, DiagSink) {
    let (program, diag) = analyze(src);
    let program = program.unwrap_or_else(|| panic!("unexpected errors: {:?}", diag.messages()));
    (program, diag)
}

fn main_stmts(program: &Program) -> Vec<v_compiler::ast::StmtId> {
    match &program.stmts[program.funcs[program.main].body].kind {
        StmtKind::Block(list) => list.clone(),
        other => panic!("main body is not a block: {other:?}"),
    }
}

/// The right side of the first assignment in `Main`.
fn first_assign_rhs(program: &Program) -> ExprId {
    for &s in &main_stmts(program) {
        if let StmtKind::Assign { rhs, .. } = program.stmts[s].kind {
            return rhs;
        }
    }
    panic!("no assignment in main");
}

#[test]
fn constants_fold_across_operators() {
    let (program, _) = analyze_ok("program P; var int x; begin x = 1 + 2 * 3; end");
    let rhs = first_assign_rhs(&program);
    assert_eq!(program.exprs[rhs].kind, ExprKind::Const(Value::Int(7)));
}

#[test]
fn int_widens_to_double_and_folds() {
    let (program, _) = analyze_ok("program P; var double x; begin x = 1 + 2.0; end");
    let rhs = first_assign_rhs(&program);
    assert_eq!(program.exprs[rhs].kind, ExprKind::Const(Value::Double(3.0)));
}

#[test]
fn string_concatenation_folds() {
    let (program, _) = analyze_ok(r#"program P; var string s; begin s = "ab" + "cd"; end"#);
    let rhs = first_assign_rhs(&program);
    assert_eq!(
        program.exprs[rhs].kind,
        ExprKind::Const(Value::Str("abcd".to_string()))
    );
}

#[test]
fn string_escapes_decode_in_constants() {
    let (program, _) = analyze_ok(r#"program P; var string s; begin s = "a\tb\n"; end"#);
    let rhs = first_assign_rhs(&program);
    assert_eq!(
        program.exprs[rhs].kind,
        ExprKind::Const(Value::Str("a\tb\n".to_string()))
    );
}

#[test]
fn explicit_cast_narrows_and_folds() {
    let (program, _) = analyze_ok("program P; var int x; begin x = {int} 2.75; end");
    let rhs = first_assign_rhs(&program);
    assert_eq!(program.exprs[rhs].kind, ExprKind::Const(Value::Int(2)));
}

#[test]
fn same_type_cast_warns_and_is_elided() {
    let (program, diag) = analyze_ok("program P; var int x; begin x = {int} 2; end");
    assert_eq!(diag.warning_count(), 1);
    assert!(diag.messages()[0].contains("cast to the same type"));
    let rhs = first_assign_rhs(&program);
    assert_eq!(program.exprs[rhs].kind, ExprKind::Const(Value::Int(2)));
}

#[test]
fn unary_minus_folds_and_rejects_bools() {
    let (program, _) = analyze_ok("program P; var int x; begin x = -3; end");
    let rhs = first_assign_rhs(&program);
    assert_eq!(program.exprs[rhs].kind, ExprKind::Const(Value::Int(-3)));

    let (_, diag) = analyze("program P; var int x; begin x = -true; end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn division_by_constant_zero_is_an_error() {
    let (_, diag) = analyze("program P; var int x; begin x = 1 / 0; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("division by zero"));
}

#[test]
fn modulo_is_int_only() {
    let (_, diag) = analyze("program P; var double x; begin x = 1.5 % 2.0; end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn incompatible_operands_report_once() {
    // the ill-typed sum takes the unsupported type, so the enclosing
    // assignment stays silent instead of cascading
    let (_, diag) = analyze(r#"program P; var int x; begin x = 1 + "s"; end"#);
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn constant_if_replaces_itself_with_taken_branch() {
    let (program, diag) = analyze_ok("program P; begin if (1 == 1) return; else return; end");
    assert_eq!(diag.warning_count(), 0);
    let stmts = main_stmts(&program);
    assert_eq!(stmts.len(), 1);
    assert!(matches!(
        program.stmts[stmts[0]].kind,
        StmtKind::Return(None)
    ));
}

#[test]
fn constant_false_if_without_else_disappears() {
    let (program, _) = analyze_ok("program P; var int x; begin if (false) x = 1; end");
    let stmts = main_stmts(&program);
    // first statement became an empty block, then the synthetic return
    assert!(matches!(&program.stmts[stmts[0]].kind, StmtKind::Block(b) if b.is_empty()));
}

#[test]
fn constant_false_while_is_removed() {
    let (program, _) = analyze_ok("program P; var int x; begin while (false) x = 1; end");
    let stmts = main_stmts(&program);
    assert!(matches!(&program.stmts[stmts[0]].kind, StmtKind::Block(b) if b.is_empty()));
}

#[test]
fn constant_false_do_while_keeps_one_body_run() {
    let (program, _) = analyze_ok("program P; var int x; begin do x = 1; while (false) end");
    let stmts = main_stmts(&program);
    assert!(matches!(
        program.stmts[stmts[0]].kind,
        StmtKind::Assign { .. }
    ));
}

#[test]
fn unreachable_code_is_removed_with_a_warning() {
    let src = "program P; function f() : int begin return 1; return 2; end begin end";
    let (program, diag) = analyze_ok(src);
    assert_eq!(diag.warning_count(), 1);
    assert!(diag.messages()[0].contains("unreachable code detected"));
    let (_, f) = program.funcs.iter().find(|(_, f)| f.name == "f").unwrap();
    let StmtKind::Block(body) = &program.stmts[f.body].kind else {
        panic!("function body is not a block");
    };
    assert_eq!(body.len(), 1);
}

#[test]
fn missing_return_on_value_function_is_an_error() {
    let src = "program P; var bool b; function f() : int begin if (b) return 1; end begin end";
    let (_, diag) = analyze(src);
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("not all code paths return a value"));
}

#[test]
fn both_branches_returning_satisfies_the_check() {
    let src = "program P; var bool b; \
               function f() : int begin if (b) return 1; else return 2; end \
               begin end";
    let (_, diag) = analyze(src);
    assert_eq!(diag.error_count(), 0);
}

#[test]
fn void_bodies_get_a_synthetic_return() {
    let (program, _) = analyze_ok("program P; begin end");
    let stmts = main_stmts(&program);
    assert_eq!(stmts.len(), 1);
    assert!(matches!(
        program.stmts[stmts[0]].kind,
        StmtKind::Return(None)
    ));
    assert!(program.stmts[program.funcs[program.main].body].returns);
}

#[test]
fn return_value_coerces_to_declared_type() {
    let src = "program P; function f() : double begin return 1; end begin end";
    let (program, diag) = analyze_ok(src);
    assert_eq!(diag.error_count(), 0);
    let (_, f) = program.funcs.iter().find(|(_, f)| f.name == "f").unwrap();
    let StmtKind::Block(body) = &program.stmts[f.body].kind else {
        panic!("not a block");
    };
    let StmtKind::Return(Some(e)) = program.stmts[body[0]].kind else {
        panic!("not a return");
    };
    assert_eq!(program.exprs[e].kind, ExprKind::Const(Value::Double(1.0)));
}

#[test]
fn void_return_with_value_is_an_error() {
    let (_, diag) = analyze("program P; function f() begin return 1; end begin end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn assignment_target_must_be_assignable() {
    let (_, diag) = analyze("program P; begin 1 = 2; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("not a variable"));
}

#[test]
fn bare_non_call_expression_statement_is_an_error() {
    let (_, diag) = analyze("program P; var int x; begin x + 1; end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn indexer_checks_rank_and_index_type() {
    let (_, diag) = analyze("program P; var int[2,3] a; int x; begin x = a[1]; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("number of array indices"));

    let (_, diag) = analyze("program P; var int[2] a; int x; begin x = a[1.5]; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("index must be of type int"));

    let (_, diag) = analyze("program P; var int x; begin x = x[1]; end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn indexing_yields_the_element_primitive() {
    let (program, diag) = analyze_ok(
        "program P; var double[2,2] a; double x; begin x = a[0, 1]; end",
    );
    assert_eq!(diag.error_count(), 0);
    let rhs = first_assign_rhs(&program);
    assert_eq!(
        program.exprs[rhs].ty,
        Some(v_compiler::types::Type::DOUBLE)
    );
}

#[test]
fn for_loop_variable_rules() {
    let (_, diag) = analyze("program P; var double d; begin for d = 1 to 3 do d = d; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("for-loop variable"));

    let (_, diag) = analyze("program P; var int i; begin for i = 1 to 2.5 do i = i; end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("for-loop bound"));
}

#[test]
fn every_evaluated_expression_carries_a_type() {
    let src = "program P; \
               var int g; double[2] a; \
               function f(double x) : double begin return x; end \
               begin \
               g = {int} f(g + 1.5); \
               a[0] = Math.Pi; \
               if ((g > 0) and (g != 3)) g = -g; \
               Console.Write(g); \
               end";
    let (program, diag) = analyze_ok(src);
    assert_eq!(diag.error_count(), 0);
    for (_, expr) in program.exprs.iter() {
        assert!(expr.ty.is_some(), "untyped expression: {expr:?}");
    }
}

#[test]
fn evaluation_is_a_fixed_point() {
    let src = "program P; \
               var int g; double d; \
               function f(int a) : double begin return a + 0.5; end \
               begin \
               g = 2 + 3; \
               d = f(g) + 1; \
               if (g > 1) g = 0; \
               while (g < 5) g = g + 1; \
               end";
    let (mut program, _) = analyze_ok(src);
    let snapshot = program.clone();
    let provider = Registry::standard();
    let mut diag = DiagSink::new();
    evaluate(&mut program, &provider, &mut diag);
    assert_eq!(diag.error_count(), 0);
    assert_eq!(program, snapshot);
}
