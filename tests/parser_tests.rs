use v_compiler::ast::{self, ExprKind, Program, StmtKind};
use v_compiler::diag::DiagSink;
use v_compiler::parser::Parser;
use v_compiler::scanner::Scanner;

fn parse(src: &str) -> (Program, DiagSink) {
    let mut diag = DiagSink::new();
    let scanner = Scanner::from_source(src).expect("scanner construction failed");
    let parser = Parser::new(scanner, vec!["core".to_string()], &mut diag);
    let program = parser.parse().expect("fatal scan error");
    (program, diag)
}

/// Parse `expr` as the right side of an assignment and pretty-print it with
/// the parenthesization the parser chose.
fn parse_expr(expr: &str) -> String {
    let src = format!("program P; begin x = {expr}; end");
    let (program, diag) = parse(&src);
    assert_eq!(diag.error_count(), 0, "unexpected parse errors for {expr:?}");
    let body = main_block(&program);
    match &program.stmts[body[0]].kind {
        StmtKind::Assign { rhs, .. } => ast::pretty_expr(&program, *rhs),
        other => panic!("expected an assignment, got {other:?}"),
    }
}

fn main_block(program: &Program) -> Vec<v_compiler::ast::StmtId> {
    match &program.stmts[program.funcs[program.main].body].kind {
        StmtKind::Block(list) => list.clone(),
        other => panic!("main body is not a block: {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(parse_expr("1 + 2 * 3"), "(1 + (2 * 3))");
}

#[test]
fn logical_binds_tighter_than_equality() {
    // reversed from C-like languages: `==` is the loosest level
    assert_eq!(parse_expr("a == b and c"), "(a == (b and c))");
    assert_eq!(parse_expr("a and b == c"), "((a and b) == c)");
}

#[test]
fn addition_binds_tighter_than_logical() {
    assert_eq!(parse_expr("a + b and c"), "((a + b) and c)");
}

#[test]
fn relational_chains_stay_left_associative() {
    assert_eq!(parse_expr("1 < 2 == true"), "((1 < 2) == true)");
}

#[test]
fn unary_and_cast_forms() {
    assert_eq!(parse_expr("-x + 2"), "((-(x)) + 2)");
    assert_eq!(parse_expr("!a or b"), "((!(a)) or b)");
    assert_eq!(parse_expr("{int} 2.5"), "{int} (2.5)");
}

#[test]
fn parenthesized_groups_override() {
    assert_eq!(parse_expr("(1 + 2) * 3"), "((1 + 2) * 3)");
}

#[test]
fn dotted_designator_is_one_call_name() {
    let src = "program P; begin Console.Write(1); end";
    let (program, diag) = parse(src);
    assert_eq!(diag.error_count(), 0);
    let body = main_block(&program);
    let StmtKind::Call(e) = &program.stmts[body[0]].kind else {
        panic!("expected a call statement");
    };
    let ExprKind::Call { name, args, .. } = &program.exprs[*e].kind else {
        panic!("expected a call expression");
    };
    assert_eq!(name.as_str(), "Console.Write");
    assert_eq!(args.len(), 1);
}

#[test]
fn indexer_takes_comma_separated_indices() {
    let (program, diag) = parse("program P; var int[2,3] a; begin x = a[1, 2]; end");
    assert_eq!(diag.error_count(), 0);
    let body = main_block(&program);
    let StmtKind::Assign { rhs, .. } = &program.stmts[body[0]].kind else {
        panic!("expected an assignment");
    };
    let ExprKind::Index { indices, .. } = &program.exprs[*rhs].kind else {
        panic!("expected an indexer");
    };
    assert_eq!(indices.len(), 2);
}

#[test]
fn declarations_build_functions_and_scopes() {
    let src = "program P; \
               var int g; \
               function add(int a, int b) : int \
               var int t; \
               begin return a + b; end \
               begin g = add(1, 2); end";
    let (program, diag) = parse(src);
    assert_eq!(diag.error_count(), 0);
    // the user function plus the synthetic Main
    assert_eq!(program.funcs.iter().count(), 2);
    let (_, add) = program
        .funcs
        .iter()
        .find(|(_, f)| f.name == "add")
        .expect("function 'add' missing");
    assert_eq!(add.params.len(), 2);
    assert_eq!(program.scopes.locals_of(add.scope).len(), 1);
}

#[test]
fn var_rows_continue_without_the_keyword() {
    let src = "program P; var int a, b; double c; string s; begin end";
    let (program, diag) = parse(src);
    assert_eq!(diag.error_count(), 0);
    assert_eq!(program.vars.iter().count(), 4);
}

#[test]
fn control_flow_forms_parse() {
    let src = "program P; var int i; bool b; begin \
               if (b) i = 1; else i = 2; \
               while (b) i = 3; \
               do i = 4; while (b) \
               for i = 1 to 10 do i = 5; \
               for i = 10 downto 1 do begin i = 6; end \
               end";
    let (program, diag) = parse(src);
    assert_eq!(diag.error_count(), 0);
    assert_eq!(main_block(&program).len(), 5);
}

#[test]
fn duplicate_declaration_is_reported() {
    let (_, diag) = parse("program P; var int x; int x; begin end");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.messages()[0].contains("already declared"));
}

#[test]
fn missing_semicolon_recovers() {
    let (program, diag) = parse("program P; var int x; begin x = 1 x = 2; end");
    assert!(diag.error_count() >= 1);
    // parsing carried on past the error
    assert!(main_block(&program).len() >= 1);
}

#[test]
fn error_reports_are_suppressed_within_distance() {
    // both errors sit on adjacent tokens; only the first is reported
    let (_, diag) = parse("program P; begin x = ; ; end");
    assert_eq!(diag.error_count(), 1);
}

#[test]
fn null_has_no_production() {
    let (_, diag) = parse("program P; begin x = null; end");
    assert!(diag.error_count() >= 1);
}

#[test]
fn pretty_print_round_trips() {
    let src = "program P; \
               var int g; double d; \
               function f(int a) : int \
               var int t; \
               begin \
               t = a * 2 + g; \
               if (t > 3) return t; else return -t; \
               end \
               begin \
               g = 1; \
               d = 2.5; \
               for g = 1 to 3 do g = g + f(g); \
               while (g < 10 and g != 7) g = g + 1; \
               do g = g - 1; while (g > 0) \
               end";
    let (program, diag) = parse(src);
    assert_eq!(diag.error_count(), 0);
    let printed = ast::pretty(&program);
    let (reparsed, diag2) = parse(&printed);
    assert_eq!(diag2.error_count(), 0, "printed source failed to parse:\n{printed}");
    assert_eq!(ast::pretty(&reparsed), printed);
}
