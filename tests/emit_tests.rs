use v_compiler::ast::Program;
use v_compiler::backend::emit_program;
use v_compiler::backend::il::{ArraySig, Assembler, Callee, FieldHandle, FieldRef, Inst, Label, MethodHandle};
use v_compiler::backend::image::{Code, ImageAssembler, IMAGE_MAGIC};
use v_compiler::diag::DiagSink;
use v_compiler::driver::analyze_source;
use v_compiler::reflect::Registry;
use v_compiler::types::Primitive;

fn compile(src: &str) -> (Program, ImageAssembler) {
    let mut diag = DiagSink::new();
    let provider = Registry::standard();
    let program = analyze_source(src, &[], &provider, &mut diag)
        .expect("fatal scan error")
        .unwrap_or_else(|| panic!("compile errors: {:?}", diag.messages()));
    let mut asm = ImageAssembler::new();
    emit_program(&program, &mut asm);
    (program, asm)
}

fn method_handle(asm: &ImageAssembler, name: &str) -> MethodHandle {
    let idx = asm
        .method_names()
        .iter()
        .position(|n| *n == name)
        .unwrap_or_else(|| panic!("method {name} not declared"));
    MethodHandle(idx as u32)
}

fn main_code(asm: &ImageAssembler) -> Vec<Code> {
    asm.code_of(method_handle(asm, "Main")).to_vec()
}

#[test]
fn minimal_program_is_a_single_ret() {
    let (_, asm) = compile("program P; begin end");
    assert_eq!(main_code(&asm), vec![Code::Inst(Inst::Ret)]);
}

#[test]
fn for_loop_lowers_to_the_canonical_shape() {
    let (_, asm) = compile("program P; var int i; begin for i = 1 to 3 do i = i; end");
    let i = FieldRef::Static(FieldHandle(0));
    let top = Label(0);
    let done = Label(1);
    assert_eq!(
        main_code(&asm),
        vec![
            // initial assignment
            Code::Inst(Inst::LdcI4(1)),
            Code::Inst(Inst::Stsfld(i.clone())),
            // loop header: overshoot exits
            Code::Mark(top),
            Code::Inst(Inst::Ldsfld(i.clone())),
            Code::Inst(Inst::LdcI4(3)),
            Code::Inst(Inst::Bgt(done)),
            // body: i = i
            Code::Inst(Inst::Ldsfld(i.clone())),
            Code::Inst(Inst::Stsfld(i.clone())),
            // step and loop back
            Code::Inst(Inst::Ldsfld(i.clone())),
            Code::Inst(Inst::LdcI4(1)),
            Code::Inst(Inst::Add),
            Code::Inst(Inst::Stsfld(i)),
            Code::Inst(Inst::Br(top)),
            Code::Mark(done),
            Code::Inst(Inst::Ret),
        ]
    );
}

#[test]
fn downto_loops_exit_on_blt_and_step_down() {
    let (_, asm) = compile("program P; var int i; begin for i = 3 downto 1 do i = i; end");
    let code = main_code(&asm);
    assert!(code.contains(&Code::Inst(Inst::Blt(Label(1)))));
    assert!(code.contains(&Code::Inst(Inst::Sub)));
}

#[test]
fn short_circuit_and_pushes_the_skipped_value() {
    let (_, asm) = compile("program P; var bool a, b, c; begin c = a and b; end");
    let a = FieldRef::Static(FieldHandle(0));
    let b = FieldRef::Static(FieldHandle(1));
    let c = FieldRef::Static(FieldHandle(2));
    assert_eq!(
        main_code(&asm),
        vec![
            Code::Inst(Inst::Ldsfld(a)),
            Code::Inst(Inst::Brfalse(Label(0))),
            Code::Inst(Inst::Ldsfld(b)),
            Code::Inst(Inst::Br(Label(1))),
            Code::Mark(Label(0)),
            Code::Inst(Inst::LdcI4(0)),
            Code::Mark(Label(1)),
            Code::Inst(Inst::Stsfld(c)),
            Code::Inst(Inst::Ret),
        ]
    );
}

#[test]
fn xor_lowers_to_the_bitwise_opcode() {
    let (_, asm) = compile("program P; var bool a, b, c; begin c = a xor b; end");
    assert!(main_code(&asm).contains(&Code::Inst(Inst::Xor)));
}

#[test]
fn negated_comparisons_compare_with_zero() {
    let (_, asm) = compile("program P; var int a, b; bool c; begin c = a != b; end");
    let code = main_code(&asm);
    let tail: Vec<Code> = code[2..5].to_vec();
    assert_eq!(
        tail,
        vec![
            Code::Inst(Inst::Ceq),
            Code::Inst(Inst::LdcI4(0)),
            Code::Inst(Inst::Ceq),
        ]
    );
}

#[test]
fn logical_not_compares_with_zero() {
    let (_, asm) = compile("program P; var bool a, c; begin c = !a; end");
    let code = main_code(&asm);
    assert_eq!(
        code[1..3].to_vec(),
        vec![Code::Inst(Inst::LdcI4(0)), Code::Inst(Inst::Ceq)]
    );
}

#[test]
fn string_plus_calls_the_concat_helper() {
    let (_, asm) = compile(
        r#"program P; var string s, t; begin s = "a" + t; end"#,
    );
    assert!(main_code(&asm).contains(&Code::Inst(Inst::Call(Callee::StringConcat))));
}

#[test]
fn discarded_call_value_is_popped() {
    let src = "program P; function f() : int begin return 1; end begin f(); end";
    let (_, asm) = compile(src);
    let f = method_handle(&asm, "f");
    assert_eq!(
        main_code(&asm),
        vec![
            Code::Inst(Inst::Call(Callee::Method(f))),
            Code::Inst(Inst::Pop),
            Code::Inst(Inst::Ret),
        ]
    );
}

#[test]
fn void_calls_do_not_pop() {
    let (_, asm) = compile("program P; begin Console.WriteLine(); end");
    assert!(!main_code(&asm).contains(&Code::Inst(Inst::Pop)));
}

#[test]
fn runtime_widening_uses_a_conversion() {
    let src = "program P; var int i; double d; begin d = i + 0.5; end";
    let (_, asm) = compile(src);
    assert!(main_code(&asm).contains(&Code::Inst(Inst::ConvR8)));
}

#[test]
fn array_locals_get_an_instantiation_prologue() {
    let src = "program P; \
               function f() : int var int[2,3] a; begin return a[0, 0]; end \
               begin end";
    let (_, asm) = compile(src);
    let f = asm.code_of(method_handle(&asm, "f")).to_vec();
    let sig = ArraySig {
        elem: Primitive::Int,
        rank: 2,
    };
    assert_eq!(
        f[0..4].to_vec(),
        vec![
            Code::Inst(Inst::LdcI4(2)),
            Code::Inst(Inst::LdcI4(3)),
            Code::Inst(Inst::Newobj(sig)),
            Code::Inst(Inst::Stloc(0)),
        ]
    );
    assert!(f.contains(&Code::Inst(Inst::Call(Callee::ArrayGet(sig)))));
}

#[test]
fn array_globals_get_a_static_initializer() {
    let (_, asm) = compile("program P; var int[4] a; begin a[1] = 2; end");
    let init = asm.code_of(method_handle(&asm, ".init")).to_vec();
    let sig = ArraySig {
        elem: Primitive::Int,
        rank: 1,
    };
    assert_eq!(
        init,
        vec![
            Code::Inst(Inst::LdcI4(4)),
            Code::Inst(Inst::Newobj(sig)),
            Code::Inst(Inst::Stsfld(FieldRef::Static(FieldHandle(0)))),
            Code::Inst(Inst::Ret),
        ]
    );
    // indexed write goes through the array's Set
    assert!(main_code(&asm).contains(&Code::Inst(Inst::Call(Callee::ArraySet(sig)))));
}

#[test]
fn parameters_load_and_store_through_arg_slots() {
    let src = "program P; \
               function f(int a) : int begin a = a + 1; return a; end \
               begin end";
    let (_, asm) = compile(src);
    let f = asm.code_of(method_handle(&asm, "f")).to_vec();
    assert!(f.contains(&Code::Inst(Inst::Ldarg(0))));
    assert!(f.contains(&Code::Inst(Inst::Starg(0))));
}

#[test]
fn image_has_magic_and_listing_has_entrypoint() {
    let (_, mut asm) = compile("program P; begin end");
    let listing = asm.listing();
    assert!(listing.contains(".assembly P"));
    assert!(listing.contains(".entrypoint"));
    let bytes = asm.finish();
    assert_eq!(&bytes[0..4], IMAGE_MAGIC);
}
