//! One test per concrete end-to-end scenario, asserting on the shape of the
//! produced bytecode/IR rather than on execution (the object model and a
//! runtime are out of scope for this crate).

use bsc::{compile_script, CompileOptions, CompiledFunction};
use bsc_bytecode::OpCode;

fn find<'a>(functions: &'a [CompiledFunction], simple_name: &str) -> &'a CompiledFunction {
    functions
        .iter()
        .find(|f| f.name == simple_name || f.name.starts_with(&format!("{}$", simple_name)))
        .unwrap_or_else(|| panic!("no compiled body named `{}` among {:?}", simple_name, functions.iter().map(|f| &f.name).collect::<Vec<_>>()))
}

#[test]
fn scenario_1_top_level_arithmetic_declares_a_global() {
    let result = compile_script("s1", b"var x = 1 + 2\n", &CompileOptions::default());
    assert!(!result.has_errors());
    assert_eq!(result.functions.len(), 1);
    let script = &result.functions[0];
    assert_eq!(script.consts.len(), 2);
    assert!(script.code.contains(&OpCode::LoadConst.byte()));
    assert!(script.code.contains(&OpCode::Add.byte()));
    assert!(script.code.contains(&OpCode::DeclareSymbol.byte()));
    assert_eq!(*script.code.last().unwrap(), OpCode::Return.byte());
}

#[test]
fn scenario_2_two_parameter_function_returns_their_sum() {
    let result = compile_script("s2", b"def f(a, b) {\n  return a + b\n}\n", &CompileOptions::default());
    assert!(!result.has_errors());
    let f = find(&result.functions, "f");
    assert_eq!(f.argc, 2);
    assert!(!f.vararg);
    assert!(f.code.contains(&OpCode::Add.byte()));
    assert_eq!(*f.code.last().unwrap(), OpCode::Return.byte());
}

#[test]
fn scenario_3_if_else_merge_materializes_a_select() {
    let src = b"def f(cond, x) {\n  if (cond) {\n    x = 1\n  } else {\n    x = 2\n  }\n  return x\n}\n";
    let result = compile_script("s3", src, &CompileOptions::default());
    assert!(!result.has_errors());
    let f = find(&result.functions, "f");
    assert!(f.code.contains(&OpCode::BrCond.byte()));
    assert!(f.code.contains(&OpCode::Select.byte()));
}

#[test]
fn scenario_4_while_with_break_and_continue_produces_a_four_block_shape() {
    let src = b"def f(c, done) {\n  while (c) {\n    if (done) {\n      break\n    }\n    continue\n  }\n  return 0\n}\n";
    let result = compile_script("s4", src, &CompileOptions::default());
    assert!(!result.has_errors());
    let f = find(&result.functions, "f");
    assert!(f.code.contains(&OpCode::Br.byte()));
    assert!(f.code.contains(&OpCode::BrCond.byte()));

    let orphan_break = compile_script("s4b", b"break\n", &CompileOptions::default());
    assert!(orphan_break.has_errors());
}

#[test]
fn scenario_5_match_emits_a_jump_table_with_fallthrough() {
    let src = b"def f(x) {\n  match (x) {\n    case 1:\n      pass\n    case 2:\n      break\n    default:\n      pass\n  }\n  return 9\n}\n";
    let result = compile_script("s5", src, &CompileOptions::default());
    assert!(!result.has_errors(), "`break` inside a match arm exits the match, not an error: {:?}", result.diagnostics);
    let f = find(&result.functions, "f");
    assert!(f.code.contains(&OpCode::JumpTable.byte()));
}

#[test]
fn scenario_6_derived_class_init_synthesizes_a_super_call() {
    let src = b"class B {}\nclass C extends B {\n  init() {\n    foo()\n  }\n  def foo() {\n    return 1\n  }\n}\n";
    let result = compile_script("s6", src, &CompileOptions::default());
    assert!(!result.has_errors());
    let init = result.functions.iter().find(|f| f.name.contains("<init>")).expect("a synthesized init body");
    assert!(init.code.contains(&OpCode::Invoke.byte()));
}
