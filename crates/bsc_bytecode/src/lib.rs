//! Bytecode serialization (§4.6): linearizes a finalized `bsc_ir::IrCodeBlock`
//! into a flat byte buffer with label resolution, a line-info table, and
//! exception-handler ranges. Modeled on the teacher's codegen-emission
//! crates: a `Writer` that appends opcodes as it walks the already-built
//! IR and patches forward references once the whole function is laid out,
//! rather than building an intermediate instruction list first.

mod label;
mod module;
mod opcode;
mod pool;
mod registers;
mod writer;

pub use label::{Label, LabelRef};
pub use module::{emit_function, CompiledFunction, EncodedExceptInfo};
pub use opcode::{OpCode, TestKindByte};
pub use registers::NO_REGISTER;
pub use writer::{BytecodeWriter, CompiledCode};

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_errors::Handler;
    use bsc_ir::{generate, IrStmt};
    use bsc_lexer::SourceText;

    fn compile(src: &str) -> (Vec<bsc_ir::IrCodeBlock>, bsc_sema::SymbolTable) {
        let source = SourceText::new("test", src.as_bytes(), SourceText::DEFAULT_TABSIZE);
        let handler = Handler::new(false);
        let script = bsc_parser::parse(source, &handler);
        let symbols = bsc_sema::analyze(&script, &handler);
        assert!(!handler.has_errors(), "unexpected analysis errors: {:?}", handler.diagnostics());
        (generate(&script, &symbols), symbols)
    }

    #[test]
    fn emits_load_const_add_and_return_for_top_level_script() {
        let (code, symbols) = compile("var x = 1 + 2\n");
        let handler = Handler::new(false);
        let f = emit_function(&code[0], &symbols, &handler);
        assert!(!handler.has_errors());
        assert!(!f.code.is_empty());
        assert_eq!(f.consts.len(), 2);
        assert!(matches!(f.consts[0], bsc_ir::Value::Integer(1)));
        assert!(matches!(f.consts[1], bsc_ir::Value::Integer(2)));
        // LoadConst, LoadConst, Add, DeclareSymbol, Return
        assert_eq!(f.code[0], OpCode::LoadConst.byte());
    }

    #[test]
    fn function_body_ends_with_a_return_opcode() {
        let (code, symbols) = compile("def f(a, b) {\n  return a + b\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        assert_eq!(*f.code.last().unwrap(), OpCode::Return.byte());
    }

    #[test]
    fn if_else_patches_both_branch_targets() {
        let (code, symbols) = compile("def f(cond) {\n  if (cond) {\n    var x = 1\n  } else {\n    var x = 2\n  }\n  return 0\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        assert!(f.code.contains(&OpCode::BrCond.byte()));
    }

    #[test]
    fn try_except_produces_one_byte_range_handler() {
        let (code, symbols) = compile("class Error {}\ndef f() {\n  try {\n    return 1\n  } except Error as e {\n    return 2\n  }\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        assert_eq!(f.handlers.len(), 1);
        assert!(f.handlers[0].begin <= f.handlers[0].end);
        assert_eq!(f.handlers[0].handlers.len(), 1);
        assert!(f.handlers[0].handlers[0].1.is_some());
    }

    #[test]
    fn match_statement_emits_a_jump_table() {
        let (code, symbols) = compile("def f(x) {\n  match (x) {\n    case 1:\n      return 1\n    default:\n      return 0\n  }\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        assert!(f.code.contains(&OpCode::JumpTable.byte()));
    }

    #[test]
    fn line_table_omits_synthesized_select_positions() {
        let (code, symbols) = compile("def f(a) {\n  var i = 0\n  while (i < a) {\n    i += 1\n  }\n  return i\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let has_select = func.blocks.iter().flat_map(|b| &b.stmts).any(|s| matches!(s, IrStmt::Select(_)));
        assert!(has_select, "expected the loop header to carry a phi for `i`");
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        // every recorded line entry must have a non-zero line (synthetic
        // positions, e.g. the phi's, are never appended per §4.6).
        assert!(f.line_info.iter().all(|(_, line, _)| *line != 0));
    }

    #[test]
    fn no_forward_reference_remains_unpatched() {
        let (code, symbols) = compile("def f(a) {\n  while (a) {\n    if (a) {\n      break\n    }\n    continue\n  }\n  return 0\n}\n");
        let handler = Handler::new(false);
        let func = code.iter().find(|c| c.name.starts_with("f$")).unwrap();
        let f = emit_function(func, &symbols, &handler);
        assert!(!handler.has_errors());
        assert!(!f.code.is_empty());
    }
}
