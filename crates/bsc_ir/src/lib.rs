mod block;
mod builder;
mod code_block;
mod generator;
mod opcode;
mod stmt;
mod value;

pub use block::{BasicBlock, BlockId};
pub use builder::IrBuilder;
pub use code_block::{ExceptInfo, IrCodeBlock};
pub use generator::{generate, IrGenerator};
pub use opcode::{BinaryOpKind, MakeKind, TestKind, UnaryOpKind};
pub use stmt::{
    AssertOp, BinaryOp, BranchOp, CallOp, ConditionalBranchOp, DeclareSymbolOp, DefinedOp, ExportOp, GetMemberOp, GetSubscriptOp, ImportOp, InplaceOp, InvokeOp, IrStmt, JumpTableOp, LoadConstOp,
    LoadSymbolOp, MakeClosureOp, MakeOp, MemberName, RaiseOp, ReturnOp, SelectOp, SetMemberOp, SetSubscriptOp, StoreSymbolOp, TestOp, UnaryOp,
};
pub use value::{IrValue, Value, IR_INVALID_VALUE};

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_errors::Handler;
    use bsc_lexer::SourceText;

    fn generate_str(src: &str) -> Vec<IrCodeBlock> {
        let source = SourceText::new("test", src.as_bytes(), SourceText::DEFAULT_TABSIZE);
        let handler = Handler::new(false);
        let script = bsc_parser::parse(source, &handler);
        let symbols = bsc_sema::analyze(&script, &handler);
        assert!(!handler.has_errors(), "unexpected analysis errors: {:?}", handler.diagnostics());
        generate(&script, &symbols)
    }

    /// Functions/methods are filed under a mangled name of the form
    /// `name$argc`; nested bodies are pushed to the output list as they are
    /// encountered walking the script, ahead of the top-level `<script>`
    /// block itself, so tests look a compiled body up by name rather than
    /// assuming a fixed position.
    fn find_fn<'a>(code: &'a [IrCodeBlock], simple_name: &str) -> &'a IrCodeBlock {
        code.iter()
            .find(|c| c.name == simple_name || c.name.starts_with(&format!("{}$", simple_name)))
            .unwrap_or_else(|| panic!("no compiled body named `{}` among {:?}", simple_name, code.iter().map(|c| &c.name).collect::<Vec<_>>()))
    }

    #[test]
    fn compiles_top_level_script_into_one_block() {
        let code = generate_str("var x = 1\nvar y = x + 2\n");
        assert_eq!(code.len(), 1);
        let script = &code[0];
        assert!(matches!(script.blocks.last().unwrap().terminal(), Some(IrStmt::Return(_))));
    }

    #[test]
    fn compiles_a_free_function_into_its_own_block() {
        let code = generate_str("def add(a, b) {\n  return a + b\n}\n");
        assert_eq!(code.len(), 2);
        let func = find_fn(&code, "add");
        assert_eq!(func.args.len(), 2);
        let entry = func.block(BlockId(0));
        assert!(entry.stmts.iter().any(|s| matches!(s, IrStmt::Binary(_))));
        assert!(matches!(entry.terminal(), Some(IrStmt::Return(_))));
    }

    #[test]
    fn if_without_else_merges_back_into_one_successor() {
        let code = generate_str("def f(a) {\n  if (a) {\n    return 1\n  }\n  return 2\n}\n");
        let func = find_fn(&code, "f");
        assert!(func.blocks.len() >= 3);
        for block in &func.blocks {
            assert!(block.terminal().is_some());
        }
    }

    #[test]
    fn while_loop_produces_a_header_that_merges_predecessors() {
        let code = generate_str("def f(a) {\n  var i = 0\n  while (i < a) {\n    i += 1\n  }\n  return i\n}\n");
        let func = find_fn(&code, "f");
        let has_select = func.blocks.iter().any(|b| b.stmts.iter().any(|s| matches!(s, IrStmt::Select(_))));
        assert!(has_select, "expected the loop header to carry a phi for `i`");
    }

    #[test]
    fn for_in_desugars_to_has_next_and_next_invokes() {
        let code = generate_str("def f(xs) {\n  for x in xs {\n    var y = x\n  }\n  return none\n}\n");
        let func = find_fn(&code, "f");
        let members: Vec<&str> = func
            .blocks
            .iter()
            .flat_map(|b| &b.stmts)
            .filter_map(|s| match s {
                IrStmt::Invoke(o) => Some(o.member.as_str()),
                _ => None,
            })
            .collect();
        assert!(members.contains(&"HasNext"));
        assert!(members.contains(&"Next"));
    }

    #[test]
    fn try_except_records_one_handler_range() {
        let code = generate_str("class Error {}\ndef f() {\n  try {\n    return 1\n  } except Error as e {\n    return 2\n  }\n}\n");
        let func = find_fn(&code, "f");
        assert_eq!(func.handlers.len(), 1);
        assert_eq!(func.handlers[0].handlers.len(), 1);
    }

    #[test]
    fn class_with_no_init_gets_a_synthesized_one() {
        let code = generate_str("class C {\n  def greet() {\n    return 1\n  }\n}\n");
        assert!(code.iter().any(|c| c.name.contains("<init>")));
        assert!(code.iter().any(|c| c.name.contains("greet")));
    }

    #[test]
    fn string_interpolation_desugars_to_a_format_invoke() {
        let code = generate_str("def f(name) {\n  return \"hello $name\"\n}\n");
        let func = find_fn(&code, "f");
        let has_format = func.blocks.iter().flat_map(|b| &b.stmts).any(|s| matches!(s, IrStmt::Invoke(o) if o.member == "Format"));
        assert!(has_format);
    }

    #[test]
    fn match_arm_falls_through_on_pass() {
        let code = generate_str("def f(x) {\n  match (x) {\n    case 1:\n      pass\n    case 2:\n      return 2\n    default:\n      return 0\n  }\n  return 9\n}\n");
        let func = find_fn(&code, "f");
        assert!(func.blocks.iter().any(|b| matches!(b.terminal(), Some(IrStmt::JumpTable(_)))));
    }
}
