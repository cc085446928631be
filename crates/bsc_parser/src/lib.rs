mod cursor;
mod decl;
mod expr;
mod parser;
mod recovery;
mod stmt;

pub use parser::Parser;
pub use recovery::BraceStop;

use bsc_ast::ScriptDecl;
use bsc_errors::Handler;
use bsc_lexer::SourceText;

/// Parse a whole script and return its AST root. All diagnostics raised
/// along the way land in `handler`; parsing never aborts early (§4.3/§7).
pub fn parse(source: SourceText, handler: &Handler) -> ScriptDecl {
    Parser::new(source, handler).parse_script()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_ast::{Decl, Expr, Item, Stmt};
    use bsc_errors::Handler;
    use bsc_lexer::SourceText;

    fn parse_str(src: &str) -> (ScriptDecl, Handler) {
        let handler = Handler::new(false);
        let source = SourceText::new("test", src.as_bytes(), SourceText::DEFAULT_TABSIZE);
        let script = Parser::new(source, &handler).parse_script();
        (script, handler)
    }

    #[test]
    fn parses_var_declaration() {
        let (script, handler) = parse_str("var x = 1 + 2\n");
        assert!(!handler.has_errors());
        assert_eq!(script.body.len(), 1);
        match &script.body[0] {
            Item::Decl(Decl::Var(v)) => {
                assert_eq!(v.name.as_str(), "x");
                assert!(v.initializer.is_some());
            }
            other => panic!("expected a var decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_with_return() {
        let (script, handler) = parse_str("def f(a, b) {\n  return a + b\n}\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Decl(Decl::Function(f)) => {
                assert_eq!(f.name.as_str(), "f");
                assert_eq!(f.params.argc(), 2);
            }
            other => panic!("expected a function decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_if_else_chain() {
        let (script, handler) = parse_str("if x { pass } else if y { pass } else { pass }\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Stmt(Stmt::If(s)) => {
                assert!(s.else_body.is_some());
            }
            other => panic!("expected an if statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_while_with_break_continue() {
        let (script, handler) = parse_str("while true {\n  break if x\n  continue\n}\n");
        assert!(!handler.has_errors());
        assert!(matches!(&script.body[0], Item::Stmt(Stmt::While(_))));
    }

    #[test]
    fn parses_match_with_default() {
        let (script, handler) = parse_str("match x {\n  case 1:\n    pass\n  default:\n    pass\n}\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Stmt(Stmt::Match(m)) => assert_eq!(m.arms.len(), 2),
            other => panic!("expected a match statement, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_default_label_is_an_error() {
        let (_, handler) = parse_str("match x {\n  default:\n    pass\n  default:\n    pass\n}\n");
        assert!(handler.has_errors());
    }

    #[test]
    fn parses_try_except_finally() {
        let (script, handler) = parse_str("try {\n  pass\n} except Error as e {\n  pass\n} finally {\n  pass\n}\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Stmt(Stmt::Try(t)) => assert_eq!(t.handlers.len(), 2),
            other => panic!("expected a try statement, got {:?}", other),
        }
    }

    #[test]
    fn try_without_handler_is_an_error() {
        let (_, handler) = parse_str("try {\n  pass\n}\n");
        assert!(handler.has_errors());
    }

    #[test]
    fn parses_class_with_init_and_method() {
        let (script, handler) = parse_str("class Point extends Shape {\n  const x = 0\n  init(x) {\n    self.x = x\n  }\n  def length() {\n    return x\n  }\n}\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Decl(Decl::Class(c)) => {
                assert_eq!(c.name.as_str(), "Point");
                assert_eq!(c.members.len(), 3);
            }
            other => panic!("expected a class decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_task_with_inputs_outputs_and_action() {
        let (script, handler) = parse_str("task Build dependsOn Compile {\n  inputs \"src/**\"\n  outputs \"build/**\"\n  doLast {\n    pass\n  }\n}\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Decl(Decl::Task(t)) => {
                assert_eq!(t.name.as_str(), "Build");
                assert_eq!(t.dependencies.len(), 1);
                assert_eq!(t.members.len(), 3);
            }
            other => panic!("expected a task decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_closure_expression() {
        let (script, handler) = parse_str("var f = (a, b) => a + b\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Decl(Decl::Var(v)) => match v.initializer.as_deref() {
                Some(Expr::Closure(c)) => assert_eq!(c.params.argc(), 2),
                other => panic!("expected a closure initializer, got {:?}", other),
            },
            other => panic!("expected a var decl, got {:?}", other),
        }
    }

    #[test]
    fn parses_string_interpolation() {
        let (script, handler) = parse_str("var s = \"hello $name\"\n");
        assert!(!handler.has_errors());
        match &script.body[0] {
            Item::Decl(Decl::Var(v)) => match v.initializer.as_deref() {
                Some(Expr::Literal(l)) => assert!(matches!(&l.value, bsc_ast::Literal::Interpolated { .. })),
                other => panic!("expected an interpolated literal, got {:?}", other),
            },
            other => panic!("expected a var decl, got {:?}", other),
        }
    }

    #[test]
    fn missing_closing_brace_is_recoverable() {
        let (script, handler) = parse_str("def f() {\n  return 1\n");
        assert!(handler.has_errors());
        assert_eq!(script.body.len(), 1);
    }

    #[test]
    fn unexpected_token_recovers_to_next_statement() {
        let (script, handler) = parse_str("var x = )\nvar y = 2\n");
        assert!(handler.has_errors());
        assert!(script.body.len() >= 1);
    }
}
