mod analyzer;
mod scope;
mod symbol;

pub use analyzer::SemanticAnalyzer;
pub use scope::{BreakContinueCheck, DeclFrame, DeclScopeKind, LocalFrame, LocalScopeKind, MethodScopeKind, ReturnFlag, ScopeStack};
pub use symbol::{
    mangle, mangle_member, AccessFlag, ClassSymbol, ClosureSymbol, FieldSymbol, FunctionSymbol, MethodSymbol, PropertySymbol, Symbol, SymbolKind, SymbolTable, TaskSymbol, VariableKind,
    VariableSymbol,
};

use bsc_ast::ScriptDecl;
use bsc_errors::Handler;

/// Walks `script`, reporting every diagnostic §4.4 defines through `handler`
/// and returning the symbol table built along the way -- callers should
/// check `handler.has_errors()` before handing the result to the IR
/// generator (§7's "never run IR generation over a failed analysis").
pub fn analyze(script: &ScriptDecl, handler: &Handler) -> SymbolTable {
    SemanticAnalyzer::new(handler).analyze(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_errors::Handler;
    use bsc_lexer::SourceText;

    fn analyze_str(src: &str) -> (SymbolTable, Handler) {
        let source = SourceText::new("test", src.as_bytes(), SourceText::DEFAULT_TABSIZE);
        let handler = Handler::new(false);
        let script = bsc_parser::parse(source, &handler);
        let symbols = analyze(&script, &handler);
        (symbols, handler)
    }

    #[test]
    fn declares_global_and_local_variables() {
        let (symbols, handler) = analyze_str("var x = 1\ndef f() { var y = x }");
        assert!(!handler.has_errors());
        assert!(symbols.len() >= 3);
    }

    #[test]
    fn reports_redefinition() {
        let (_, handler) = analyze_str("var x = 1\nvar x = 2");
        assert!(handler.has_errors());
    }

    #[test]
    fn reports_used_before_declared() {
        let (_, handler) = analyze_str("def f() { return y }");
        assert!(handler.has_errors());
    }

    #[test]
    fn reports_duplicate_case_label() {
        let (_, handler) = analyze_str("var x = 1\nmatch (x) { case 1: pass case 1: pass }");
        assert!(handler.has_errors());
    }

    #[test]
    fn reports_invalid_case_value() {
        let (_, handler) = analyze_str("def f(y) { match (y) { case y: pass } }");
        assert!(handler.has_errors());
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let (_, handler) = analyze_str("break");
        assert!(handler.has_errors());
    }

    #[test]
    fn break_inside_loop_is_ok() {
        let (_, handler) = analyze_str("while (true) { break }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let (_, handler) = analyze_str("return 1");
        assert!(handler.has_errors());
    }

    #[test]
    fn closure_captures_outer_local() {
        let (_, handler) = analyze_str("def f() { var x = 1\nvar g = () => x\n}");
        assert!(!handler.has_errors());
    }

    #[test]
    fn closure_cannot_assign_captured_local() {
        let (_, handler) = analyze_str("def f() { var x = 1\nvar g = () => { x = 2 }\n}");
        assert!(handler.has_errors());
    }

    #[test]
    fn class_with_getter_and_setter_unify() {
        let (symbols, handler) = analyze_str("class C { get p { return 1 } set p(v) { pass } }");
        assert!(!handler.has_errors());
        let has_property = (0..symbols.len()).any(|i| matches!(symbols.get(bsc_ast::SymbolId(i as u32)).kind, SymbolKind::Property(_)));
        assert!(has_property);
    }

    #[test]
    fn initializer_call_must_be_first_statement() {
        let (_, handler) = analyze_str("class C { init() { var x = 1\nself() } }");
        assert!(handler.has_errors());
    }

    #[test]
    fn task_with_duplicate_inputs_is_an_error() {
        let (_, handler) = analyze_str("task T { inputs [] outputs [] inputs [] }");
        assert!(handler.has_errors());
    }

    #[test]
    fn task_reserved_property_name_is_an_error() {
        let (_, handler) = analyze_str("task T { action = 1 }");
        assert!(handler.has_errors());
    }

    #[test]
    fn operator_method_requires_exactly_one_parameter() {
        let (_, handler) = analyze_str("class C { def operator add(a, b) { return a } }");
        assert!(handler.has_errors());
    }
}
