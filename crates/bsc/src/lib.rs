//! Wires the CORE pipeline's four subsystems into one entry point, the way
//! the teacher's `libsyntax::parse::parse_crate_from_source_str` or
//! `librustc_interface::passes::parse` sits in front of the lexer/parser/
//! resolve/MIR-build stages: `compile_script` owns nothing those crates
//! don't already expose, it just runs them in order and collects the
//! result.

use bsc_ast::ScriptDecl;
use bsc_errors::{Diagnostic, Handler, Level};
use bsc_lexer::{Encoding, SourceText};

pub use bsc_bytecode::CompiledFunction;

/// The compile session threaded by reference through every stage (§10.2),
/// mirroring the teacher's `ParseSess`/`Session`: constructed once by the
/// caller, never cloned.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub tabsize: u32,
    /// `None` means auto-sniff a BOM and otherwise assume UTF-8, the same
    /// default `SourceText::new` applies.
    pub encoding: Option<Encoding>,
    pub warnings_as_errors: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { tabsize: SourceText::DEFAULT_TABSIZE, encoding: None, warnings_as_errors: false }
    }
}

/// Everything `compile_script` produces: one `CompiledFunction` per
/// function/method/closure body plus the top-level script body itself (in
/// `bsc_ir::generate`'s own emission order, see its `find_fn` test helper),
/// and every diagnostic raised along the way.
#[derive(Debug)]
pub struct CompileResult {
    pub functions: Vec<CompiledFunction>,
    pub diagnostics: Vec<(Level, Diagnostic)>,
}

impl CompileResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(level, _)| *level == Level::Error)
    }
}

/// Runs the whole pipeline over `bytes` (named `name` for diagnostics) and
/// returns every compiled body plus every diagnostic raised. Per §7, IR
/// generation and bytecode emission still run even when earlier stages
/// reported errors -- recovery nodes keep every stage total -- so callers
/// who need a strict "stop on first error" policy should check
/// `CompileResult::has_errors()` themselves before trusting the bytecode.
pub fn compile_script(name: &str, bytes: &[u8], options: &CompileOptions) -> CompileResult {
    let handler = Handler::new(options.warnings_as_errors);

    let source = match options.encoding {
        Some(encoding) => {
            let (_, bom_len) = Encoding::sniff(bytes);
            SourceText::with_encoding(name, bytes, encoding, bom_len, options.tabsize)
        }
        None => SourceText::new(name, bytes, options.tabsize),
    };

    log::trace!("compile_script: lexing/parsing {}", name);
    let script: ScriptDecl = bsc_parser::parse(source, &handler);

    log::trace!("compile_script: analyzing {}", name);
    let symbols = bsc_sema::analyze(&script, &handler);

    log::trace!("compile_script: generating IR for {}", name);
    let code_blocks = bsc_ir::generate(&script, &symbols);

    log::trace!("compile_script: emitting bytecode for {} ({} bodies)", name, code_blocks.len());
    let functions = code_blocks.iter().map(|block| bsc_bytecode::emit_function(block, &symbols, &handler)).collect();

    CompileResult { functions, diagnostics: handler.into_diagnostics() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_script_without_errors() {
        let result = compile_script("t", b"var x = 1 + 2\n", &CompileOptions::default());
        assert!(!result.has_errors());
        assert_eq!(result.functions.len(), 1);
    }

    #[test]
    fn reports_semantic_errors_but_still_returns_bodies() {
        let result = compile_script("t", b"var x = 1\nvar x = 2\n", &CompileOptions::default());
        assert!(result.has_errors());
        assert!(!result.functions.is_empty());
    }

    #[test]
    fn warnings_as_errors_is_threaded_through() {
        let lenient = compile_script("t", b"var var x = 1\n", &CompileOptions::default());
        assert!(!lenient.has_errors());
        let strict = compile_script("t", b"var var x = 1\n", &CompileOptions { warnings_as_errors: true, ..CompileOptions::default() });
        assert!(strict.has_errors());
    }
}
