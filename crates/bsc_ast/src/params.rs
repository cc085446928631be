use bsc_span::{Identifier, SourcePosition, SourceRange};

use crate::OneWrite;
use crate::SymbolId;

/// A single formal parameter. `NamedDeclaration` in the source; here a
/// one-write `symbol` slot filled in by the semantic analyzer when it
/// builds the enclosing function/method/closure's scope.
#[derive(Debug)]
pub struct Parameter {
    pub name: Identifier,
    pub symbol: OneWrite<SymbolId>,
}

impl Parameter {
    pub fn new(name: Identifier) -> Self {
        Parameter { name, symbol: OneWrite::empty() }
    }
}

/// The parenthesized parameter list shared by functions, methods, and
/// closures (the source's `ParameterList`/`Parameters` -- one shape serves
/// both, since closures parse identically to a method's parameter list).
#[derive(Debug)]
pub struct ParameterList {
    pub range: SourceRange,
    pub open: SourcePosition,
    pub params: Vec<Parameter>,
    pub commas: Vec<SourcePosition>,
    pub vararg: Option<SourcePosition>,
    pub close: SourcePosition,
}

impl ParameterList {
    pub fn argc(&self) -> usize {
        self.params.len()
    }

    pub fn is_vararg(&self) -> bool {
        self.vararg.is_some()
    }
}

/// Alias matching §3.3's five top-level AST kinds
/// (Declaration/Statement/Expression/Parameters/Label); closures and
/// functions/methods both parse into a `ParameterList`.
pub type Parameters = ParameterList;
