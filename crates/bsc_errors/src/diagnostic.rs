use crate::code::ErrorCode;
use bsc_span::{SourcePosition, SourceRange};

/// A single edit hint attached to a diagnostic: insert text at a position,
/// or remove a range. The bytecode/IR stages never produce these; only the
/// lexer/parser/analyzer do, since only they have enough surface syntax
/// context to suggest a fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { at: SourcePosition, text: String },
    Remove { range: SourceRange },
}

/// A secondary position referenced by a diagnostic, e.g. "previous
/// definition is here".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubDiagnostic {
    pub position: SourcePosition,
    pub message: String,
}

/// A single compiler diagnostic: a position, a stable kind, formatted
/// arguments, zero or more reference positions, zero or more edit hints.
///
/// Diagnostics are collected, never thrown; a stage that reports one keeps
/// walking its input so later stages still see a structurally complete
/// (if semantically invalid) tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub position: SourcePosition,
    pub message: String,
    pub references: Vec<SubDiagnostic>,
    pub edits: Vec<Edit>,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, position: SourcePosition, message: impl Into<String>) -> Self {
        Diagnostic { code, position, message: message.into(), references: Vec::new(), edits: Vec::new() }
    }

    pub fn with_reference(mut self, position: SourcePosition, message: impl Into<String>) -> Self {
        self.references.push(SubDiagnostic { position, message: message.into() });
        self
    }

    pub fn with_insert(mut self, at: SourcePosition, text: impl Into<String>) -> Self {
        self.edits.push(Edit::Insert { at, text: text.into() });
        self
    }

    pub fn with_removal(mut self, range: SourceRange) -> Self {
        self.edits.push(Edit::Remove { range });
        self
    }
}
