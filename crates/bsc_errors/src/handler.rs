use std::cell::RefCell;

use crate::code::ErrorCode;
use crate::diagnostic::Diagnostic;
use bsc_span::SourcePosition;

/// Severity of a reported diagnostic. Only `Error` participates in the
/// "IR generation must never run on a compilation that reported any error"
/// precondition (§7); `Warning` is informational and, per the compile
/// session's `warnings_as_errors` option, can be promoted to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warning,
    Error,
}

/// A "collect many, never abort" diagnostic sink, modeled on the teacher's
/// `librustc_errors::Handler`: reporting is synchronous and returns a
/// builder-style handle so callers can chain references/edits onto the
/// diagnostic they just raised.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<(Level, Diagnostic)>>,
    warnings_as_errors: bool,
}

impl Handler {
    pub fn new(warnings_as_errors: bool) -> Self {
        Handler { diagnostics: RefCell::new(Vec::new()), warnings_as_errors }
    }

    /// Report an error-level diagnostic. Returns a handle that can still be
    /// used to attach references/edits after the fact.
    pub fn error(&self, code: ErrorCode, position: SourcePosition, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.push(Level::Error, Diagnostic::new(code, position, message))
    }

    pub fn warn(&self, code: ErrorCode, position: SourcePosition, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        let level = if self.warnings_as_errors { Level::Error } else { Level::Warning };
        self.push(level, Diagnostic::new(code, position, message))
    }

    fn push(&self, level: Level, diag: Diagnostic) -> DiagnosticBuilder<'_> {
        log::debug!("diagnostic[{:?}] {} at {}", level, diag.code.as_str(), diag.position);
        let mut diags = self.diagnostics.borrow_mut();
        diags.push((level, diag));
        let index = diags.len() - 1;
        drop(diags);
        DiagnosticBuilder { handler: self, index }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.borrow().iter().any(|(level, _)| *level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().iter().filter(|(level, _)| *level == Level::Error).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    /// Consume the handler, returning every diagnostic reported in order.
    pub fn into_diagnostics(self) -> Vec<(Level, Diagnostic)> {
        self.diagnostics.into_inner()
    }

    pub fn diagnostics(&self) -> Vec<(Level, Diagnostic)> {
        self.diagnostics.borrow().clone()
    }
}

/// A chainable handle to the diagnostic just reported. Mirrors the
/// "builder-style handle" the resource model calls for (§5): reporting
/// never throws, but callers commonly want to attach a reference position
/// ("previous definition is here") right after raising.
pub struct DiagnosticBuilder<'h> {
    handler: &'h Handler,
    index: usize,
}

impl<'h> DiagnosticBuilder<'h> {
    pub fn reference(self, position: SourcePosition, message: impl Into<String>) -> Self {
        let mut diags = self.handler.diagnostics.borrow_mut();
        diags[self.index].1.references.push(crate::diagnostic::SubDiagnostic { position, message: message.into() });
        drop(diags);
        self
    }

    pub fn insert(self, at: SourcePosition, text: impl Into<String>) -> Self {
        let mut diags = self.handler.diagnostics.borrow_mut();
        diags[self.index].1.edits.push(crate::diagnostic::Edit::Insert { at, text: text.into() });
        drop(diags);
        self
    }

    pub fn remove(self, range: bsc_span::SourceRange) -> Self {
        let mut diags = self.handler.diagnostics.borrow_mut();
        diags[self.index].1.edits.push(crate::diagnostic::Edit::Remove { range });
        drop(diags);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_without_aborting() {
        let h = Handler::new(false);
        h.error(ErrorCode::UnexpectedToken, SourcePosition::new(0, 1, 1), "oops");
        h.warn(ErrorCode::RedundantModifier, SourcePosition::new(1, 1, 2), "redundant");
        assert_eq!(h.len(), 2);
        assert!(h.has_errors());
        assert_eq!(h.error_count(), 1);
    }

    #[test]
    fn warnings_as_errors_promotes_level() {
        let h = Handler::new(true);
        h.warn(ErrorCode::RedundantModifier, SourcePosition::new(0, 1, 1), "redundant");
        assert!(h.has_errors());
    }

    #[test]
    fn reference_attaches_to_last_diagnostic() {
        let h = Handler::new(false);
        h.error(ErrorCode::Redefinition, SourcePosition::new(5, 2, 1), "redefined `x`")
            .reference(SourcePosition::new(0, 1, 1), "previous definition is here");
        let diags = h.into_diagnostics();
        assert_eq!(diags[0].1.references.len(), 1);
    }
}
