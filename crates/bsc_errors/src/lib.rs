//! Diagnostics for the build-script compiler pipeline.
//!
//! Every stage keeps going after reporting an error (see the error handling
//! design: lexer/parser insert placeholder nodes, the analyzer inserts
//! undeclared-symbol placeholders) so this is a "collect many" handler, not
//! a `Result`-per-call error type. `thiserror`/`anyhow` model the wrong
//! shape for that; a `Diagnostic`/`Level`/`Handler` trio does.

mod code;
mod diagnostic;
mod handler;

pub use code::ErrorCode;
pub use diagnostic::{Diagnostic, Edit, SubDiagnostic};
pub use handler::{DiagnosticBuilder, Handler, Level};

pub use bsc_span::{SourcePosition, SourceRange};
