mod decl;
mod expr;
mod label;
mod params;
mod stmt;

pub use decl::*;
pub use expr::*;
pub use label::*;
pub use params::*;
pub use stmt::*;

pub use bsc_span::{Identifier, SourcePosition, SourceRange};

use std::cell::RefCell;

/// Opaque index into the symbol table owned by `bsc_sema`. The AST never
/// holds an actual `Symbol` -- that would make `bsc_ast` depend on
/// `bsc_sema`, which depends on `bsc_ast`. An arena index breaks the cycle
/// the same way `rustc` keys definitions by `DefId` rather than by pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// A field written exactly once, after construction, by the semantic
/// analyzer or IR generator (`symbol`, `boundedLocals`, `evaluatedCaseValue`
/// in §3.3). Writing twice is a program error, caught in debug builds the
/// same way the source's `MUST_BE_NULL`/`NEVER_BE_NULL` assertions do.
#[derive(Debug)]
pub struct OneWrite<T>(RefCell<Option<T>>);

impl<T> OneWrite<T> {
    pub fn empty() -> Self {
        OneWrite(RefCell::new(None))
    }

    pub fn set(&self, value: T) {
        let mut slot = self.0.borrow_mut();
        debug_assert!(slot.is_none(), "one-write field written more than once");
        *slot = Some(value);
    }

    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl<T: Clone> OneWrite<T> {
    /// Panics if called before the corresponding `set` -- mirrors the
    /// source's `NEVER_BE_NULL(m_symbol)` contract on the getter side.
    pub fn get(&self) -> T {
        self.0.borrow().clone().expect("one-write field read before it was written")
    }

    pub fn get_if_set(&self) -> Option<T> {
        self.0.borrow().clone()
    }
}

impl<T> Default for OneWrite<T> {
    fn default() -> Self {
        OneWrite::empty()
    }
}

/// One child of a script body, block body, or labeled-statement body: these
/// positions accept either a declaration (a local `var`/`const`) or a plain
/// statement, matching the source's untyped `ASTNode*` trailing storage.
#[derive(Debug)]
pub enum Item {
    Decl(Decl),
    Stmt(Stmt),
}

impl Item {
    pub fn range(&self) -> SourceRange {
        match self {
            Item::Decl(d) => d.range(),
            Item::Stmt(s) => s.range(),
        }
    }
}

/// A compile-time constant a `Label`'s case value evaluates to (§4.4
/// case-label evaluation: only Integer/Float/Boolean/non-interpolated-String
/// literals qualify).
#[derive(Debug, Clone, PartialEq)]
pub enum CaseValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}
