use rustc_hash::FxHashMap;

use crate::stmt::IrStmt;
use crate::value::{IrValue, Value};

/// Arena index into `IRCodeBlock::blocks`. Mirrors `bsc_ast::SymbolId`'s
/// "index instead of pointer" convention so the graph stays a plain `Vec`
/// rather than a web of `Rc<RefCell<_>>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockId(pub u32);

/// One SSA basic block: a straight-line statement list ending in exactly
/// one terminal IR once `IRBuilder::finalize` has run (§3.6, §4.5.1).
///
/// `consts` and `defined` are per-block caches used only during
/// construction: `consts` dedups `LoadConst` within and across predecessors
/// (`find_const`/`read_const` in the original), `defined` holds the current
/// SSA value of every symbol written in this block, consulted by
/// `read_symbol` before walking to predecessors.
#[derive(Debug, Default)]
pub struct BasicBlock {
    pub id: BlockId,
    pub stmts: Vec<IrStmt>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
    pub sealed: bool,
    pub(crate) consts: FxHashMap<Value, IrValue>,
    pub(crate) defined: FxHashMap<bsc_ast::SymbolId, IrValue>,
    /// Incomplete φs awaiting `seal_block` (§4.5.1): symbol and its
    /// placeholder `Select` register, in encounter order.
    pub(crate) incomplete_phis: Vec<(bsc_ast::SymbolId, IrValue)>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        BasicBlock {
            id,
            ..Default::default()
        }
    }

    pub fn push(&mut self, stmt: IrStmt) {
        debug_assert!(
            self.stmts.last().map_or(true, |s| !s.is_terminal()),
            "pushed a statement after a block's terminal IR"
        );
        self.stmts.push(stmt);
    }

    pub fn terminal(&self) -> Option<&IrStmt> {
        self.stmts.last().filter(|s| s.is_terminal())
    }

    pub fn add_predecessor(&mut self, from: BlockId) {
        if !self.predecessors.contains(&from) {
            self.predecessors.push(from);
        }
    }

    pub fn add_successor(&mut self, to: BlockId) {
        if !self.successors.contains(&to) {
            self.successors.push(to);
        }
    }
}
