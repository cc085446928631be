use bsc_ast::SymbolId;

use crate::block::{BasicBlock, BlockId};

/// `(begin, end, [(handlerBlock, typeSymbol_or_None)])` (§3.7). `begin`/`end`
/// delimit the protected range in execution order; `None` as a handler's
/// type marks a finally/re-raise handler that catches unconditionally.
#[derive(Debug, Clone)]
pub struct ExceptInfo {
    pub begin: BlockId,
    pub end: BlockId,
    pub handlers: Vec<(BlockId, Option<SymbolId>)>,
}

/// The finished output of one function/closure/method body (§3.7):
/// `(name, blocks, vararg, handlers, args)`. `blocks` is already in reverse
/// postorder and every block's trailing statement is terminal -- both
/// established by `IRBuilder::finalize`.
#[derive(Debug)]
pub struct IrCodeBlock {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
    pub vararg: bool,
    pub handlers: Vec<ExceptInfo>,
    pub args: Vec<SymbolId>,
}

impl IrCodeBlock {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }
}
