use rustc_hash::FxHashMap;

use bsc_ast::SymbolId;
use bsc_sema::{SymbolKind, SymbolTable, VariableKind};
use bsc_span::SourcePosition;

use crate::block::{BasicBlock, BlockId};
use crate::code_block::{ExceptInfo, IrCodeBlock};
use crate::stmt::{IrStmt, LoadConstOp, LoadSymbolOp, SelectOp, StoreSymbolOp};
use crate::value::{IrValue, Value};

/// A symbol is "local" to this builder's SSA bookkeeping -- read/write go
/// through `defined`/`Select` rather than a `LoadSymbol`/`StoreSymbol` pair
/// -- exactly for `Local`/`Parameter`/`Except`/`Implicit` variables (§4.5.1,
/// ported from the original's `IsGlobal`). Everything else (globals,
/// exported names, functions, classes, ...) always round-trips through the
/// symbol table.
fn is_global(table: &SymbolTable, symbol: SymbolId) -> bool {
    match &table.get(symbol).kind {
        SymbolKind::Variable(v) => !v.kind.is_capturable_local(),
        // A captured local is read/written like any other local within the
        // closure body that binds it (`IrGenerator::gen_closure` primes it
        // with `bind_local`, same as a parameter) -- it must take the SSA
        // read path, not the by-name global load every other non-Variable
        // symbol takes.
        SymbolKind::BoundedLocal(_) => false,
        _ => true,
    }
}

/// Builds one function/closure/method's `IrCodeBlock`, implementing Braun et
/// al.'s "Simple and Efficient Construction of SSA Form" (§4.5.1): phis are
/// inserted lazily while reading a local across a block boundary, completed
/// once a block is sealed (all predecessors known), and simplified away
/// immediately when trivial.
pub struct IrBuilder<'a> {
    table: &'a SymbolTable,
    name: String,
    args: Vec<SymbolId>,
    vararg: bool,

    next_value: u32,
    blocks: Vec<BasicBlock>,
    current: BlockId,
    entry: BlockId,

    handlers: Vec<ExceptInfo>,
    /// All `Select` ops ever created, keyed by their result register, so
    /// `AddPhiOps`/`OptPhi` can mutate one regardless of which block or
    /// pending-set it's filed under.
    selects: FxHashMap<IrValue, SelectOp>,
    /// Non-trivial phis awaiting insertion at their block's head in
    /// `finalize`, in creation order per block.
    candidates: FxHashMap<BlockId, Vec<(SymbolId, IrValue)>>,
}

impl<'a> IrBuilder<'a> {
    pub fn new(table: &'a SymbolTable, name: impl Into<String>, args: Vec<SymbolId>, vararg: bool) -> Self {
        let entry = BasicBlock::new(BlockId(0));
        let mut blocks = Vec::new();
        blocks.push(entry);

        let mut builder = IrBuilder {
            table,
            name: name.into(),
            args,
            vararg,
            next_value: 0,
            blocks,
            current: BlockId(0),
            entry: BlockId(0),
            handlers: Vec::new(),
            selects: FxHashMap::default(),
            candidates: FxHashMap::default(),
        };
        builder.blocks[0].sealed = true;
        builder
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0 as usize]
    }

    /// `CreateNewBlock`.
    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::new(id));
        id
    }

    /// `SetBlock`: switches the active block, optionally sealing it (every
    /// predecessor of `block` must already be wired via `add_edge` before
    /// sealing, or a seal records an incomplete predecessor set).
    pub fn set_block(&mut self, block: BlockId, seal: bool) -> BlockId {
        let old = self.current;
        self.current = block;
        if seal {
            self.seal_block(block);
        }
        old
    }

    /// Records a control-flow edge `from -> to`. Must be called before
    /// emitting `to`'s terminal-dependent reads if `to` is later sealed with
    /// that edge counted.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        self.block_mut(from).add_successor(to);
        self.block_mut(to).add_predecessor(from);
    }

    pub fn new_register(&mut self) -> IrValue {
        let v = IrValue(self.next_value);
        self.next_value += 1;
        v
    }

    pub fn push(&mut self, stmt: IrStmt) {
        self.block_mut(self.current).push(stmt);
    }

    pub fn add_except_info(&mut self, info: ExceptInfo) {
        self.handlers.push(info);
    }

    /// Primes `symbol`'s SSA slot directly to `value` without going through
    /// `write_symbol`'s global-detection path. Used to bind parameters,
    /// `self`/`super`, and `for`/`with`/`except` capture variables -- all of
    /// which are established by direct register assignment, never by a
    /// `StoreSymbol`/`DeclareSymbol` op (§8's argument-binding scenario), and
    /// some of which (`self`/`super`, resolving to the owning class/task
    /// symbol) would otherwise be misclassified as global by `is_global`.
    pub fn bind_local(&mut self, symbol: SymbolId, value: IrValue) {
        self.block_mut(self.current).defined.insert(symbol, value);
    }

    /// Whether the current block already ends in a terminal IR, so callers
    /// generating structured control flow know not to append another one.
    pub fn current_block_terminated(&self) -> bool {
        self.block(self.current).terminal().is_some()
    }

    /// `ReadConst` / `FindConst`: dedups a constant load against this block
    /// and, transitively, any predecessor that agrees on the same register.
    pub fn read_const(&mut self, pos: SourcePosition, value: Value) -> IrValue {
        if let Some(reg) = self.find_const(self.current, &value) {
            return reg;
        }
        let reg = self.new_register();
        self.push(IrStmt::LoadConst(LoadConstOp { pos, ret: reg, value: value.clone() }));
        self.block_mut(self.current).consts.insert(value, reg);
        reg
    }

    fn find_const(&self, block: BlockId, value: &Value) -> Option<IrValue> {
        if let Some(reg) = self.block(block).consts.get(value) {
            return Some(*reg);
        }

        let mut found: Option<IrValue> = None;
        for pred in self.block(block).predecessors.clone() {
            match self.find_const(pred, value) {
                None => continue,
                Some(v) => match found {
                    None => found = Some(v),
                    Some(f) if f != v => return None,
                    _ => {}
                },
            }
        }
        found
    }

    /// Public entry point (`ReadSymbol(pos, symbol)`): globals always load
    /// through the symbol table and cache in the current block; locals
    /// dispatch into the recursive SSA search.
    pub fn read_symbol(&mut self, pos: SourcePosition, symbol: SymbolId) -> IrValue {
        if let Some(&reg) = self.block(self.current).defined.get(&symbol) {
            return reg;
        }

        if is_global(self.table, symbol) {
            let reg = self.new_register();
            self.push(IrStmt::LoadSymbol(LoadSymbolOp { pos, ret: reg, symbol }));
            self.block_mut(self.current).defined.insert(symbol, reg);
            reg
        } else {
            self.read_symbol_in(symbol, self.current)
        }
    }

    /// `WriteSymbol`: updates this block's SSA slot for `symbol`, and for
    /// globals additionally emits the store the symbol table expects to see.
    pub fn write_symbol(&mut self, pos: SourcePosition, symbol: SymbolId, value: IrValue) {
        self.block_mut(self.current).defined.insert(symbol, value);
        if is_global(self.table, symbol) {
            self.push(IrStmt::StoreSymbol(StoreSymbolOp { pos, symbol, value }));
        }
    }

    /// The recursive core of Braun et al.'s algorithm: cached lookup,
    /// placeholder insertion for an unsealed block, single-predecessor
    /// recursion, or full phi construction at a merge point.
    fn read_symbol_in(&mut self, symbol: SymbolId, block: BlockId) -> IrValue {
        if let Some(&reg) = self.block(block).defined.get(&symbol) {
            return reg;
        }

        let reg = if !self.block(block).sealed {
            let reg = self.new_register();
            self.selects.insert(reg, SelectOp { ret: reg, targets: Vec::new() });
            self.block_mut(block).incomplete_phis.push((symbol, reg));
            reg
        } else if self.block(block).predecessors.len() == 1 {
            let pred = self.block(block).predecessors[0];
            self.read_symbol_in(symbol, pred)
        } else {
            let select_reg = self.new_register();
            self.selects.insert(select_reg, SelectOp { ret: select_reg, targets: Vec::new() });
            self.block_mut(block).defined.insert(symbol, select_reg);

            let reg = self.add_phi_operands(select_reg, symbol, block);
            if reg == select_reg {
                self.candidates.entry(block).or_default().push((symbol, select_reg));
            }
            reg
        };

        self.block_mut(block).defined.insert(symbol, reg);
        reg
    }

    /// `AddPhiOps`: reads `symbol` from every predecessor, dedups into a set
    /// of distinct values, and hands them to `opt_phi`.
    fn add_phi_operands(&mut self, select_reg: IrValue, symbol: SymbolId, block: BlockId) -> IrValue {
        let preds = self.block(block).predecessors.clone();
        let mut values = Vec::new();
        for pred in preds {
            let v = self.read_symbol_in(symbol, pred);
            if !values.contains(&v) {
                values.push(v);
            }
        }
        if let Some(select) = self.selects.get_mut(&select_reg) {
            select.targets = values;
        }
        self.opt_phi(select_reg, symbol, block)
    }

    /// `OptPhi`: if every operand is the phi itself or a single other value,
    /// the phi is trivial -- replace it everywhere with that value and
    /// recursively simplify any other pending phi that used it. Otherwise
    /// the phi is genuine and its register is returned unchanged.
    fn opt_phi(&mut self, phi: IrValue, symbol: SymbolId, block: BlockId) -> IrValue {
        let mut same: Option<IrValue> = None;
        let targets = self.selects.get(&phi).map(|s| s.targets.clone()).unwrap_or_default();
        for op in targets {
            if Some(op) == same || op == phi {
                continue;
            }
            if same.is_some() {
                return phi;
            }
            same = Some(op);
        }

        let same = match same {
            Some(v) => v,
            None => {
                // Every operand reduced to the phi itself: the symbol has no
                // definition reaching this point on any path, so read it as
                // if freshly entering scope here.
                let reg = self.new_register();
                self.block_mut(block)
                    .stmts
                    .insert(0, IrStmt::LoadSymbol(LoadSymbolOp { pos: SourcePosition::synthetic(), ret: reg, symbol }));
                reg
            }
        };

        for b in 0..self.blocks.len() {
            let id = BlockId(b as u32);
            for stmt in self.blocks[id.0 as usize].stmts.iter_mut() {
                stmt.replace_value(phi, same);
            }
        }
        for select in self.selects.values_mut() {
            for t in select.targets.iter_mut() {
                if *t == phi {
                    *t = same;
                }
            }
            select.targets.dedup();
        }

        if let Some(c) = self.candidates.get_mut(&block) {
            c.retain(|(s, _)| *s != symbol);
        }

        let referrers: Vec<(BlockId, IrValue)> = self
            .candidates
            .iter()
            .flat_map(|(b, syms)| syms.iter().filter(|(s, _)| *s == symbol).map(move |(_, r)| (*b, *r)))
            .collect();

        for (b, select_reg) in referrers {
            let had_phi = self
                .selects
                .get(&select_reg)
                .map(|s| s.targets.iter().filter(|t| **t == phi).count())
                .unwrap_or(0);
            if had_phi == 0 {
                continue;
            }
            if let Some(select) = self.selects.get_mut(&select_reg) {
                select.targets.retain(|t| *t != phi);
            }
            self.opt_phi(select_reg, symbol, b);
        }

        same
    }

    /// `SealBlock`: drains the incomplete phis recorded while `block` had
    /// unknown predecessors and completes each one's operand list now that
    /// all predecessors are wired.
    pub fn seal_block(&mut self, block: BlockId) {
        let pending = std::mem::take(&mut self.block_mut(block).incomplete_phis);
        for (symbol, select_reg) in pending {
            let reg = self.add_phi_operands(select_reg, symbol, block);
            if reg == select_reg {
                self.candidates.entry(block).or_default().push((symbol, select_reg));
            }
        }
        self.block_mut(block).sealed = true;
    }

    /// `Finalize`: truncates dead code after each block's terminal,
    /// reorders blocks into reverse postorder, and splices surviving
    /// candidate phis into their block's head.
    pub fn finalize(mut self) -> IrCodeBlock {
        for block in self.blocks.iter_mut() {
            if let Some(cut) = block.stmts.iter().position(|s| s.is_terminal()) {
                block.stmts.truncate(cut + 1);
            }
        }

        let order = reverse_postorder(&self.blocks, self.entry);

        let mut candidates = std::mem::take(&mut self.candidates);
        for (id, block) in self.blocks.iter_mut().enumerate() {
            if let Some(phis) = candidates.remove(&BlockId(id as u32)) {
                let mut inserted: Vec<IrStmt> = phis
                    .into_iter()
                    .filter_map(|(_, reg)| self.selects.remove(&reg))
                    .map(IrStmt::Select)
                    .collect();
                inserted.append(&mut block.stmts);
                block.stmts = inserted;
            }
        }

        let remap: FxHashMap<BlockId, BlockId> =
            order.iter().enumerate().map(|(new_idx, old_id)| (*old_id, BlockId(new_idx as u32))).collect();

        let mut reordered: Vec<BasicBlock> = Vec::with_capacity(order.len());
        let mut taken: Vec<Option<BasicBlock>> = self.blocks.into_iter().map(Some).collect();
        for old_id in &order {
            let mut block = taken[old_id.0 as usize].take().expect("block visited twice during reorder");
            block.id = remap[old_id];
            block.predecessors = block.predecessors.iter().map(|p| remap[p]).collect();
            block.successors = block.successors.iter().map(|s| remap[s]).collect();
            for stmt in block.stmts.iter_mut() {
                remap_targets(stmt, &remap);
            }
            reordered.push(block);
        }

        let handlers = self
            .handlers
            .into_iter()
            .map(|h| ExceptInfo {
                begin: remap[&h.begin],
                end: remap[&h.end],
                handlers: h.handlers.into_iter().map(|(b, ty)| (remap[&b], ty)).collect(),
            })
            .collect();

        IrCodeBlock { name: self.name, blocks: reordered, vararg: self.vararg, handlers, args: self.args }
    }
}

/// Depth-first postorder over the CFG reachable from `entry`, reversed, so
/// every reachable block precedes its predecessors in the common case of a
/// single entry with forward-dominating control flow. Exception-handler
/// blocks (§4.5.2's `gen_try`/`gen_with`) are linked into `ExceptInfo` only,
/// never via `add_edge`, so they are never reachable by a successor walk;
/// per the "do not attempt a fixed-point removal of unreachable blocks"
/// design note, any block not visited by the walk is appended afterward in
/// creation order rather than dropped, so every block a builder created
/// -- and every `ExceptInfo` reference to one -- survives `finalize`.
fn reverse_postorder(blocks: &[BasicBlock], entry: BlockId) -> Vec<BlockId> {
    let mut visited = vec![false; blocks.len()];
    let mut order = Vec::with_capacity(blocks.len());

    fn walk(id: BlockId, blocks: &[BasicBlock], visited: &mut [bool], order: &mut Vec<BlockId>) {
        visited[id.0 as usize] = true;
        for succ in &blocks[id.0 as usize].successors {
            if !visited[succ.0 as usize] {
                walk(*succ, blocks, visited, order);
            }
        }
        order.push(id);
    }

    walk(entry, blocks, &mut visited, &mut order);
    order.reverse();

    for (idx, seen) in visited.iter().enumerate() {
        if !seen {
            order.push(BlockId(idx as u32));
        }
    }
    order
}

fn remap_targets(stmt: &mut IrStmt, remap: &FxHashMap<BlockId, BlockId>) {
    match stmt {
        IrStmt::Br(o) => o.target = remap[&o.target],
        IrStmt::BrCond(o) => {
            o.on_true = remap[&o.on_true];
            o.on_false = remap[&o.on_false];
        }
        IrStmt::JumpTable(o) => {
            o.default = remap[&o.default];
            for (_, target) in o.cases.iter_mut() {
                *target = remap[target];
            }
        }
        _ => {}
    }
}
