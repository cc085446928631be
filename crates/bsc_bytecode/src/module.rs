use bsc_ir::{BlockId, IrCodeBlock, IrStmt};
use bsc_sema::SymbolTable;

use crate::opcode::OpCode;
use crate::writer::{BytecodeWriter, CompiledCode};

/// An `ExceptInfo` (§3.7) with its block ids resolved to byte offsets and
/// its handler type symbols resolved to string-pool indices, ready to ship
/// alongside the bytecode buffer. `None` in `handler_type` marks a
/// finally/re-raise handler, same as the IR's `Option<SymbolId>`.
#[derive(Debug, Clone)]
pub struct EncodedExceptInfo {
    pub begin: u32,
    pub end: u32,
    pub handlers: Vec<(u32, Option<u16>)>,
}

/// One compiled function/method/closure body (§2's `BytecodeWriter`
/// output): the byte buffer plus everything a loader needs to run it --
/// constant/string pools, the line table, and exception ranges.
#[derive(Debug)]
pub struct CompiledFunction {
    pub name: String,
    pub vararg: bool,
    pub argc: usize,
    pub code: Vec<u8>,
    pub consts: Vec<bsc_ir::Value>,
    pub strings: Vec<String>,
    pub line_info: Vec<(u32, u32, u32)>,
    pub handlers: Vec<EncodedExceptInfo>,
}

/// Linearizes one finalized `IrCodeBlock` into a `CompiledFunction`.
/// Blocks are already in reverse postorder (`IrCodeBlock`'s invariant), so
/// emission is a single linear pass; the only lookahead needed is each
/// block's immediate successor in that order, used to skip emitting a
/// redundant `Br` when `BrCond`'s false edge is the very next block.
pub fn emit_function(code: &IrCodeBlock, symbols: &SymbolTable, handler: &bsc_errors::Handler) -> CompiledFunction {
    let mut w = BytecodeWriter::new(code.blocks.len(), handler);

    for (i, block) in code.blocks.iter().enumerate() {
        w.register_label(block.id);
        let next = code.blocks.get(i + 1).map(|b| b.id);
        for stmt in &block.stmts {
            emit_stmt(&mut w, stmt, symbols, next);
        }
        w.end_label(block.id);
    }

    let handlers = code
        .handlers
        .iter()
        .map(|h| EncodedExceptInfo {
            begin: w.label(h.begin).begin(),
            end: w.label(h.end).end.unwrap_or_else(|| w.label(h.end).begin()),
            handlers: h
                .handlers
                .iter()
                .map(|(block, ty)| (w.label(*block).begin(), ty.map(|id| w.intern_string(symbols.get(id).name.clone()))))
                .collect(),
        })
        .collect();

    let CompiledCode { code: bytes, consts, strings, line_info } = w.finish();

    CompiledFunction {
        name: code.name.clone(),
        vararg: code.vararg,
        argc: code.args.len(),
        code: bytes,
        consts,
        strings,
        line_info,
        handlers,
    }
}

fn symbol_name(symbols: &SymbolTable, id: bsc_ast::SymbolId) -> String {
    symbols.get(id).name.clone()
}

fn emit_stmt(w: &mut BytecodeWriter, stmt: &IrStmt, symbols: &SymbolTable, next: Option<BlockId>) {
    match stmt {
        IrStmt::LoadConst(o) => {
            w.op(o.pos, OpCode::LoadConst);
            w.reg(o.pos, o.ret);
            let idx = w.intern_const(o.value.clone());
            w.u16(idx);
        }
        IrStmt::DeclareSymbol(o) => {
            w.op(o.pos, OpCode::DeclareSymbol);
            w.reg(o.pos, o.value);
            let idx = w.intern_string(symbol_name(symbols, o.symbol));
            w.u16(idx);
        }
        IrStmt::LoadSymbol(o) => {
            w.op(o.pos, OpCode::LoadSymbol);
            w.reg(o.pos, o.ret);
            let idx = w.intern_string(symbol_name(symbols, o.symbol));
            w.u16(idx);
        }
        IrStmt::StoreSymbol(o) => {
            w.op(o.pos, OpCode::StoreSymbol);
            w.reg(o.pos, o.value);
            let idx = w.intern_string(symbol_name(symbols, o.symbol));
            w.u16(idx);
        }
        IrStmt::Inplace(o) => {
            w.op(o.pos, o.op.into());
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target);
            w.reg(o.pos, o.value);
        }
        IrStmt::Binary(o) => {
            w.op(o.pos, o.op.into());
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.left);
            w.reg(o.pos, o.right);
        }
        IrStmt::Unary(o) => {
            w.op(o.pos, o.op.into());
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.value);
        }
        IrStmt::Defined(o) => {
            w.op(o.pos, OpCode::Defined);
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target.unwrap_or(bsc_ir::IR_INVALID_VALUE));
            let idx = w.intern_const(o.id.clone());
            w.u16(idx);
        }
        IrStmt::Test(o) => {
            w.op(o.pos, OpCode::Test);
            w.testkind(o.kind.into());
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.left);
            w.reg(o.pos, o.right);
        }
        IrStmt::Call(o) => {
            w.op(o.pos, OpCode::Call);
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target);
            w.u16(o.args.len() as u16);
            for a in &o.args {
                w.reg(o.pos, *a);
            }
        }
        IrStmt::Invoke(o) => {
            w.op(o.pos, OpCode::Invoke);
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target);
            let idx = w.intern_string(o.member.clone());
            w.u16(idx);
            w.u16(o.args.len() as u16);
            for a in &o.args {
                w.reg(o.pos, *a);
            }
        }
        IrStmt::GetMember(o) => {
            w.op(o.pos, OpCode::GetMember);
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target);
            let idx = w.intern_string(o.member.clone());
            w.u16(idx);
        }
        IrStmt::GetSubscript(o) => {
            w.op(o.pos, OpCode::GetSubscript);
            w.reg(o.pos, o.ret);
            w.reg(o.pos, o.target);
            w.reg(o.pos, o.index);
        }
        IrStmt::SetMember(o) => {
            w.op(o.pos, OpCode::SetMember);
            w.reg(o.pos, o.target);
            w.reg(o.pos, o.value);
            let idx = w.intern_string(o.member.clone());
            w.u16(idx);
        }
        IrStmt::SetSubscript(o) => {
            w.op(o.pos, OpCode::SetSubscript);
            w.reg(o.pos, o.target);
            w.reg(o.pos, o.index);
            w.reg(o.pos, o.value);
        }
        IrStmt::Br(o) => {
            w.op(o.pos, OpCode::Br);
            w.branch_absolute(o.target);
        }
        IrStmt::BrCond(o) => {
            w.op(o.pos, OpCode::BrCond);
            w.reg(o.pos, o.cond);
            w.branch_relative(o.on_true);
            if next != Some(o.on_false) {
                w.op(o.pos, OpCode::Br);
                w.branch_absolute(o.on_false);
            }
        }
        IrStmt::JumpTable(o) => {
            w.op(o.pos, OpCode::JumpTable);
            w.reg(o.pos, o.cond);
            w.u16(o.cases.len() as u16);
            w.branch_absolute(o.default);
            for (value, target) in &o.cases {
                let idx = w.intern_const(value.clone());
                w.u16(idx);
                w.branch_absolute(*target);
            }
        }
        IrStmt::Return(o) => {
            w.op(o.pos, OpCode::Return);
            w.reg(o.pos, o.value);
        }
        IrStmt::Raise(o) => {
            w.op(o.pos, OpCode::Raise);
            w.reg(o.pos, o.throwable);
        }
        IrStmt::Assert(o) => {
            w.op(o.pos, OpCode::Assert);
            w.reg(o.pos, o.cond);
            w.reg(o.pos, o.message);
        }
        IrStmt::Select(o) => {
            w.op(bsc_span::SourcePosition::synthetic(), OpCode::Select);
            w.reg(bsc_span::SourcePosition::synthetic(), o.ret);
            w.u16(o.targets.len() as u16);
            for t in &o.targets {
                w.reg(bsc_span::SourcePosition::synthetic(), *t);
            }
        }
        IrStmt::Make(o) => {
            w.op(o.pos, o.kind.into());
            w.reg(o.pos, o.ret);
            w.u16(o.args.len() as u16);
            for a in &o.args {
                w.reg(o.pos, *a);
            }
        }
        IrStmt::MakeClosure(o) => {
            w.op(o.pos, OpCode::MakeClosure);
            w.reg(o.pos, o.ret);
            let idx = w.intern_string(symbol_name(symbols, o.symbol));
            w.u16(idx);
            w.u16(o.captures.len() as u16);
            for c in &o.captures {
                w.reg(o.pos, *c);
            }
        }
        IrStmt::Import(o) => {
            w.op(o.pos, OpCode::Import);
            w.reg(o.pos, o.path);
        }
        IrStmt::Export(o) => {
            w.op(o.pos, OpCode::Export);
            let idx = w.intern_string(symbol_name(symbols, o.symbol));
            w.u16(idx);
        }
    }
}
