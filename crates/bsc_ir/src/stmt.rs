use bsc_ast::SymbolId;
use bsc_span::SourcePosition;

use crate::opcode::{BinaryOpKind, MakeKind, TestKind, UnaryOpKind};
use crate::value::{IrValue, Value};
use crate::BlockId;

/// A member name used by `GetMember`/`SetMember`/`Invoke` -- always a plain
/// string since the object model (out of scope here) resolves it at
/// runtime.
pub type MemberName = String;

#[derive(Debug)]
pub struct LoadConstOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub value: Value,
}

#[derive(Debug)]
pub struct DeclareSymbolOp {
    pub pos: SourcePosition,
    pub symbol: SymbolId,
    pub value: IrValue,
}

#[derive(Debug)]
pub struct LoadSymbolOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub symbol: SymbolId,
}

#[derive(Debug)]
pub struct StoreSymbolOp {
    pub pos: SourcePosition,
    pub symbol: SymbolId,
    pub value: IrValue,
}

/// `x += y`-style compound assignment to a plain local, after §4.5.2 reads
/// the old value: `ret = target <op> value`.
#[derive(Debug)]
pub struct InplaceOp {
    pub pos: SourcePosition,
    pub op: BinaryOpKind,
    pub ret: IrValue,
    pub target: IrValue,
    pub value: IrValue,
}

#[derive(Debug)]
pub struct BinaryOp {
    pub pos: SourcePosition,
    pub op: BinaryOpKind,
    pub ret: IrValue,
    pub left: IrValue,
    pub right: IrValue,
}

#[derive(Debug)]
pub struct UnaryOp {
    pub pos: SourcePosition,
    pub op: UnaryOpKind,
    pub ret: IrValue,
    pub value: IrValue,
}

/// `defined id [in postfix]`. `id` is the name being tested, folded to a
/// constant string at generation time since the desugaring never needs to
/// evaluate it as an expression.
#[derive(Debug)]
pub struct DefinedOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub id: Value,
    pub target: Option<IrValue>,
}

#[derive(Debug)]
pub struct TestOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub kind: TestKind,
    pub left: IrValue,
    pub right: IrValue,
}

#[derive(Debug)]
pub struct CallOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub target: IrValue,
    pub args: Vec<IrValue>,
}

#[derive(Debug)]
pub struct InvokeOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub target: IrValue,
    pub member: MemberName,
    pub args: Vec<IrValue>,
}

#[derive(Debug)]
pub struct GetMemberOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub target: IrValue,
    pub member: MemberName,
}

#[derive(Debug)]
pub struct GetSubscriptOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub target: IrValue,
    pub index: IrValue,
}

#[derive(Debug)]
pub struct SetMemberOp {
    pub pos: SourcePosition,
    pub target: IrValue,
    pub member: MemberName,
    pub value: IrValue,
}

#[derive(Debug)]
pub struct SetSubscriptOp {
    pub pos: SourcePosition,
    pub target: IrValue,
    pub index: IrValue,
    pub value: IrValue,
}

#[derive(Debug)]
pub struct BranchOp {
    pub pos: SourcePosition,
    pub target: BlockId,
}

#[derive(Debug)]
pub struct ConditionalBranchOp {
    pub pos: SourcePosition,
    pub cond: IrValue,
    pub on_true: BlockId,
    pub on_false: BlockId,
}

#[derive(Debug)]
pub struct JumpTableOp {
    pub pos: SourcePosition,
    pub cond: IrValue,
    pub default: BlockId,
    pub cases: Vec<(Value, BlockId)>,
}

#[derive(Debug)]
pub struct ReturnOp {
    pub pos: SourcePosition,
    pub value: IrValue,
}

#[derive(Debug)]
pub struct RaiseOp {
    pub pos: SourcePosition,
    pub throwable: IrValue,
}

#[derive(Debug)]
pub struct AssertOp {
    pub pos: SourcePosition,
    pub cond: IrValue,
    pub message: IrValue,
}

/// The SSA φ node (§3.6/§4.5.1). `targets` holds one entry per predecessor
/// once sealed; during construction it may temporarily hold fewer (an
/// incomplete φ) or be simplified away entirely before it ever reaches a
/// block's statement list.
#[derive(Debug)]
pub struct SelectOp {
    pub ret: IrValue,
    pub targets: Vec<IrValue>,
}

#[derive(Debug)]
pub struct MakeOp {
    pub pos: SourcePosition,
    pub kind: MakeKind,
    pub ret: IrValue,
    pub args: Vec<IrValue>,
}

/// `MakeClosure` additionally carries the closure's symbol so the bytecode
/// emitter/runtime can find its compiled body; `captures` is the bounded
/// locals' current SSA values, read at closure-construction time (§4.5.2).
#[derive(Debug)]
pub struct MakeClosureOp {
    pub pos: SourcePosition,
    pub ret: IrValue,
    pub symbol: SymbolId,
    pub captures: Vec<IrValue>,
}

#[derive(Debug)]
pub struct ImportOp {
    pub pos: SourcePosition,
    pub path: IrValue,
}

#[derive(Debug)]
pub struct ExportOp {
    pub pos: SourcePosition,
    pub symbol: SymbolId,
}

/// §3.6's `IRStatement` catalog: opcode, source position, optional result
/// register, opcode-specific operands. `Select` carries no position (§9:
/// synthetic, `SourcePosition::synthetic()`).
#[derive(Debug)]
pub enum IrStmt {
    LoadConst(LoadConstOp),
    DeclareSymbol(DeclareSymbolOp),
    LoadSymbol(LoadSymbolOp),
    StoreSymbol(StoreSymbolOp),
    Inplace(InplaceOp),
    Binary(BinaryOp),
    Unary(UnaryOp),
    Defined(DefinedOp),
    Test(TestOp),
    Call(CallOp),
    Invoke(InvokeOp),
    GetMember(GetMemberOp),
    GetSubscript(GetSubscriptOp),
    SetMember(SetMemberOp),
    SetSubscript(SetSubscriptOp),
    Br(BranchOp),
    BrCond(ConditionalBranchOp),
    JumpTable(JumpTableOp),
    Return(ReturnOp),
    Raise(RaiseOp),
    Assert(AssertOp),
    Select(SelectOp),
    Make(MakeOp),
    MakeClosure(MakeClosureOp),
    Import(ImportOp),
    Export(ExportOp),
}

impl IrStmt {
    /// §3.6: every basic block ends with exactly one terminal IR.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IrStmt::Br(_) | IrStmt::BrCond(_) | IrStmt::JumpTable(_) | IrStmt::Return(_) | IrStmt::Raise(_))
    }

    pub fn result(&self) -> Option<IrValue> {
        match self {
            IrStmt::LoadConst(o) => Some(o.ret),
            IrStmt::LoadSymbol(o) => Some(o.ret),
            IrStmt::Inplace(o) => Some(o.ret),
            IrStmt::Binary(o) => Some(o.ret),
            IrStmt::Unary(o) => Some(o.ret),
            IrStmt::Defined(o) => Some(o.ret),
            IrStmt::Test(o) => Some(o.ret),
            IrStmt::Call(o) => Some(o.ret),
            IrStmt::Invoke(o) => Some(o.ret),
            IrStmt::GetMember(o) => Some(o.ret),
            IrStmt::GetSubscript(o) => Some(o.ret),
            IrStmt::Select(o) => Some(o.ret),
            IrStmt::Make(o) => Some(o.ret),
            IrStmt::MakeClosure(o) => Some(o.ret),
            _ => None,
        }
    }

    /// Rewrite every register *use* that equals `old` to `new`. Used by
    /// trivial-φ removal (§4.5.1) to propagate a simplified φ's chosen
    /// value into statements already emitted when the φ is resolved.
    pub fn replace_value(&mut self, old: IrValue, new: IrValue) {
        let sub = |v: &mut IrValue| {
            if *v == old {
                *v = new;
            }
        };
        match self {
            IrStmt::LoadConst(_) | IrStmt::DeclareSymbol(_) | IrStmt::LoadSymbol(_) => {}
            IrStmt::StoreSymbol(o) => sub(&mut o.value),
            IrStmt::Inplace(o) => {
                sub(&mut o.target);
                sub(&mut o.value);
            }
            IrStmt::Binary(o) => {
                sub(&mut o.left);
                sub(&mut o.right);
            }
            IrStmt::Unary(o) => sub(&mut o.value),
            IrStmt::Defined(o) => {
                if let Some(t) = &mut o.target {
                    sub(t);
                }
            }
            IrStmt::Test(o) => {
                sub(&mut o.left);
                sub(&mut o.right);
            }
            IrStmt::Call(o) => {
                sub(&mut o.target);
                o.args.iter_mut().for_each(&sub);
            }
            IrStmt::Invoke(o) => {
                sub(&mut o.target);
                o.args.iter_mut().for_each(&sub);
            }
            IrStmt::GetMember(o) => sub(&mut o.target),
            IrStmt::GetSubscript(o) => {
                sub(&mut o.target);
                sub(&mut o.index);
            }
            IrStmt::SetMember(o) => {
                sub(&mut o.target);
                sub(&mut o.value);
            }
            IrStmt::SetSubscript(o) => {
                sub(&mut o.target);
                sub(&mut o.index);
                sub(&mut o.value);
            }
            IrStmt::Br(_) => {}
            IrStmt::BrCond(o) => sub(&mut o.cond),
            IrStmt::JumpTable(o) => sub(&mut o.cond),
            IrStmt::Return(o) => sub(&mut o.value),
            IrStmt::Raise(o) => sub(&mut o.throwable),
            IrStmt::Assert(o) => {
                sub(&mut o.cond);
                if !o.message.is_invalid() {
                    sub(&mut o.message);
                }
            }
            IrStmt::Select(o) => o.targets.iter_mut().for_each(&sub),
            IrStmt::Make(o) => o.args.iter_mut().for_each(&sub),
            IrStmt::MakeClosure(o) => o.captures.iter_mut().for_each(&sub),
            IrStmt::Import(o) => sub(&mut o.path),
            IrStmt::Export(_) => {}
        }
    }
}
