use bsc_span::SourceRange;
use bsc_span::SourcePosition;

use crate::Expr;
use crate::Item;
use crate::Label;
use crate::OneWrite;
use crate::SymbolId;

/// The compound-assignment operator of an `AssignStatement` (§6.2's
/// `Assign` unit); `Assign` itself is plain `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    LeftShift,
    RightShift,
}

#[derive(Debug)]
pub struct BlockStmt {
    pub range: SourceRange,
    pub open: SourcePosition,
    pub close: SourcePosition,
    pub body: Vec<Item>,
}

#[derive(Debug)]
pub struct ArrowStmt {
    pub range: SourceRange,
    pub arrow: SourcePosition,
    pub expr: Box<Expr>,
}

#[derive(Debug)]
pub struct IfStmt {
    pub range: SourceRange,
    pub if_pos: SourcePosition,
    pub condition: Box<Expr>,
    pub if_body: Box<Stmt>,
    pub else_pos: Option<SourcePosition>,
    pub else_body: Option<Box<Stmt>>,
}

#[derive(Debug)]
pub struct MatchStmt {
    pub range: SourceRange,
    pub match_pos: SourcePosition,
    pub condition: Box<Expr>,
    pub open: SourcePosition,
    pub close: SourcePosition,
    /// Each arm is a `Stmt::Labeled` carrying one or more stacked labels
    /// followed by its body statements.
    pub arms: Vec<Stmt>,
}

#[derive(Debug)]
pub struct LabeledStmt {
    pub range: SourceRange,
    pub labels: Vec<Label>,
    pub body: Vec<Item>,
}

#[derive(Debug)]
pub struct ForStmt {
    pub range: SourceRange,
    pub for_pos: SourcePosition,
    pub param: bsc_span::Identifier,
    pub in_pos: SourcePosition,
    pub expr: Box<Expr>,
    pub body: Box<Stmt>,
    /// Symbol for `param`, set by the analyzer alongside the Loop scope it
    /// introduces (extends this port's one-write set beyond §3.3's list so
    /// the IR generator has a stable handle without re-deriving it).
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct WhileStmt {
    pub range: SourceRange,
    pub while_pos: SourcePosition,
    pub condition: Box<Expr>,
    pub body: Box<Stmt>,
}

#[derive(Debug)]
pub struct WithStmt {
    pub range: SourceRange,
    pub with_pos: SourcePosition,
    pub expr: Box<Expr>,
    pub as_pos: Option<SourcePosition>,
    pub capture: Option<bsc_span::Identifier>,
    pub body: Box<Stmt>,
    /// Symbol for `capture`, set only when `capture.is_some()` (see the
    /// note on `ForStmt::symbol`).
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct TryStmt {
    pub range: SourceRange,
    pub try_pos: SourcePosition,
    pub body: Box<Stmt>,
    /// `Stmt::Except`/`Stmt::Finally` entries, in source order.
    pub handlers: Vec<Stmt>,
}

#[derive(Debug)]
pub struct ExceptStmt {
    pub range: SourceRange,
    pub except_pos: SourcePosition,
    pub type_name: bsc_span::Identifier,
    pub as_pos: Option<SourcePosition>,
    pub capture: Option<bsc_span::Identifier>,
    pub body: Box<Stmt>,
    /// Symbol for `capture`, one of the explicitly-enumerated one-write
    /// fields in §3.3.
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct FinallyStmt {
    pub range: SourceRange,
    pub finally_pos: SourcePosition,
    pub body: Box<Stmt>,
}

#[derive(Debug)]
pub struct BreakStmt {
    pub range: SourceRange,
    pub break_pos: SourcePosition,
    pub if_pos: Option<SourcePosition>,
    pub condition: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct ContinueStmt {
    pub range: SourceRange,
    pub continue_pos: SourcePosition,
    pub if_pos: Option<SourcePosition>,
    pub condition: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct ReturnStmt {
    pub range: SourceRange,
    pub return_pos: SourcePosition,
    pub value: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct AssertStmt {
    pub range: SourceRange,
    pub assert_pos: SourcePosition,
    pub condition: Box<Expr>,
    pub colon_pos: Option<SourcePosition>,
    pub message: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct PassStmt {
    pub range: SourceRange,
    pub pass_pos: SourcePosition,
}

#[derive(Debug)]
pub struct AssignStmt {
    pub range: SourceRange,
    pub target: Box<Expr>,
    pub op: AssignOp,
    pub op_pos: SourcePosition,
    pub value: Box<Expr>,
}

/// The syntactic-unit catalog of §6.2, plus the `Invalid` recovery
/// placeholder the parser inserts for a skipped span (§7 propagation).
#[derive(Debug)]
pub enum Stmt {
    Invalid(SourceRange),
    Block(BlockStmt),
    Arrow(ArrowStmt),
    If(IfStmt),
    Match(MatchStmt),
    Labeled(LabeledStmt),
    For(ForStmt),
    While(WhileStmt),
    With(WithStmt),
    Try(TryStmt),
    Except(ExceptStmt),
    Finally(FinallyStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Return(ReturnStmt),
    Assert(AssertStmt),
    Pass(PassStmt),
    Assign(AssignStmt),
    Expression(Box<Expr>),
}

impl Stmt {
    pub fn range(&self) -> SourceRange {
        match self {
            Stmt::Invalid(range) => *range,
            Stmt::Block(s) => s.range,
            Stmt::Arrow(s) => s.range,
            Stmt::If(s) => s.range,
            Stmt::Match(s) => s.range,
            Stmt::Labeled(s) => s.range,
            Stmt::For(s) => s.range,
            Stmt::While(s) => s.range,
            Stmt::With(s) => s.range,
            Stmt::Try(s) => s.range,
            Stmt::Except(s) => s.range,
            Stmt::Finally(s) => s.range,
            Stmt::Break(s) => s.range,
            Stmt::Continue(s) => s.range,
            Stmt::Return(s) => s.range,
            Stmt::Assert(s) => s.range,
            Stmt::Pass(s) => s.range,
            Stmt::Assign(s) => s.range,
            Stmt::Expression(e) => e.range(),
        }
    }
}
