use bsc_span::{Identifier, SourcePosition, SourceRange};

use crate::params::Parameters;
use crate::OneWrite;
use crate::Stmt;
use crate::SymbolId;

/// The scalar literal kinds §4.4's case-label evaluation recognizes plus
/// `None`; interpolated strings are a separate `Interpolated` variant since
/// they are never a usable case value.
#[derive(Debug)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Non-interpolated string; holds the fully-unescaped text.
    String(String),
    /// A string with one or more `$id`/`${ ... }` placeholders: `template`
    /// is the `{N}`-marker image the lexer produced, `parts` the re-parsed
    /// interpolation expressions in slot order.
    Interpolated { template: String, parts: Vec<Expr> },
    None,
}

#[derive(Debug)]
pub struct LiteralExpr {
    pub range: SourceRange,
    pub value: Literal,
}

#[derive(Debug)]
pub struct VariableExpr {
    pub range: SourceRange,
    pub name: Identifier,
    /// Resolved by the semantic analyzer; may be rewritten to a
    /// `BoundedLocalSymbol` wrapper on closure-capture discovery (§4.4).
    pub symbol: OneWrite<SymbolId>,
}

/// `symbol` resolves to the owning class/task; also subject to the
/// bounded-local rewrite when read inside a closure (§4.4).
#[derive(Debug)]
pub struct SelfExpr {
    pub range: SourceRange,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct SuperExpr {
    pub range: SourceRange,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Less,
    LessOrEqual,
    Grater,
    GraterOrEqual,
    Equal,
    NotEqual,
}

#[derive(Debug)]
pub struct BinaryExpr {
    pub range: SourceRange,
    pub op: BinaryOp,
    pub op_pos: SourcePosition,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    Not,
}

#[derive(Debug)]
pub struct UnaryExpr {
    pub range: SourceRange,
    pub op: UnaryOp,
    pub op_pos: SourcePosition,
    pub operand: Box<Expr>,
}

/// `a and b` / `a or b` -- kept distinct from `BinaryExpr` because both
/// short-circuit into control flow rather than a single IR op (§4.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug)]
pub struct LogicExpr {
    pub range: SourceRange,
    pub op: LogicOp,
    pub op_pos: SourcePosition,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

/// `defined id [in postfix]` -- tests whether a name is declared, optionally
/// scoped to a container expression.
#[derive(Debug)]
pub struct DefinedExpr {
    pub range: SourceRange,
    pub defined_pos: SourcePosition,
    pub name: Identifier,
    pub in_pos: Option<SourcePosition>,
    pub container: Option<Box<Expr>>,
}

/// `raise postfix` used as an expression (§4.3 unary precedence level).
#[derive(Debug)]
pub struct RaiseExpr {
    pub range: SourceRange,
    pub raise_pos: SourcePosition,
    pub value: Box<Expr>,
}

/// `expr is [not] Type` -- a dedicated node, not a `BinaryExpr`, because the
/// right-hand side is a type name rather than a value expression and the
/// symbol of that name is a one-write field resolved by the analyzer.
#[derive(Debug)]
pub struct TypeTestExpr {
    pub range: SourceRange,
    pub is_pos: SourcePosition,
    pub not_pos: Option<SourcePosition>,
    pub value: Box<Expr>,
    pub type_name: Identifier,
    pub symbol: OneWrite<SymbolId>,
}

/// `[not] in postfix` -- a dedicated node. Per §9's open question, the IR
/// generator reads `target` (the container, i.e. `postfix`) and `value` (the
/// tested element) but must emit them to `IRTestOp` as `(target, value)`.
#[derive(Debug)]
pub struct ContainmentTestExpr {
    pub range: SourceRange,
    pub in_pos: SourcePosition,
    pub not_pos: Option<SourcePosition>,
    pub value: Box<Expr>,
    pub target: Box<Expr>,
}

impl ContainmentTestExpr {
    pub fn is_negated(&self) -> bool {
        self.not_pos.is_some()
    }
}

/// `expr1 if cond else expr2`, right-associative.
#[derive(Debug)]
pub struct TernaryExpr {
    pub range: SourceRange,
    pub then_value: Box<Expr>,
    pub if_pos: SourcePosition,
    pub condition: Box<Expr>,
    pub else_pos: SourcePosition,
    pub else_value: Box<Expr>,
}

#[derive(Debug)]
pub struct MemberAccessExpr {
    pub range: SourceRange,
    pub target: Box<Expr>,
    pub dot_pos: SourcePosition,
    pub member: Identifier,
}

#[derive(Debug)]
pub struct SubscriptExpr {
    pub range: SourceRange,
    pub target: Box<Expr>,
    pub open: SourcePosition,
    pub index: Box<Expr>,
    pub close: SourcePosition,
}

#[derive(Debug)]
pub struct InvokeExpr {
    pub range: SourceRange,
    pub callee: Box<Expr>,
    pub open: SourcePosition,
    pub args: Vec<Expr>,
    pub commas: Vec<SourcePosition>,
    pub close: SourcePosition,
}

/// `(a, b) => { ... }` / `() => expr`. `bounded_locals` is the one-write
/// capture set the analyzer fills in on closure-capture discovery.
#[derive(Debug)]
pub struct ClosureExpr {
    pub range: SourceRange,
    pub params: Parameters,
    pub arrow: SourcePosition,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
    pub bounded_locals: OneWrite<Vec<SymbolId>>,
}

#[derive(Debug)]
pub struct ListItem {
    pub value: Expr,
    /// `...expr` spread inside a list literal.
    pub spread: Option<SourcePosition>,
}

#[derive(Debug)]
pub struct MakeListExpr {
    pub range: SourceRange,
    pub open: SourcePosition,
    pub items: Vec<ListItem>,
    pub close: SourcePosition,
}

#[derive(Debug)]
pub struct MapEntry {
    pub key: Expr,
    pub colon: SourcePosition,
    pub value: Expr,
}

#[derive(Debug)]
pub struct MakeMapExpr {
    pub range: SourceRange,
    pub open: SourcePosition,
    pub entries: Vec<MapEntry>,
    pub close: SourcePosition,
}

#[derive(Debug)]
pub enum Expr {
    Invalid(SourceRange),
    Literal(LiteralExpr),
    Variable(VariableExpr),
    SelfExpr(SelfExpr),
    Super(SuperExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Logic(LogicExpr),
    Defined(DefinedExpr),
    Raise(RaiseExpr),
    TypeTest(TypeTestExpr),
    ContainmentTest(ContainmentTestExpr),
    Ternary(TernaryExpr),
    MemberAccess(MemberAccessExpr),
    Subscript(SubscriptExpr),
    Invoke(InvokeExpr),
    Closure(ClosureExpr),
    MakeList(MakeListExpr),
    MakeMap(MakeMapExpr),
}

impl Expr {
    pub fn range(&self) -> SourceRange {
        match self {
            Expr::Invalid(r) => *r,
            Expr::Literal(e) => e.range,
            Expr::Variable(e) => e.range,
            Expr::SelfExpr(e) => e.range,
            Expr::Super(e) => e.range,
            Expr::Binary(e) => e.range,
            Expr::Unary(e) => e.range,
            Expr::Logic(e) => e.range,
            Expr::Defined(e) => e.range,
            Expr::Raise(e) => e.range,
            Expr::TypeTest(e) => e.range,
            Expr::ContainmentTest(e) => e.range,
            Expr::Ternary(e) => e.range,
            Expr::MemberAccess(e) => e.range,
            Expr::Subscript(e) => e.range,
            Expr::Invoke(e) => e.range,
            Expr::Closure(e) => e.range,
            Expr::MakeList(e) => e.range,
            Expr::MakeMap(e) => e.range,
        }
    }

    /// `self(args)` / `super(args)` detection used by the analyzer's
    /// initializer-call tracking (§4.4) and the IR generator's
    /// `self(...)`/`super(...)` desugaring (§4.5.2).
    pub fn as_initializer_call(&self) -> Option<(&InvokeExpr, bool)> {
        match self {
            Expr::Invoke(call) => match call.callee.as_ref() {
                Expr::SelfExpr(_) => Some((call, false)),
                Expr::Super(_) => Some((call, true)),
                _ => None,
            },
            _ => None,
        }
    }
}
