use bsc_span::{Identifier, SourcePosition, SourceRange};

use crate::params::Parameters;
use crate::Expr;
use crate::Item;
use crate::OneWrite;
use crate::Stmt;
use crate::SymbolId;

/// `const` / `static` / `var` collected off the token stream by §4.3's
/// access-modifier parsing, plus the position of whichever came first (used
/// for "redundant keyword" / "reversed modifier" diagnostics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFlags {
    pub is_const: bool,
    pub is_static: bool,
    pub is_var: bool,
}

#[derive(Debug)]
pub struct VarDecl {
    pub range: SourceRange,
    pub flags: AccessFlags,
    pub keyword_pos: SourcePosition,
    pub name: Identifier,
    pub eq_pos: Option<SourcePosition>,
    pub initializer: Option<Box<Expr>>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct ImportDecl {
    pub range: SourceRange,
    pub import_pos: SourcePosition,
    pub name: Identifier,
    pub as_pos: Option<SourcePosition>,
    pub alias: Option<Identifier>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct ExportDecl {
    pub range: SourceRange,
    pub export_pos: SourcePosition,
    pub inner: Box<Decl>,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub range: SourceRange,
    pub def_pos: SourcePosition,
    pub name: Identifier,
    pub params: Parameters,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    StaticMethod,
    Operator,
    InplaceOperator,
    Getter,
    Setter,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub range: SourceRange,
    pub def_pos: SourcePosition,
    pub kind: MethodKind,
    pub name: Identifier,
    pub params: Parameters,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct InitDecl {
    pub range: SourceRange,
    pub init_pos: SourcePosition,
    pub params: Parameters,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
    /// Set by the analyzer's initializer-call tracking (§4.4): whether the
    /// body opens with an explicit `self(...)`/`super(...)` call. Absence
    /// is not an error -- the IR generator synthesizes a default
    /// `super.<init>()` when this is `false`.
    pub initializer_call: OneWrite<bool>,
}

#[derive(Debug)]
pub struct DeinitDecl {
    pub range: SourceRange,
    pub deinit_pos: SourcePosition,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct FieldDecl {
    pub range: SourceRange,
    pub flags: AccessFlags,
    pub name: Identifier,
    pub eq_pos: Option<SourcePosition>,
    pub initializer: Option<Box<Expr>>,
    pub symbol: OneWrite<SymbolId>,
}

/// A class's `get p { ... }` / `set p(v) { ... }` pair unify into one
/// `PropertySymbol` during `BuildClassSymbol` (§4.4); each individual
/// accessor still parses into its own `MethodDecl` with `kind` set to
/// `Getter`/`Setter`, wrapped here to keep the class-member list flat.
#[derive(Debug)]
pub enum ClassMember {
    Init(InitDecl),
    Deinit(DeinitDecl),
    Method(MethodDecl),
    Field(FieldDecl),
}

impl ClassMember {
    pub fn range(&self) -> SourceRange {
        match self {
            ClassMember::Init(m) => m.range,
            ClassMember::Deinit(m) => m.range,
            ClassMember::Method(m) => m.range,
            ClassMember::Field(m) => m.range,
        }
    }
}

#[derive(Debug)]
pub struct ClassDecl {
    pub range: SourceRange,
    pub class_pos: SourcePosition,
    pub name: Identifier,
    pub extends_pos: Option<SourcePosition>,
    pub base: Option<Identifier>,
    pub open: SourcePosition,
    pub members: Vec<ClassMember>,
    pub close: SourcePosition,
    pub symbol: OneWrite<SymbolId>,
}

/// `do`/`doFirst`/`doLast` task actions desugar to synthesized methods with
/// the fixed signatures of §4.4: `action(self, inputs, outputs, input,
/// output)`, `actionBefore(self, inputs, outputs)`,
/// `actionAfter(self, inputs, outputs)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Do,
    DoFirst,
    DoLast,
}

#[derive(Debug)]
pub struct TaskActionDecl {
    pub range: SourceRange,
    pub keyword_pos: SourcePosition,
    pub kind: ActionKind,
    pub body: Box<Stmt>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub struct TaskInputsDecl {
    pub range: SourceRange,
    pub inputs_pos: SourcePosition,
    pub pattern: Box<Expr>,
    pub with_pos: Option<SourcePosition>,
    pub resolver: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct TaskOutputsDecl {
    pub range: SourceRange,
    pub outputs_pos: SourcePosition,
    pub pattern: Box<Expr>,
    pub from_pos: Option<SourcePosition>,
    pub source: Option<Box<Expr>>,
}

#[derive(Debug)]
pub struct TaskPropertyDecl {
    pub range: SourceRange,
    pub name: Identifier,
    pub eq_pos: Option<SourcePosition>,
    pub initializer: Option<Box<Expr>>,
    pub symbol: OneWrite<SymbolId>,
}

#[derive(Debug)]
pub enum TaskMember {
    Inputs(TaskInputsDecl),
    Outputs(TaskOutputsDecl),
    Action(TaskActionDecl),
    Property(TaskPropertyDecl),
}

impl TaskMember {
    pub fn range(&self) -> SourceRange {
        match self {
            TaskMember::Inputs(m) => m.range,
            TaskMember::Outputs(m) => m.range,
            TaskMember::Action(m) => m.range,
            TaskMember::Property(m) => m.range,
        }
    }
}

#[derive(Debug)]
pub struct TaskDecl {
    pub range: SourceRange,
    pub task_pos: SourcePosition,
    pub name: Identifier,
    pub extends_pos: Option<SourcePosition>,
    pub base: Option<Identifier>,
    pub depends_on_pos: Option<SourcePosition>,
    pub dependencies: Vec<Identifier>,
    pub open: SourcePosition,
    pub members: Vec<TaskMember>,
    pub close: SourcePosition,
    pub symbol: OneWrite<SymbolId>,
}

/// The AST root (§3.3): always a `ScriptDeclaration`, never nested inside
/// any other node.
#[derive(Debug)]
pub struct ScriptDecl {
    pub range: SourceRange,
    pub body: Vec<Item>,
}

/// The Declaration catalog of §4.3's top level, plus the `Invalid` recovery
/// placeholder.
#[derive(Debug)]
pub enum Decl {
    Invalid(SourceRange),
    Script(ScriptDecl),
    Import(ImportDecl),
    Export(ExportDecl),
    Var(VarDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    Task(TaskDecl),
}

impl Decl {
    pub fn range(&self) -> SourceRange {
        match self {
            Decl::Invalid(r) => *r,
            Decl::Script(d) => d.range,
            Decl::Import(d) => d.range,
            Decl::Export(d) => d.range,
            Decl::Var(d) => d.range,
            Decl::Function(d) => d.range,
            Decl::Class(d) => d.range,
            Decl::Task(d) => d.range,
        }
    }
}
