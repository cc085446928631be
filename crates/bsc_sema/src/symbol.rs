use rustc_hash::FxHashMap;

use bsc_ast::SymbolId;
use bsc_span::SourcePosition;

/// §3.4's `Variable` per-kind attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Global,
    Local,
    Exported,
    Parameter,
    Except,
    Implicit,
}

impl VariableKind {
    /// Whether closure-capture discovery treats a symbol of this kind as a
    /// capturable local (§4.4): `Global`/`Exported` are reachable without
    /// capture.
    pub fn is_capturable_local(self) -> bool {
        matches!(self, VariableKind::Local | VariableKind::Parameter | VariableKind::Except | VariableKind::Implicit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFlag {
    Const,
    Static,
}

#[derive(Debug)]
pub struct VariableSymbol {
    pub kind: VariableKind,
    pub readonly: bool,
    pub initialized: bool,
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub argc: usize,
    pub vararg: bool,
}

#[derive(Debug)]
pub struct MethodSymbol {
    pub argc: usize,
    pub vararg: bool,
    pub is_static: bool,
    pub owner: SymbolId,
}

#[derive(Debug)]
pub struct FieldSymbol {
    pub owner: SymbolId,
    pub access: AccessFlag,
    pub initialized: bool,
}

#[derive(Debug, Default)]
pub struct PropertySymbol {
    pub owner: Option<SymbolId>,
    pub getter: Option<SymbolId>,
    pub setter: Option<SymbolId>,
}

impl PropertySymbol {
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

/// Owns its members by mangled name (§3.4) so overloaded methods coexist.
#[derive(Debug, Default)]
pub struct ClassSymbol {
    pub base: Option<SymbolId>,
    pub members: FxHashMap<String, SymbolId>,
}

#[derive(Debug, Default)]
pub struct TaskSymbol {
    pub base: Option<SymbolId>,
    pub members: FxHashMap<String, SymbolId>,
    pub has_inputs: bool,
    pub has_outputs: bool,
}

#[derive(Debug)]
pub struct ClosureSymbol {
    pub ordinal: u32,
}

/// A local of an enclosing scope captured by a closure (§4.4): a distinct
/// `SymbolId` from `inner` (the captured variable or `self`/`super` owner)
/// so the IR builder can tell a captured read apart from an ordinary global
/// load of the same name and bind it to the closure's own captured-register
/// slot instead.
#[derive(Debug)]
pub struct BoundedLocalSymbol {
    pub inner: SymbolId,
}

#[derive(Debug)]
pub enum SymbolKind {
    Undeclared,
    Variable(VariableSymbol),
    Function(FunctionSymbol),
    Class(ClassSymbol),
    Task(TaskSymbol),
    Field(FieldSymbol),
    Method(MethodSymbol),
    Property(PropertySymbol),
    Closure(ClosureSymbol),
    BoundedLocal(BoundedLocalSymbol),
}

impl SymbolKind {
    pub fn is_undeclared(&self) -> bool {
        matches!(self, SymbolKind::Undeclared)
    }
}

#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub position: SourcePosition,
    pub kind: SymbolKind,
}

/// Flat arena of every symbol created during analysis, keyed by the opaque
/// `SymbolId` the AST's one-write fields hold (§3.4's "allocate symbols in
/// an arena, key by arena index" design note).
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn alloc(&mut self, name: impl Into<String>, position: SourcePosition, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol { name: name.into(), position, kind });
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// `simple_name + "$" + argc + ("+" if vararg)` (§3.4).
pub fn mangle(name: &str, argc: usize, vararg: bool) -> String {
    if vararg {
        format!("{}${}+", name, argc)
    } else {
        format!("{}${}", name, argc)
    }
}

/// Methods prepend `owner_name + "."` to the mangled simple name; fields
/// and properties (no argc) just prepend the owner (§3.4).
pub fn mangle_member(owner_name: &str, name: &str) -> String {
    format!("{}.{}", owner_name, name)
}
