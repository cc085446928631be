use rustc_hash::FxHashMap;

use bsc_ast::SymbolId;

/// §3.5's lexical scope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalScopeKind {
    Root,
    Block,
    Loop,
    Match,
    Except,
    Finally,
}

/// One lexical scope frame. The analyzer keeps these on a plain stack
/// (`ScopeStack::locals`) rather than a persistent arena with parent
/// pointers: since the walk is a single recursive descent that always pops
/// exactly what it pushed, the stack's contents at any instant already *are*
/// the ancestor chain, so name lookup is "scan the stack from the top".
pub struct LocalFrame {
    pub kind: LocalScopeKind,
    pub depth: u32,
    /// True for the LocalScope that is the root of a DeclScope (`Script`,
    /// `Function`, `Class`, `Method`, `Closure`) -- lookup/break-continue
    /// walks must not cross this boundary outward implicitly; closures cross
    /// it deliberately via capture.
    pub is_root_of_decl_scope: bool,
    /// Number of statements/declarations processed in this scope so far.
    /// `IsFirstNodeOfScope` (used by the initializer-call rule) is
    /// `node_count == 0` at the time of the check, incremented after.
    pub node_count: u32,
    pub names: FxHashMap<String, SymbolId>,
}

impl LocalFrame {
    pub fn new(kind: LocalScopeKind, depth: u32, is_root_of_decl_scope: bool) -> Self {
        LocalFrame { kind, depth, is_root_of_decl_scope, node_count: 0, names: FxHashMap::default() }
    }

    pub fn is_first_node_of_scope(&self) -> bool {
        self.node_count == 0
    }
}

/// §3.5's `DeclScope` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclScopeKind {
    Script,
    Function,
    Class,
    Method,
    Closure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnFlag {
    Invalid,
    Optional,
    MustReturn,
    NeverReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodScopeKind {
    Initializer,
    Deinitializer,
    Method,
    StaticMethod,
    Operator,
    InplaceOperator,
    Getter,
    Setter,
    Action,
}

pub struct DeclFrame {
    pub kind: DeclScopeKind,
    pub can_import: bool,
    pub can_export: bool,
    pub in_instance: bool,
    pub can_return: bool,
    pub return_flag: ReturnFlag,
    pub method_kind: Option<MethodScopeKind>,
    pub initializer_call_seen: bool,
    /// Ordered, duplicate-free set of `BoundedLocalSymbol` wrapper ids built
    /// by closure-capture discovery, in first-capture order; only populated
    /// for `DeclScopeKind::Closure`. `IrGenerator::gen_closure` binds each to
    /// a fresh register in the closure's own builder and reads `captures`
    /// keyed by each wrapper's `inner` in the enclosing builder.
    pub bounded_locals: Vec<SymbolId>,
    /// Captured-original → wrapper map, so a second reference to the same
    /// outer local inside one closure reuses the wrapper already allocated
    /// instead of minting a new one.
    pub captures: FxHashMap<SymbolId, SymbolId>,
}

impl DeclFrame {
    pub fn script() -> Self {
        DeclFrame {
            kind: DeclScopeKind::Script,
            can_import: true,
            can_export: true,
            in_instance: false,
            can_return: true,
            return_flag: ReturnFlag::NeverReturn,
            method_kind: None,
            initializer_call_seen: false,
            bounded_locals: Vec::new(),
            captures: FxHashMap::default(),
        }
    }

    pub fn function() -> Self {
        DeclFrame {
            kind: DeclScopeKind::Function,
            can_import: false,
            can_export: false,
            in_instance: false,
            can_return: true,
            return_flag: ReturnFlag::Optional,
            method_kind: None,
            initializer_call_seen: false,
            bounded_locals: Vec::new(),
            captures: FxHashMap::default(),
        }
    }

    pub fn class() -> Self {
        DeclFrame {
            kind: DeclScopeKind::Class,
            can_import: false,
            can_export: false,
            in_instance: false,
            can_return: false,
            return_flag: ReturnFlag::Invalid,
            method_kind: None,
            initializer_call_seen: false,
            bounded_locals: Vec::new(),
            captures: FxHashMap::default(),
        }
    }

    pub fn method(kind: MethodScopeKind) -> Self {
        let return_flag = match kind {
            MethodScopeKind::Getter => ReturnFlag::MustReturn,
            MethodScopeKind::Initializer | MethodScopeKind::Deinitializer | MethodScopeKind::Setter | MethodScopeKind::Action => ReturnFlag::NeverReturn,
            _ => ReturnFlag::Optional,
        };
        DeclFrame {
            kind: DeclScopeKind::Method,
            can_import: false,
            can_export: false,
            in_instance: !matches!(kind, MethodScopeKind::StaticMethod),
            can_return: true,
            return_flag,
            method_kind: Some(kind),
            initializer_call_seen: false,
            bounded_locals: Vec::new(),
            captures: FxHashMap::default(),
        }
    }

    pub fn closure(in_instance: bool) -> Self {
        DeclFrame {
            kind: DeclScopeKind::Closure,
            can_import: false,
            can_export: false,
            in_instance,
            can_return: true,
            return_flag: ReturnFlag::Optional,
            method_kind: None,
            initializer_call_seen: false,
            bounded_locals: Vec::new(),
            captures: FxHashMap::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakContinueCheck {
    Ok,
    Finally,
    None,
}

/// The analyzer's scope stacks. `locals` is shared across every DeclScope
/// (so a closure can see past its own DeclScope boundary for capture
/// discovery); `decls` tracks the nested function/method/class/closure
/// scopes and their capability flags (§3.5).
#[derive(Default)]
pub struct ScopeStack {
    locals: Vec<LocalFrame>,
    decls: Vec<DeclFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    pub fn push_local(&mut self, kind: LocalScopeKind, is_root_of_decl_scope: bool) {
        let depth = self.locals.last().map(|f| f.depth + 1).unwrap_or(0);
        self.locals.push(LocalFrame::new(kind, depth, is_root_of_decl_scope));
    }

    pub fn pop_local(&mut self) -> LocalFrame {
        self.locals.pop().expect("scope stack underflow: pop_local without matching push_local")
    }

    pub fn push_decl(&mut self, frame: DeclFrame) {
        self.decls.push(frame);
    }

    pub fn pop_decl(&mut self) -> DeclFrame {
        self.decls.pop().expect("scope stack underflow: pop_decl without matching push_decl")
    }

    pub fn current_local(&self) -> &LocalFrame {
        self.locals.last().expect("no active local scope")
    }

    pub fn current_local_mut(&mut self) -> &mut LocalFrame {
        self.locals.last_mut().expect("no active local scope")
    }

    pub fn current_decl(&self) -> &DeclFrame {
        self.decls.last().expect("no active decl scope")
    }

    pub fn current_decl_mut(&mut self) -> &mut DeclFrame {
        self.decls.last_mut().expect("no active decl scope")
    }

    pub fn locals_len(&self) -> usize {
        self.locals.len()
    }

    /// Walk the local-scope stack upward (innermost first) looking for
    /// `name`. Returns the resolved symbol and the stack index of the frame
    /// that declares it -- closure-capture discovery compares that index
    /// against the closure's own root-scope index.
    pub fn lookup(&self, name: &str) -> Option<(SymbolId, usize)> {
        for (index, frame) in self.locals.iter().enumerate().rev() {
            if let Some(&id) = frame.names.get(name) {
                return Some((id, index));
            }
        }
        None
    }

    /// Index of the innermost local frame marked as the root of the current
    /// DeclScope (used both for closure-capture comparisons and for
    /// bounding break/continue/lookup walks at a DeclScope boundary... the
    /// walk itself still does not cross it implicitly).
    pub fn current_decl_root_index(&self) -> usize {
        self.locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, frame)| frame.is_root_of_decl_scope)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }

    pub fn declare(&mut self, name: impl Into<String>, id: SymbolId) {
        self.current_local_mut().names.insert(name.into(), id);
    }

    pub fn find_in_current_local(&self, name: &str) -> Option<SymbolId> {
        self.current_local().names.get(name).copied()
    }

    /// §3.5: `canReturn() = declScope.canReturn && !inFinally()`.
    pub fn can_return(&self) -> bool {
        self.current_decl().can_return && !self.in_finally()
    }

    pub fn in_finally(&self) -> bool {
        let boundary = self.current_decl_root_index();
        self.locals[boundary..].iter().any(|f| f.kind == LocalScopeKind::Finally)
    }

    /// §3.5: walk ancestors until a Loop or Match is found, stopping at a
    /// Finally (where break/continue are forbidden), never crossing the
    /// current DeclScope's root.
    pub fn check_break_or_continue(&self) -> BreakContinueCheck {
        let boundary = self.current_decl_root_index();
        for frame in self.locals[boundary..].iter().rev() {
            match frame.kind {
                LocalScopeKind::Finally => return BreakContinueCheck::Finally,
                LocalScopeKind::Loop | LocalScopeKind::Match => return BreakContinueCheck::Ok,
                _ => {}
            }
        }
        BreakContinueCheck::None
    }
}
