use bsc_ast::*;
use bsc_errors::{ErrorCode, Handler};
use bsc_span::{Identifier, SourcePosition};

use crate::scope::{BreakContinueCheck, DeclFrame, DeclScopeKind, LocalScopeKind, MethodScopeKind, ReturnFlag, ScopeStack};
use crate::symbol::{
    mangle, AccessFlag, BoundedLocalSymbol, ClosureSymbol, FieldSymbol, FunctionSymbol, MethodSymbol, PropertySymbol, SymbolKind, SymbolTable, TaskSymbol, VariableKind, VariableSymbol,
};

const TASK_RESERVED_NAMES: &[&str] = &["inputs", "input", "outputs", "output", "action", "actionBefore", "actionAfter"];

/// AST walker implementing §4.4: creates/resolves symbols, enforces
/// declaration/use rules, records closure captures, pre-evaluates `case`
/// label constants. Holds the symbol arena being built plus the lexical/decl
/// scope stacks; the AST itself is only ever read through shared references
/// -- every mutation the analyzer makes lands in a `OneWrite` slot.
pub struct SemanticAnalyzer<'h> {
    symbols: SymbolTable,
    scopes: ScopeStack,
    handler: &'h Handler,
    closure_ordinal: u32,
    /// `(class/task symbol, base symbol)` for the innermost class/task whose
    /// member bodies are currently being walked -- used to resolve
    /// `self`/`super`.
    current_owner: Vec<(SymbolId, Option<SymbolId>)>,
}

impl<'h> SemanticAnalyzer<'h> {
    pub fn new(handler: &'h Handler) -> Self {
        SemanticAnalyzer { symbols: SymbolTable::new(), scopes: ScopeStack::new(), handler, closure_ordinal: 0, current_owner: Vec::new() }
    }

    pub fn analyze(mut self, script: &ScriptDecl) -> SymbolTable {
        self.scopes.push_decl(DeclFrame::script());
        self.scopes.push_local(LocalScopeKind::Root, true);
        self.walk_items(&script.body, true);
        self.scopes.pop_local();
        self.scopes.pop_decl();
        self.symbols
    }

    // ----- symbol creation -----

    /// §4.4 `CreateLocalSymbol`/`CreateGlobalSymbol`: both add to the
    /// *current* LocalScope -- the caller is responsible for having entered
    /// the ScriptScope's root before calling this for a global.
    fn create_local_symbol(&mut self, name: &Identifier, kind: SymbolKind) -> SymbolId {
        if let Some(prev) = self.scopes.find_in_current_local(name.as_str()) {
            let prev_pos = self.symbols.get(prev).position;
            self.handler
                .error(ErrorCode::Redefinition, name.range.begin, format!("redefinition of `{}`", name.as_str()))
                .reference(prev_pos, "previous definition is here");
        }
        let id = self.symbols.alloc(name.as_str(), name.range.begin, kind);
        self.scopes.declare(name.as_str(), id);
        id
    }

    fn declare_class_member(&mut self, owner: SymbolId, key: String, name_pos: SourcePosition, name: &str, kind: SymbolKind) -> SymbolId {
        let prev = self.owner_members(owner).get(&key).copied();
        if let Some(prev_id) = prev {
            let prev_pos = self.symbols.get(prev_id).position;
            self.handler
                .error(ErrorCode::Redefinition, name_pos, format!("redefinition of `{}`", name))
                .reference(prev_pos, "previous definition is here");
        }
        let id = self.symbols.alloc(name, name_pos, kind);
        self.owner_members_mut(owner).insert(key, id);
        id
    }

    fn declare_or_get_property(&mut self, owner: SymbolId, key: &str, name_pos: SourcePosition, name: &str) -> SymbolId {
        if let Some(&id) = self.owner_members(owner).get(key) {
            return id;
        }
        let id = self.symbols.alloc(name, name_pos, SymbolKind::Property(PropertySymbol { owner: Some(owner), getter: None, setter: None }));
        self.owner_members_mut(owner).insert(key.to_string(), id);
        id
    }

    fn owner_members(&self, owner: SymbolId) -> &rustc_hash::FxHashMap<String, SymbolId> {
        match &self.symbols.get(owner).kind {
            SymbolKind::Class(c) => &c.members,
            SymbolKind::Task(t) => &t.members,
            _ => unreachable!("owner symbol is neither a class nor a task"),
        }
    }

    fn owner_members_mut(&mut self, owner: SymbolId) -> &mut rustc_hash::FxHashMap<String, SymbolId> {
        match &mut self.symbols.get_mut(owner).kind {
            SymbolKind::Class(c) => &mut c.members,
            SymbolKind::Task(t) => &mut t.members,
            _ => unreachable!("owner symbol is neither a class nor a task"),
        }
    }

    // ----- reference resolution -----

    /// §4.4 "undeclared references become `UndeclaredSymbol` placeholders".
    /// Also implements closure-capture discovery: a resolved local found
    /// outside the innermost active closure's root scope is rewritten to a
    /// `BoundedLocalSymbol` wrapper and added to that closure's bounded-locals
    /// set.
    fn resolve_reference(&mut self, name: &Identifier) -> SymbolId {
        match self.scopes.lookup(name.as_str()) {
            Some((id, frame_index)) => self.maybe_capture(id, frame_index),
            None => {
                self.handler.error(ErrorCode::UsedBeforeDeclared, name.range.begin, format!("use of undeclared name `{}`", name.as_str()));
                self.symbols.alloc(name.as_str(), name.range.begin, SymbolKind::Undeclared)
            }
        }
    }

    /// Returns `id` unchanged unless it must be captured: the current
    /// DeclScope is a closure, `id` was found outside the closure's root
    /// scope, and it names a capturable local (Local/Parameter/Except/
    /// Implicit). In that case it returns the closure's wrapper symbol for
    /// `id` instead (§4.4), allocating one on first capture.
    fn maybe_capture(&mut self, id: SymbolId, frame_index: usize) -> SymbolId {
        if !matches!(self.scopes.current_decl().kind, DeclScopeKind::Closure) {
            return id;
        }
        let root_index = self.scopes.current_decl_root_index();
        if frame_index >= root_index {
            return id;
        }
        let capturable = matches!(&self.symbols.get(id).kind, SymbolKind::Variable(v) if v.kind.is_capturable_local());
        if !capturable {
            return id;
        }
        self.wrap_capture(id)
    }

    /// Allocates (or reuses) the `BoundedLocalSymbol` wrapper for `inner` in
    /// the innermost closure frame, recording it in that frame's
    /// bounded-locals set.
    fn wrap_capture(&mut self, inner: SymbolId) -> SymbolId {
        if let Some(&wrapper) = self.scopes.current_decl().captures.get(&inner) {
            return wrapper;
        }
        let symbol = self.symbols.get(inner);
        let name = symbol.name.clone();
        let pos = symbol.position;
        let wrapper = self.symbols.alloc(name, pos, SymbolKind::BoundedLocal(BoundedLocalSymbol { inner }));
        let frame = self.scopes.current_decl_mut();
        frame.captures.insert(inner, wrapper);
        frame.bounded_locals.push(wrapper);
        wrapper
    }

    fn resolve_self(&mut self, pos: SourcePosition) -> SymbolId {
        if let Some(&(owner, _)) = self.current_owner.last() {
            self.maybe_capture_owner(owner)
        } else {
            self.handler.error(ErrorCode::UsedBeforeDeclared, pos, "`self` used outside an instance context");
            self.symbols.alloc("self", pos, SymbolKind::Undeclared)
        }
    }

    fn resolve_super(&mut self, pos: SourcePosition) -> SymbolId {
        match self.current_owner.last() {
            Some(&(_, Some(base))) => self.maybe_capture_owner(base),
            _ => {
                self.handler.error(ErrorCode::UsedBeforeDeclared, pos, "`super` used without a base class");
                self.symbols.alloc("super", pos, SymbolKind::Undeclared)
            }
        }
    }

    /// "Class members implicitly cause `self` to be bound too" (§4.4).
    fn maybe_capture_owner(&mut self, owner: SymbolId) -> SymbolId {
        if matches!(self.scopes.current_decl().kind, DeclScopeKind::Closure) {
            return self.wrap_capture(owner);
        }
        owner
    }

    // ----- items / declarations -----

    fn walk_items(&mut self, items: &[Item], top_level: bool) {
        for item in items {
            self.walk_item(item, top_level);
            self.scopes.current_local_mut().node_count += 1;
        }
    }

    fn walk_block_items(&mut self, stmt: &Stmt) {
        if let Stmt::Block(b) = stmt {
            self.walk_items(&b.body, false);
        }
    }

    fn walk_item(&mut self, item: &Item, top_level: bool) {
        match item {
            Item::Decl(d) => self.walk_decl(d, top_level),
            Item::Stmt(s) => self.walk_stmt(s),
        }
    }

    fn walk_decl(&mut self, decl: &Decl, top_level: bool) {
        match decl {
            Decl::Invalid(_) => {}
            Decl::Script(_) => unreachable!("ScriptDeclaration is only ever the AST root"),
            Decl::Import(d) => self.walk_import(d),
            Decl::Export(d) => self.walk_export(d),
            Decl::Var(d) => self.walk_var_decl(d, top_level, false),
            Decl::Function(d) => self.walk_function_decl(d),
            Decl::Class(d) => self.walk_class_decl(d),
            Decl::Task(d) => self.walk_task_decl(d),
        }
    }

    fn walk_import(&mut self, d: &ImportDecl) {
        if !self.scopes.current_decl().can_import {
            self.handler.error(ErrorCode::CannotImportHere, d.import_pos, "`import` is only valid at script scope");
        }
        let local_name = d.alias.as_ref().unwrap_or(&d.name);
        let id = self.create_local_symbol(local_name, SymbolKind::Variable(VariableSymbol { kind: VariableKind::Global, readonly: true, initialized: true }));
        d.symbol.set(id);
    }

    fn walk_export(&mut self, d: &ExportDecl) {
        if !self.scopes.current_decl().can_export {
            self.handler.error(ErrorCode::CannotExportHere, d.export_pos, "`export` is only valid at script scope");
        }
        match d.inner.as_ref() {
            Decl::Var(v) => self.walk_var_decl(v, true, true),
            other => self.walk_decl(other, true),
        }
    }

    fn walk_var_decl(&mut self, d: &VarDecl, top_level: bool, exported: bool) {
        if let Some(init) = &d.initializer {
            self.walk_expr(init);
        }
        let kind = if exported {
            VariableKind::Exported
        } else if top_level {
            VariableKind::Global
        } else {
            VariableKind::Local
        };
        let id = self.create_local_symbol(&d.name, SymbolKind::Variable(VariableSymbol { kind, readonly: d.flags.is_const, initialized: d.initializer.is_some() }));
        d.symbol.set(id);
    }

    fn declare_params(&mut self, params: &Parameters) {
        for p in &params.params {
            let id = self.create_local_symbol(&p.name, SymbolKind::Variable(VariableSymbol { kind: VariableKind::Parameter, readonly: false, initialized: true }));
            p.symbol.set(id);
        }
    }

    fn walk_function_decl(&mut self, d: &FunctionDecl) {
        let id = self.create_local_symbol(&d.name, SymbolKind::Function(FunctionSymbol { argc: d.params.argc(), vararg: d.params.is_vararg() }));
        d.symbol.set(id);

        self.scopes.push_decl(DeclFrame::function());
        self.scopes.push_local(LocalScopeKind::Root, true);
        self.declare_params(&d.params);
        self.walk_block_items(&d.body);
        self.scopes.pop_local();
        self.scopes.pop_decl();
    }

    // ----- classes -----

    fn walk_class_decl(&mut self, d: &ClassDecl) {
        let base_id = self.resolve_base(d.base.as_ref(), &d.name, d.extends_pos);
        let class_id = self.create_local_symbol(&d.name, SymbolKind::Class(bsc_sema_class_symbol(base_id)));
        d.symbol.set(class_id);

        for member in &d.members {
            self.predeclare_class_member(class_id, member);
        }

        self.current_owner.push((class_id, base_id));
        self.scopes.push_decl(DeclFrame::class());
        for member in &d.members {
            self.walk_class_member_body(member);
        }
        self.scopes.pop_decl();
        self.current_owner.pop();
    }

    fn resolve_base(&mut self, base: Option<&Identifier>, name: &Identifier, extends_pos: Option<SourcePosition>) -> Option<SymbolId> {
        let base = base?;
        if base.as_str() == name.as_str() {
            self.handler.error(ErrorCode::SelfExtendsSelf, extends_pos.unwrap_or(name.range.begin), "a class/task cannot extend itself");
        }
        match self.scopes.lookup(base.as_str()) {
            Some((id, _)) => Some(id),
            None => {
                self.handler.error(ErrorCode::UsedBeforeDeclared, base.range.begin, format!("use of undeclared base `{}`", base.as_str()));
                None
            }
        }
    }

    fn predeclare_class_member(&mut self, class_id: SymbolId, member: &ClassMember) {
        match member {
            ClassMember::Field(f) => {
                let access = if f.flags.is_const { AccessFlag::Const } else { AccessFlag::Static };
                let key = f.name.as_str().to_string();
                let id = self.declare_class_member(
                    class_id,
                    key,
                    f.name.range.begin,
                    f.name.as_str(),
                    SymbolKind::Field(FieldSymbol { owner: class_id, access, initialized: f.initializer.is_some() }),
                );
                f.symbol.set(id);
            }
            ClassMember::Init(i) => {
                let key = mangle("<init>", i.params.argc(), i.params.is_vararg());
                let id = self.declare_class_member(
                    class_id,
                    key,
                    i.init_pos,
                    "<init>",
                    SymbolKind::Method(MethodSymbol { argc: i.params.argc(), vararg: i.params.is_vararg(), is_static: false, owner: class_id }),
                );
                i.symbol.set(id);
            }
            ClassMember::Deinit(de) => {
                let id = self.declare_class_member(
                    class_id,
                    "<deinit>".to_string(),
                    de.deinit_pos,
                    "<deinit>",
                    SymbolKind::Method(MethodSymbol { argc: 0, vararg: false, is_static: false, owner: class_id }),
                );
                de.symbol.set(id);
            }
            ClassMember::Method(m) => self.predeclare_method(class_id, m),
        }
    }

    fn predeclare_method(&mut self, class_id: SymbolId, m: &MethodDecl) {
        match m.kind {
            MethodKind::Getter | MethodKind::Setter => {
                let key = m.name.as_str().to_string();
                let prop_id = self.declare_or_get_property(class_id, &key, m.name.range.begin, m.name.as_str());
                let method_id = self.symbols.alloc(
                    m.name.as_str(),
                    m.name.range.begin,
                    SymbolKind::Method(MethodSymbol { argc: m.params.argc(), vararg: m.params.is_vararg(), is_static: false, owner: class_id }),
                );
                m.symbol.set(method_id);
                let is_getter = m.kind == MethodKind::Getter;
                if let SymbolKind::Property(p) = &mut self.symbols.get_mut(prop_id).kind {
                    let slot = if is_getter { &mut p.getter } else { &mut p.setter };
                    if slot.is_some() {
                        self.handler.error(
                            ErrorCode::Redefinition,
                            m.name.range.begin,
                            format!("duplicate {} for property `{}`", if is_getter { "getter" } else { "setter" }, m.name.as_str()),
                        );
                    } else {
                        *slot = Some(method_id);
                    }
                }
            }
            MethodKind::Operator | MethodKind::InplaceOperator => {
                if m.params.is_vararg() {
                    self.handler.error(ErrorCode::OperatorCannotBeVariadic, m.def_pos, "an operator method cannot be variadic");
                } else if m.params.argc() != 1 {
                    self.handler.error(ErrorCode::OperatorArgumentCountMismatch, m.def_pos, "an operator method takes exactly one parameter");
                }
                let key = mangle(m.name.as_str(), m.params.argc(), m.params.is_vararg());
                let id = self.declare_class_member(
                    class_id,
                    key,
                    m.name.range.begin,
                    m.name.as_str(),
                    SymbolKind::Method(MethodSymbol { argc: m.params.argc(), vararg: m.params.is_vararg(), is_static: false, owner: class_id }),
                );
                m.symbol.set(id);
            }
            MethodKind::Method | MethodKind::StaticMethod => {
                let key = mangle(m.name.as_str(), m.params.argc(), m.params.is_vararg());
                let id = self.declare_class_member(
                    class_id,
                    key,
                    m.name.range.begin,
                    m.name.as_str(),
                    SymbolKind::Method(MethodSymbol { argc: m.params.argc(), vararg: m.params.is_vararg(), is_static: m.kind == MethodKind::StaticMethod, owner: class_id }),
                );
                m.symbol.set(id);
            }
        }
    }

    fn walk_class_member_body(&mut self, member: &ClassMember) {
        match member {
            ClassMember::Field(f) => {
                if let Some(init) = &f.initializer {
                    self.walk_expr(init);
                }
            }
            ClassMember::Init(i) => self.walk_init_body(i),
            ClassMember::Deinit(de) => {
                self.scopes.push_decl(DeclFrame::method(MethodScopeKind::Deinitializer));
                self.scopes.push_local(LocalScopeKind::Root, true);
                self.walk_block_items(&de.body);
                self.scopes.pop_local();
                self.scopes.pop_decl();
            }
            ClassMember::Method(m) => {
                let kind = match m.kind {
                    MethodKind::Method => MethodScopeKind::Method,
                    MethodKind::StaticMethod => MethodScopeKind::StaticMethod,
                    MethodKind::Operator => MethodScopeKind::Operator,
                    MethodKind::InplaceOperator => MethodScopeKind::InplaceOperator,
                    MethodKind::Getter => MethodScopeKind::Getter,
                    MethodKind::Setter => MethodScopeKind::Setter,
                };
                self.scopes.push_decl(DeclFrame::method(kind));
                self.scopes.push_local(LocalScopeKind::Root, true);
                self.declare_params(&m.params);
                self.walk_block_items(&m.body);
                self.scopes.pop_local();
                self.scopes.pop_decl();
            }
        }
    }

    /// §4.4 initializer-call tracking, matching scenario 6 of §8 exactly: a
    /// diagnostic fires only when `self(...)`/`super(...)` appears after
    /// another statement; a well-placed one is silently recorded, and
    /// absence is not an error (the IR generator synthesizes the default).
    fn walk_init_body(&mut self, i: &InitDecl) {
        self.scopes.push_decl(DeclFrame::method(MethodScopeKind::Initializer));
        self.scopes.push_local(LocalScopeKind::Root, true);
        self.declare_params(&i.params);

        let items: &[Item] = match i.body.as_ref() {
            Stmt::Block(b) => &b.body,
            _ => &[],
        };
        for (index, item) in items.iter().enumerate() {
            if let Item::Stmt(Stmt::Expression(e)) = item {
                if e.as_initializer_call().is_some() && index != 0 {
                    self.handler.error(ErrorCode::InvalidInitializerCall, e.range().begin, "a `self(...)`/`super(...)` call must be the first statement of an initializer");
                }
            }
            self.walk_item(item, false);
            self.scopes.current_local_mut().node_count += 1;
        }
        let call_seen = matches!(items.first(), Some(Item::Stmt(Stmt::Expression(e))) if e.as_initializer_call().is_some());
        i.initializer_call.set(call_seen);

        self.scopes.pop_local();
        self.scopes.pop_decl();
    }

    // ----- tasks -----

    fn walk_task_decl(&mut self, d: &TaskDecl) {
        let base_id = self.resolve_base(d.base.as_ref(), &d.name, d.extends_pos);
        for dep in &d.dependencies {
            if dep.as_str() == d.name.as_str() {
                self.handler.error(ErrorCode::SelfDependsOnSelf, dep.range.begin, "a task cannot depend on itself");
            }
        }

        let task_id = self.create_local_symbol(&d.name, SymbolKind::Task(bsc_sema_task_symbol(base_id)));
        d.symbol.set(task_id);

        for member in &d.members {
            self.predeclare_task_member(task_id, member);
        }

        self.current_owner.push((task_id, base_id));
        self.scopes.push_decl(DeclFrame::class());
        for member in &d.members {
            self.walk_task_member_body(member);
        }
        self.scopes.pop_decl();
        self.current_owner.pop();
    }

    fn predeclare_task_member(&mut self, task_id: SymbolId, member: &TaskMember) {
        match member {
            TaskMember::Inputs(i) => {
                let has_inputs = matches!(&self.symbols.get(task_id).kind, SymbolKind::Task(t) if t.has_inputs);
                if has_inputs {
                    self.handler.error(ErrorCode::DuplicateInputsDeclaration, i.inputs_pos, "duplicate `inputs` declaration");
                } else if let SymbolKind::Task(t) = &mut self.symbols.get_mut(task_id).kind {
                    t.has_inputs = true;
                }
            }
            TaskMember::Outputs(o) => {
                let has_outputs = matches!(&self.symbols.get(task_id).kind, SymbolKind::Task(t) if t.has_outputs);
                if has_outputs {
                    self.handler.error(ErrorCode::DuplicateOutputsDeclaration, o.outputs_pos, "duplicate `outputs` declaration");
                } else if let SymbolKind::Task(t) = &mut self.symbols.get_mut(task_id).kind {
                    t.has_outputs = true;
                }
            }
            TaskMember::Action(a) => {
                let (key, name, argc) = match a.kind {
                    ActionKind::Do => ("action", "action", 5),
                    ActionKind::DoFirst => ("actionBefore", "actionBefore", 3),
                    ActionKind::DoLast => ("actionAfter", "actionAfter", 3),
                };
                let id = self.declare_class_member(task_id, key.to_string(), a.keyword_pos, name, SymbolKind::Method(MethodSymbol { argc, vararg: false, is_static: false, owner: task_id }));
                a.symbol.set(id);
            }
            TaskMember::Property(p) => {
                if TASK_RESERVED_NAMES.contains(&p.name.as_str()) {
                    self.handler.error(ErrorCode::ReservedIdentifier, p.name.range.begin, format!("`{}` is reserved and cannot be used as a task property name", p.name.as_str()));
                }
                let key = p.name.as_str().to_string();
                let id = self.declare_class_member(
                    task_id,
                    key,
                    p.name.range.begin,
                    p.name.as_str(),
                    SymbolKind::Field(FieldSymbol { owner: task_id, access: AccessFlag::Static, initialized: p.initializer.is_some() }),
                );
                p.symbol.set(id);
            }
        }
    }

    fn walk_task_member_body(&mut self, member: &TaskMember) {
        match member {
            TaskMember::Inputs(i) => {
                self.walk_expr(&i.pattern);
                if let Some(r) = &i.resolver {
                    self.walk_expr(r);
                }
            }
            TaskMember::Outputs(o) => {
                self.walk_expr(&o.pattern);
                if let Some(s) = &o.source {
                    self.walk_expr(s);
                }
            }
            TaskMember::Action(a) => {
                self.scopes.push_decl(DeclFrame::method(MethodScopeKind::Action));
                self.scopes.push_local(LocalScopeKind::Root, true);
                self.walk_block_items(&a.body);
                self.scopes.pop_local();
                self.scopes.pop_decl();
            }
            TaskMember::Property(p) => {
                if let Some(init) = &p.initializer {
                    self.walk_expr(init);
                }
            }
        }
    }

    // ----- statements -----

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Invalid(_) => {}
            Stmt::Block(b) => {
                self.scopes.push_local(LocalScopeKind::Block, false);
                self.walk_items(&b.body, false);
                self.scopes.pop_local();
            }
            Stmt::Arrow(a) => self.walk_expr(&a.expr),
            Stmt::If(s) => {
                self.walk_expr(&s.condition);
                self.walk_stmt(&s.if_body);
                if let Some(e) = &s.else_body {
                    self.walk_stmt(e);
                }
            }
            Stmt::Match(s) => self.walk_match(s),
            Stmt::Labeled(_) => unreachable!("match arms are walked directly by walk_match"),
            Stmt::For(s) => self.walk_for(s),
            Stmt::While(s) => self.walk_while(s),
            Stmt::With(s) => self.walk_with(s),
            Stmt::Try(s) => self.walk_try(s),
            Stmt::Except(_) | Stmt::Finally(_) => unreachable!("handled by walk_try"),
            Stmt::Break(s) => self.walk_break(s),
            Stmt::Continue(s) => self.walk_continue(s),
            Stmt::Return(s) => self.walk_return(s),
            Stmt::Assert(s) => {
                self.walk_expr(&s.condition);
                if let Some(m) = &s.message {
                    self.walk_expr(m);
                }
            }
            Stmt::Pass(_) => {}
            Stmt::Assign(s) => self.walk_assign(s),
            Stmt::Expression(e) => self.walk_expr(e),
        }
    }

    /// Case-label evaluation + duplicate detection happen here, arm by arm,
    /// in source order (§4.4).
    fn walk_match(&mut self, s: &MatchStmt) {
        self.walk_expr(&s.condition);
        self.scopes.push_local(LocalScopeKind::Match, false);
        let mut seen: Vec<CaseValue> = Vec::new();
        for arm in &s.arms {
            let Stmt::Labeled(l) = arm else { unreachable!("match arms are always Stmt::Labeled") };
            for label in &l.labels {
                if let Some(value_expr) = &label.value {
                    match eval_case_value(value_expr) {
                        Some(v) => {
                            if seen.contains(&v) {
                                self.handler.error(ErrorCode::DuplicateCaseLabel, label.keyword, "duplicate case label");
                            } else {
                                seen.push(v.clone());
                            }
                            label.evaluated_value.set(v);
                        }
                        None => {
                            self.handler
                                .error(ErrorCode::InvalidCaseValue, label.keyword, "case label must be a constant integer, float, boolean, or non-interpolated string");
                        }
                    }
                }
            }
            self.walk_items(&l.body, false);
        }
        self.scopes.pop_local();
    }

    fn walk_for(&mut self, s: &ForStmt) {
        self.walk_expr(&s.expr);
        self.scopes.push_local(LocalScopeKind::Loop, false);
        let id = self.create_local_symbol(&s.param, SymbolKind::Variable(VariableSymbol { kind: VariableKind::Implicit, readonly: true, initialized: true }));
        s.symbol.set(id);
        self.walk_block_items(&s.body);
        self.scopes.pop_local();
    }

    fn walk_while(&mut self, s: &WhileStmt) {
        self.walk_expr(&s.condition);
        self.scopes.push_local(LocalScopeKind::Loop, false);
        self.walk_block_items(&s.body);
        self.scopes.pop_local();
    }

    fn walk_with(&mut self, s: &WithStmt) {
        self.walk_expr(&s.expr);
        self.scopes.push_local(LocalScopeKind::Block, false);
        if let Some(name) = &s.capture {
            let id = self.create_local_symbol(name, SymbolKind::Variable(VariableSymbol { kind: VariableKind::Implicit, readonly: false, initialized: true }));
            s.symbol.set(id);
        }
        self.walk_block_items(&s.body);
        self.scopes.pop_local();
    }

    fn walk_try(&mut self, s: &TryStmt) {
        self.scopes.push_local(LocalScopeKind::Block, false);
        self.walk_block_items(&s.body);
        self.scopes.pop_local();

        for handler in &s.handlers {
            match handler {
                Stmt::Except(e) => {
                    self.scopes.push_local(LocalScopeKind::Except, false);
                    let _ = self.resolve_reference(&e.type_name);
                    if let Some(name) = &e.capture {
                        let id = self.create_local_symbol(name, SymbolKind::Variable(VariableSymbol { kind: VariableKind::Except, readonly: false, initialized: true }));
                        e.symbol.set(id);
                    }
                    self.walk_block_items(&e.body);
                    self.scopes.pop_local();
                }
                Stmt::Finally(f) => {
                    self.scopes.push_local(LocalScopeKind::Finally, false);
                    self.walk_block_items(&f.body);
                    self.scopes.pop_local();
                }
                _ => unreachable!("TryStmt.handlers only ever holds Except/Finally"),
            }
        }
    }

    fn walk_break(&mut self, s: &BreakStmt) {
        if let Some(c) = &s.condition {
            self.walk_expr(c);
        }
        match self.scopes.check_break_or_continue() {
            BreakContinueCheck::Ok => {}
            BreakContinueCheck::Finally => {
                self.handler.error(ErrorCode::CannotBreakInFinally, s.break_pos, "cannot break out of a `finally` block");
            }
            BreakContinueCheck::None => {
                self.handler.error(ErrorCode::CannotBreak, s.break_pos, "`break` outside a loop or `match`");
            }
        }
    }

    fn walk_continue(&mut self, s: &ContinueStmt) {
        if let Some(c) = &s.condition {
            self.walk_expr(c);
        }
        match self.scopes.check_break_or_continue() {
            BreakContinueCheck::Ok => {}
            BreakContinueCheck::Finally => {
                self.handler.error(ErrorCode::CannotContinueInFinally, s.continue_pos, "cannot continue out of a `finally` block");
            }
            BreakContinueCheck::None => {
                self.handler.error(ErrorCode::CannotContinue, s.continue_pos, "`continue` outside a loop");
            }
        }
    }

    fn walk_return(&mut self, s: &ReturnStmt) {
        if let Some(v) = &s.value {
            self.walk_expr(v);
        }
        if !self.scopes.can_return() {
            self.handler.error(ErrorCode::CannotReturn, s.return_pos, "`return` outside a function, method, or closure");
            return;
        }
        match self.scopes.current_decl().return_flag {
            ReturnFlag::NeverReturn if s.value.is_some() => {
                self.handler.error(ErrorCode::CannotReturnValue, s.return_pos, "this context cannot return a value");
            }
            ReturnFlag::MustReturn if s.value.is_none() => {
                self.handler.error(ErrorCode::MustReturnValue, s.return_pos, "this context must return a value");
            }
            _ => {}
        }
    }

    fn walk_assign(&mut self, s: &AssignStmt) {
        self.walk_assignment_target(&s.target);
        self.walk_expr(&s.value);
    }

    /// §4.4 assignment validity: `MemberAccess`/`Subscript` are checked at
    /// runtime and always accepted here; a bare `Variable` must resolve to a
    /// writable, non-bounded-local symbol.
    fn walk_assignment_target(&mut self, target: &Expr) {
        match target {
            Expr::MemberAccess(m) => self.walk_expr(&m.target),
            Expr::Subscript(s) => {
                self.walk_expr(&s.target);
                self.walk_expr(&s.index);
            }
            Expr::Variable(v) => {
                let (id, frame_index) = match self.scopes.lookup(v.name.as_str()) {
                    Some(found) => found,
                    None => {
                        self.handler.error(ErrorCode::UsedBeforeDeclared, v.range.begin, format!("use of undeclared name `{}`", v.name.as_str()));
                        (self.symbols.alloc(v.name.as_str(), v.range.begin, SymbolKind::Undeclared), usize::MAX)
                    }
                };
                v.symbol.set(id);

                if matches!(self.scopes.current_decl().kind, DeclScopeKind::Closure) && frame_index < self.scopes.current_decl_root_index() {
                    let capturable = matches!(&self.symbols.get(id).kind, SymbolKind::Variable(var) if var.kind.is_capturable_local());
                    if capturable {
                        self.handler.error(ErrorCode::CannotAssignBoundedLocal, v.range.begin, "cannot assign to a variable captured from an enclosing scope");
                        self.wrap_capture(id);
                        return;
                    }
                }
                if let SymbolKind::Variable(var) = &self.symbols.get(id).kind {
                    if var.readonly {
                        self.handler.error(ErrorCode::CannotAssignTarget, v.range.begin, format!("cannot assign to `{}`: it is read-only", v.name.as_str()));
                    }
                }
            }
            _ => {
                self.handler.error(ErrorCode::CannotAssignTarget, target.range().begin, "invalid assignment target");
                self.walk_expr(target);
            }
        }
    }

    // ----- expressions -----

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Invalid(_) => {}
            Expr::Literal(l) => {
                if let Literal::Interpolated { parts, .. } = &l.value {
                    for p in parts {
                        self.walk_expr(p);
                    }
                }
            }
            Expr::Variable(v) => {
                let id = self.resolve_reference(&v.name);
                v.symbol.set(id);
            }
            Expr::SelfExpr(s) => {
                let id = self.resolve_self(s.range.begin);
                s.symbol.set(id);
            }
            Expr::Super(s) => {
                let id = self.resolve_super(s.range.begin);
                s.symbol.set(id);
            }
            Expr::Binary(b) => {
                self.walk_expr(&b.left);
                self.walk_expr(&b.right);
            }
            Expr::Unary(u) => self.walk_expr(&u.operand),
            Expr::Logic(l) => {
                self.walk_expr(&l.left);
                self.walk_expr(&l.right);
            }
            Expr::Defined(d) => {
                if let Some(c) = &d.container {
                    self.walk_expr(c);
                }
            }
            Expr::Raise(r) => self.walk_expr(&r.value),
            Expr::TypeTest(t) => {
                self.walk_expr(&t.value);
                let id = self.resolve_reference(&t.type_name);
                t.symbol.set(id);
            }
            Expr::ContainmentTest(c) => {
                self.walk_expr(&c.value);
                self.walk_expr(&c.target);
            }
            Expr::Ternary(t) => {
                self.walk_expr(&t.then_value);
                self.walk_expr(&t.condition);
                self.walk_expr(&t.else_value);
            }
            Expr::MemberAccess(m) => self.walk_expr(&m.target),
            Expr::Subscript(s) => {
                self.walk_expr(&s.target);
                self.walk_expr(&s.index);
            }
            Expr::Invoke(i) => {
                self.walk_expr(&i.callee);
                for a in &i.args {
                    self.walk_expr(a);
                }
            }
            Expr::Closure(c) => self.walk_closure(c),
            Expr::MakeList(l) => {
                for item in &l.items {
                    self.walk_expr(&item.value);
                }
            }
            Expr::MakeMap(m) => {
                for e in &m.entries {
                    self.walk_expr(&e.key);
                    self.walk_expr(&e.value);
                }
            }
        }
    }

    fn walk_closure(&mut self, c: &ClosureExpr) {
        let ordinal = self.closure_ordinal;
        self.closure_ordinal += 1;
        let id = self.symbols.alloc(format!("<closure:{}>", ordinal), c.range.begin, SymbolKind::Closure(ClosureSymbol { ordinal }));
        c.symbol.set(id);

        let in_instance = self.scopes.current_decl().in_instance;
        self.scopes.push_decl(DeclFrame::closure(in_instance));
        self.scopes.push_local(LocalScopeKind::Root, true);
        self.declare_params(&c.params);
        match c.body.as_ref() {
            Stmt::Block(b) => self.walk_items(&b.body, false),
            Stmt::Arrow(a) => self.walk_expr(&a.expr),
            other => self.walk_stmt(other),
        }
        self.scopes.pop_local();
        let frame = self.scopes.pop_decl();
        c.bounded_locals.set(frame.bounded_locals);
    }
}

fn eval_case_value(expr: &Expr) -> Option<CaseValue> {
    match expr {
        Expr::Literal(l) => match &l.value {
            Literal::Integer(i) => Some(CaseValue::Integer(*i)),
            Literal::Float(f) => Some(CaseValue::Float(*f)),
            Literal::Boolean(b) => Some(CaseValue::Boolean(*b)),
            Literal::String(s) => Some(CaseValue::String(s.clone())),
            Literal::Interpolated { .. } | Literal::None => None,
        },
        _ => None,
    }
}

fn bsc_sema_class_symbol(base: Option<SymbolId>) -> crate::symbol::ClassSymbol {
    crate::symbol::ClassSymbol { base, members: Default::default() }
}

fn bsc_sema_task_symbol(base: Option<SymbolId>) -> TaskSymbol {
    TaskSymbol { base, members: Default::default(), has_inputs: false, has_outputs: false }
}
