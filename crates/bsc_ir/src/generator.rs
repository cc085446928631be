//! AST → IR desugaring walk (§4.5.2): one `IrBuilder` context per
//! function/method/closure/synthesized-lifecycle-method body, collected
//! into a flat `Vec<IrCodeBlock>` in declaration order.

use bsc_ast::*;
use bsc_sema::{ClassSymbol, SymbolKind, SymbolTable, TaskSymbol};
use bsc_span::SourcePosition;

use crate::builder::IrBuilder;
use crate::code_block::{ExceptInfo, IrCodeBlock};
use crate::opcode::{MakeKind, TestKind, UnaryOpKind};
use crate::stmt::{
    AssertOp, BranchOp, CallOp, ConditionalBranchOp, DefinedOp, ExportOp, GetMemberOp, GetSubscriptOp, ImportOp, InplaceOp, InvokeOp, IrStmt, JumpTableOp, MakeClosureOp, MakeOp, RaiseOp,
    ReturnOp, SelectOp, SetMemberOp, SetSubscriptOp,
};
use crate::value::{IrValue, Value, IR_INVALID_VALUE};
use crate::BlockId;

use crate::stmt::BinaryOp as IrBinaryOp;
use crate::stmt::DeclareSymbolOp;
use crate::stmt::UnaryOp as IrUnaryOp;

/// `(break_target, continue_target)` pushed by every loop/match construct so
/// nested `break`/`continue` resolve to the right block without threading
/// an explicit target through every recursive call (§4.5.2).
type LoopFrame = (BlockId, BlockId);

pub struct IrGenerator<'a> {
    symbols: &'a SymbolTable,
    loop_stack: Vec<LoopFrame>,
    output: Vec<IrCodeBlock>,
}

/// Walks the whole script, producing one `IrCodeBlock` for the top-level
/// body plus one for every function/method/closure/synthesized lifecycle
/// method reachable from it.
pub fn generate(script: &ScriptDecl, symbols: &SymbolTable) -> Vec<IrCodeBlock> {
    let mut gen = IrGenerator { symbols, loop_stack: Vec::new(), output: Vec::new() };
    gen.gen_script(script);
    gen.output
}

impl<'a> IrGenerator<'a> {
    fn gen_script(&mut self, script: &ScriptDecl) {
        let mut b = IrBuilder::new(self.symbols, "<script>", Vec::new(), false);
        self.gen_items(&mut b, &script.body);
        self.terminate_with_return(&mut b, None);
        let code = b.finalize();
        self.output.push(code);
    }

    fn gen_items(&mut self, b: &mut IrBuilder<'a>, items: &[Item]) {
        for item in items {
            self.gen_item(b, item);
        }
    }

    fn gen_item(&mut self, b: &mut IrBuilder<'a>, item: &Item) {
        match item {
            Item::Decl(d) => self.gen_decl(b, d),
            Item::Stmt(s) => self.gen_stmt(b, s),
        }
    }

    fn gen_decl(&mut self, b: &mut IrBuilder<'a>, decl: &Decl) {
        match decl {
            Decl::Invalid(_) => {}
            Decl::Script(_) => unreachable!("ScriptDeclaration is only ever the AST root"),
            Decl::Import(d) => self.gen_import(b, d),
            Decl::Export(d) => self.gen_export(b, d),
            Decl::Var(d) => self.gen_var_decl(b, d),
            Decl::Function(d) => self.gen_function_decl(d),
            Decl::Class(d) => self.gen_class_decl(d),
            Decl::Task(d) => self.gen_task_decl(d),
        }
    }

    fn gen_import(&mut self, b: &mut IrBuilder<'a>, d: &ImportDecl) {
        let symbol = d.symbol.get();
        let path = b.read_const(d.import_pos, Value::String(d.name.as_str().to_string()));
        b.push(IrStmt::Import(ImportOp { pos: d.import_pos, path }));
        b.bind_local(symbol, path);
    }

    fn gen_export(&mut self, b: &mut IrBuilder<'a>, d: &ExportDecl) {
        match d.inner.as_ref() {
            Decl::Var(v) => {
                self.gen_var_decl(b, v);
                let symbol = v.symbol.get();
                b.push(IrStmt::Export(ExportOp { pos: d.export_pos, symbol }));
            }
            other => self.gen_decl(b, other),
        }
    }

    fn gen_var_decl(&mut self, b: &mut IrBuilder<'a>, d: &VarDecl) {
        let pos = d.range.begin;
        let value = match &d.initializer {
            Some(e) => self.gen_expr(b, e),
            None => b.read_const(pos, Value::None),
        };
        let symbol = d.symbol.get();
        b.push(IrStmt::DeclareSymbol(DeclareSymbolOp { pos, symbol, value }));
        b.bind_local(symbol, value);
    }

    /// Compiles a free function's body into its own `IrCodeBlock` and files
    /// it; the declaration site itself leaves no trace in the enclosing
    /// block, since a function is only ever reached by name through the
    /// symbol table.
    fn gen_function_decl(&mut self, d: &FunctionDecl) {
        let symbol = d.symbol.get();
        let name = mangled_name(self.symbols, symbol);
        let params: Vec<SymbolId> = d.params.params.iter().map(|p| p.symbol.get()).collect();
        let code = self.gen_function_body(&name, params, d.params.is_vararg(), &d.body, Vec::new());
        self.output.push(code);
    }

    /// Shared core for free functions, methods, closures, and synthesized
    /// lifecycle bodies: primes argument registers (binding each of `leading`
    /// -- a method's `self`/`super` owner, or a closure's bounded-local
    /// wrappers -- ahead of `params`, register 0 first), walks the body, and
    /// appends an implicit `Return` if the body fell off the end without one.
    fn gen_function_body(&mut self, name: &str, params: Vec<SymbolId>, vararg: bool, body: &Stmt, leading: Vec<SymbolId>) -> IrCodeBlock {
        let mut args = leading;
        args.extend(params.iter().copied());

        let mut b = IrBuilder::new(self.symbols, name.to_string(), args.clone(), vararg);
        for symbol in &args {
            let reg = b.new_register();
            b.bind_local(*symbol, reg);
        }

        self.gen_stmt(&mut b, body);
        self.terminate_with_return(&mut b, None);
        b.finalize()
    }

    fn terminate_with_return(&self, b: &mut IrBuilder<'a>, value: Option<IrValue>) {
        if b.current_block_terminated() {
            return;
        }
        let value = value.unwrap_or(IR_INVALID_VALUE);
        b.push(IrStmt::Return(ReturnOp { pos: SourcePosition::synthetic(), value }));
    }

    // ----- classes -----

    fn gen_class_decl(&mut self, d: &ClassDecl) {
        let class_id = d.symbol.get();
        let base_id = class_base(self.symbols, class_id);
        let class_name = mangled_name(self.symbols, class_id);

        let mut has_init = false;
        for member in &d.members {
            match member {
                ClassMember::Init(i) => {
                    has_init = true;
                    self.gen_init(&class_name, class_id, base_id, i);
                }
                ClassMember::Deinit(de) => self.gen_deinit(&class_name, class_id, de),
                ClassMember::Method(m) => self.gen_method(&class_name, class_id, m),
                ClassMember::Field(_) => {}
            }
        }
        if !has_init {
            self.gen_synthetic_init(&class_name, class_id, base_id, &[], &SourcePosition::synthetic());
        }
    }

    /// A class/task `init` whose body does not already open with
    /// `self(...)`/`super(...)` gets one prepended (§4.5.2, scenario 6 of
    /// §8); `initializer_call` is the one-write flag the analyzer set while
    /// tracking that rule.
    fn gen_init(&mut self, owner_name: &str, owner: SymbolId, base: Option<SymbolId>, i: &InitDecl) {
        let symbol = i.symbol.get();
        let name = format!("{}.{}", owner_name, mangled_name(self.symbols, symbol));
        let params: Vec<SymbolId> = i.params.params.iter().map(|p| p.symbol.get()).collect();

        let mut b = IrBuilder::new(self.symbols, name, Vec::new(), i.params.is_vararg());
        let self_reg = b.new_register();
        b.bind_local(owner, self_reg);
        for symbol in &params {
            let reg = b.new_register();
            b.bind_local(*symbol, reg);
        }

        if !i.initializer_call.get() {
            self.emit_super_init_call(&mut b, owner, base, Vec::new(), i.init_pos);
        }
        self.gen_stmt(&mut b, &i.body);
        self.terminate_with_return(&mut b, None);

        let mut args = vec![owner];
        args.extend(params);
        let mut code = b.finalize();
        code.args = args;
        self.output.push(code);
    }

    /// `class C { ... }` with no explicit `init`: synthesize
    /// `C.<init>$1(self)` calling `super.<init>()` with the given forwarded
    /// arguments (§4.5.2).
    fn gen_synthetic_init(&mut self, owner_name: &str, owner: SymbolId, base: Option<SymbolId>, forwarded: &[SymbolId], pos: &SourcePosition) {
        let name = format!("{}.{}", owner_name, bsc_sema::mangle("<init>", 0, false));
        let mut b = IrBuilder::new(self.symbols, name, vec![owner], false);
        let self_reg = b.new_register();
        b.bind_local(owner, self_reg);

        let fwd: Vec<IrValue> = forwarded
            .iter()
            .map(|s| {
                let reg = b.new_register();
                b.bind_local(*s, reg);
                reg
            })
            .collect();
        self.emit_super_init_call(&mut b, owner, base, fwd, *pos);
        self.terminate_with_return(&mut b, None);

        let mut args = vec![owner];
        args.extend(forwarded.iter().copied());
        let mut code = b.finalize();
        code.args = args;
        self.output.push(code);
    }

    fn emit_super_init_call(&mut self, b: &mut IrBuilder<'a>, owner: SymbolId, base: Option<SymbolId>, args: Vec<IrValue>, pos: SourcePosition) {
        let target = match base {
            Some(base_id) => b.read_symbol(pos, base_id),
            None => b.read_symbol(pos, owner),
        };
        let ret = b.new_register();
        b.push(IrStmt::Invoke(InvokeOp { pos, ret, target, member: "<init>".to_string(), args }));
    }

    fn gen_deinit(&mut self, owner_name: &str, owner: SymbolId, de: &DeinitDecl) {
        let symbol = de.symbol.get();
        let name = format!("{}.{}", owner_name, mangled_name(self.symbols, symbol));
        let code = self.gen_function_body(&name, Vec::new(), false, &de.body, vec![owner]);
        self.output.push(code);
    }

    fn gen_method(&mut self, owner_name: &str, owner: SymbolId, m: &MethodDecl) {
        let symbol = m.symbol.get();
        let name = format!("{}.{}", owner_name, mangled_name(self.symbols, symbol));
        let params: Vec<SymbolId> = m.params.params.iter().map(|p| p.symbol.get()).collect();
        let self_arg = if m.kind == MethodKind::StaticMethod { Vec::new() } else { vec![owner] };
        let code = self.gen_function_body(&name, params, m.params.is_vararg(), &m.body, self_arg);
        self.output.push(code);
    }

    // ----- tasks -----

    fn gen_task_decl(&mut self, d: &TaskDecl) {
        let task_id = d.symbol.get();
        let base_id = class_base(self.symbols, task_id);
        let task_name = mangled_name(self.symbols, task_id);

        let properties: Vec<&TaskPropertyDecl> = d.members.iter().filter_map(|m| match m {
            TaskMember::Property(p) => Some(p),
            _ => None,
        }).collect();
        let inputs: Option<&TaskInputsDecl> = d.members.iter().find_map(|m| match m {
            TaskMember::Inputs(i) => Some(i),
            _ => None,
        });
        let outputs: Option<&TaskOutputsDecl> = d.members.iter().find_map(|m| match m {
            TaskMember::Outputs(o) => Some(o),
            _ => None,
        });

        self.gen_task_cinit(&task_name, task_id);
        self.gen_task_init(&task_name, task_id, base_id, &properties, inputs, outputs, d.task_pos);

        for member in &d.members {
            if let TaskMember::Action(a) = member {
                self.gen_task_action(&task_name, task_id, a);
            }
        }
    }

    /// Static class initializer, synthesized for every task (§4.5.2). Task
    /// static state beyond registration is out of scope here, so the body
    /// is a bare `Return`.
    fn gen_task_cinit(&mut self, owner_name: &str, owner: SymbolId) {
        let name = format!("{}.{}", owner_name, "<cinit>");
        let mut b = IrBuilder::new(self.symbols, name, Vec::new(), false);
        self.terminate_with_return(&mut b, None);
        self.output.push(b.finalize());
    }

    /// `<init>$1(self)`: invokes `super.<init>(taskName)`, then runs each
    /// property initializer, then the `inputs`/`outputs` desugarings
    /// (§4.5.2).
    #[allow(clippy::too_many_arguments)]
    fn gen_task_init(
        &mut self,
        owner_name: &str,
        owner: SymbolId,
        base: Option<SymbolId>,
        properties: &[&TaskPropertyDecl],
        inputs: Option<&TaskInputsDecl>,
        outputs: Option<&TaskOutputsDecl>,
        pos: SourcePosition,
    ) {
        let name = format!("{}.{}", owner_name, bsc_sema::mangle("<init>", 0, false));
        let mut b = IrBuilder::new(self.symbols, name, vec![owner], false);
        let self_reg = b.new_register();
        b.bind_local(owner, self_reg);

        let task_name_const = b.read_const(pos, Value::String(owner_name.to_string()));
        let target = match base {
            Some(base_id) => b.read_symbol(pos, base_id),
            None => b.read_symbol(pos, owner),
        };
        let ret = b.new_register();
        b.push(IrStmt::Invoke(InvokeOp { pos, ret, target, member: "<init>".to_string(), args: vec![task_name_const] }));

        for p in properties {
            if let Some(init) = &p.initializer {
                let value = self.gen_expr(&mut b, init);
                b.push(IrStmt::SetMember(SetMemberOp { pos: p.range.begin, target: self_reg, member: p.name.as_str().to_string(), value }));
            }
        }

        if let Some(i) = inputs {
            let pattern = self.gen_expr(&mut b, &i.pattern);
            let ret = b.new_register();
            b.push(IrStmt::Invoke(InvokeOp { pos: i.inputs_pos, ret, target: self_reg, member: "Inputs".to_string(), args: vec![pattern] }));
            if let Some(resolver) = &i.resolver {
                let value = self.gen_expr(&mut b, resolver);
                let ret = b.new_register();
                b.push(IrStmt::Invoke(InvokeOp { pos: i.inputs_pos, ret, target: self_reg, member: "Resolver".to_string(), args: vec![value] }));
            }
        }

        if let Some(o) = outputs {
            let pattern = self.gen_expr(&mut b, &o.pattern);
            let ret = b.new_register();
            if let Some(source) = &o.source {
                let from = self.gen_expr(&mut b, source);
                b.push(IrStmt::Invoke(InvokeOp { pos: o.outputs_pos, ret, target: self_reg, member: "Pattern".to_string(), args: vec![pattern, from] }));
            } else {
                b.push(IrStmt::Invoke(InvokeOp { pos: o.outputs_pos, ret, target: self_reg, member: "Outputs".to_string(), args: vec![pattern] }));
            }
        }

        self.terminate_with_return(&mut b, None);
        self.output.push(b.finalize());
    }

    /// `do`/`doFirst`/`doLast` task actions desugar to a method with the
    /// fixed signature from §4.4: `action(self, inputs, outputs, input,
    /// output)` / `actionBefore(self, inputs, outputs)` /
    /// `actionAfter(self, inputs, outputs)`. The parameter symbols
    /// themselves are implicit (not user-named), so the generator only
    /// needs their count for the emitted `IrCodeBlock`'s `args` arity.
    fn gen_task_action(&mut self, owner_name: &str, owner: SymbolId, a: &TaskActionDecl) {
        let simple = match a.kind {
            ActionKind::Do => "action",
            ActionKind::DoFirst => "actionBefore",
            ActionKind::DoLast => "actionAfter",
        };
        let name = format!("{}.{}", owner_name, simple);
        let mut b = IrBuilder::new(self.symbols, name, vec![owner], false);
        let self_reg = b.new_register();
        b.bind_local(owner, self_reg);

        self.gen_stmt(&mut b, &a.body);
        self.terminate_with_return(&mut b, None);
        self.output.push(b.finalize());
    }

    // ----- statements -----

    fn gen_stmt(&mut self, b: &mut IrBuilder<'a>, stmt: &Stmt) {
        match stmt {
            Stmt::Invalid(_) => {}
            Stmt::Block(s) => self.gen_items(b, &s.body),
            Stmt::Arrow(s) => {
                let value = self.gen_expr(b, &s.expr);
                self.terminate_with_return(b, Some(value));
            }
            Stmt::If(s) => self.gen_if(b, s),
            Stmt::Match(s) => self.gen_match(b, s),
            Stmt::Labeled(_) => unreachable!("match arms are generated directly by gen_match"),
            Stmt::For(s) => self.gen_for(b, s),
            Stmt::While(s) => self.gen_while(b, s),
            Stmt::With(s) => self.gen_with(b, s),
            Stmt::Try(s) => self.gen_try(b, s),
            Stmt::Except(_) | Stmt::Finally(_) => unreachable!("handled by gen_try"),
            Stmt::Break(s) => self.gen_break(b, s),
            Stmt::Continue(s) => self.gen_continue(b, s),
            Stmt::Return(s) => self.gen_return(b, s),
            Stmt::Assert(s) => self.gen_assert(b, s),
            Stmt::Pass(_) => {}
            Stmt::Assign(s) => self.gen_assign(b, s),
            Stmt::Expression(e) => {
                self.gen_expr(b, e);
            }
        }
    }

    fn gen_if(&mut self, b: &mut IrBuilder<'a>, s: &IfStmt) {
        let cond = self.gen_expr(b, &s.condition);
        let then_bb = b.create_block();
        let merge_bb = b.create_block();
        let else_bb = if s.else_body.is_some() { b.create_block() } else { merge_bb };

        b.add_edge(b.current_block(), then_bb);
        b.add_edge(b.current_block(), else_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos: s.if_pos, cond, on_true: then_bb, on_false: else_bb }));

        b.set_block(then_bb, true);
        self.gen_stmt(b, &s.if_body);
        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), merge_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
        }

        if let Some(else_body) = &s.else_body {
            b.set_block(else_bb, true);
            self.gen_stmt(b, else_body);
            if !b.current_block_terminated() {
                b.add_edge(b.current_block(), merge_bb);
                b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
            }
        }

        b.set_block(merge_bb, true);
    }

    /// `match v { case k1: s1 … default: sd }` → evaluate `v`, per-arm
    /// blocks, `JumpTable(v, default, [(k, bb)…])`; `pass` as the last
    /// statement of an arm falls through to the next arm rather than
    /// jumping to the merge block (§4.5.2, scenario 5 of §8).
    fn gen_match(&mut self, b: &mut IrBuilder<'a>, s: &MatchStmt) {
        let cond = self.gen_expr(b, &s.condition);
        let switch_bb = b.current_block();
        let merge_bb = b.create_block();

        let arm_blocks: Vec<BlockId> = s.arms.iter().map(|_| b.create_block()).collect();
        let mut default_bb = merge_bb;
        let mut cases: Vec<(Value, BlockId)> = Vec::new();

        for (arm, &arm_bb) in s.arms.iter().zip(&arm_blocks) {
            let labels = match arm {
                Stmt::Labeled(l) => &l.labels,
                _ => unreachable!("match arm is always Stmt::Labeled"),
            };
            for label in labels {
                if label.is_default {
                    default_bb = arm_bb;
                } else {
                    cases.push((label.evaluated_value.get().into(), arm_bb));
                }
            }
            b.add_edge(switch_bb, arm_bb);
        }

        b.push(IrStmt::JumpTable(JumpTableOp { pos: s.match_pos, cond, default: default_bb, cases }));

        // `break` inside an arm exits the match the same way it exits a
        // loop (§3.5's `LocalScopeKind::Match` is break/continue-legal);
        // reusing `loop_stack` keeps `gen_break`/`gen_continue` untouched.
        self.loop_stack.push((merge_bb, merge_bb));
        for (i, (arm, &arm_bb)) in s.arms.iter().zip(&arm_blocks).enumerate() {
            let next_bb = arm_blocks.get(i + 1).copied().unwrap_or(merge_bb);
            b.set_block(arm_bb, true);
            if let Stmt::Labeled(l) = arm {
                self.gen_items(b, &l.body);
            }
            if !b.current_block_terminated() {
                b.add_edge(b.current_block(), next_bb);
                b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: next_bb }));
            }
        }
        self.loop_stack.pop();

        b.set_block(merge_bb, true);
    }

    /// `for x in e body` → `t := e; while t.HasNext { x := t.Next; body }`
    /// (§4.5.2).
    fn gen_for(&mut self, b: &mut IrBuilder<'a>, s: &ForStmt) {
        let pos = s.for_pos;
        let iter = self.gen_expr(b, &s.expr);

        let header_bb = b.create_block();
        let body_bb = b.create_block();
        let merge_bb = b.create_block();

        b.add_edge(b.current_block(), header_bb);
        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: header_bb }));

        b.set_block(header_bb, false);
        let has_next = b.new_register();
        b.push(IrStmt::Invoke(InvokeOp { pos, ret: has_next, target: iter, member: "HasNext".to_string(), args: Vec::new() }));
        b.add_edge(header_bb, body_bb);
        b.add_edge(header_bb, merge_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos, cond: has_next, on_true: body_bb, on_false: merge_bb }));

        b.set_block(body_bb, true);
        let next = b.new_register();
        b.push(IrStmt::Invoke(InvokeOp { pos, ret: next, target: iter, member: "Next".to_string(), args: Vec::new() }));
        let param_symbol = s.symbol.get();
        b.push(IrStmt::DeclareSymbol(DeclareSymbolOp { pos, symbol: param_symbol, value: next }));
        b.bind_local(param_symbol, next);

        self.loop_stack.push((merge_bb, header_bb));
        self.gen_stmt(b, &s.body);
        self.loop_stack.pop();

        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), header_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: header_bb }));
        }
        b.seal_block(header_bb);
        b.set_block(merge_bb, true);
    }

    fn gen_while(&mut self, b: &mut IrBuilder<'a>, s: &WhileStmt) {
        let header_bb = b.create_block();
        let body_bb = b.create_block();
        let merge_bb = b.create_block();

        b.add_edge(b.current_block(), header_bb);
        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: header_bb }));

        b.set_block(header_bb, false);
        let cond = self.gen_expr(b, &s.condition);
        b.add_edge(header_bb, body_bb);
        b.add_edge(header_bb, merge_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos: s.while_pos, cond, on_true: body_bb, on_false: merge_bb }));

        b.set_block(body_bb, true);
        self.loop_stack.push((merge_bb, header_bb));
        self.gen_stmt(b, &s.body);
        self.loop_stack.pop();

        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), header_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: header_bb }));
        }
        b.seal_block(header_bb);
        b.set_block(merge_bb, true);
    }

    /// `with e as x body` → `try { x := e; body } finally { e.Close() }`
    /// (§4.5.2); a bare `with e body` binds nothing and just guards `e`.
    fn gen_with(&mut self, b: &mut IrBuilder<'a>, s: &WithStmt) {
        let pos = s.with_pos;
        let resource = self.gen_expr(b, &s.expr);
        if let Some(symbol) = s.symbol.get_if_set() {
            b.push(IrStmt::DeclareSymbol(DeclareSymbolOp { pos, symbol, value: resource }));
            b.bind_local(symbol, resource);
        }

        let begin_bb = b.current_block();
        self.gen_stmt(b, &s.body);
        let end_bb = b.current_block();

        let finally_bb = b.create_block();
        let merge_bb = b.create_block();
        // The protected range may raise at any point and transfer control to
        // the finally handler out of band; record that as an ordinary CFG
        // edge from the range's entry so `finally_bb` has a predecessor even
        // when the body's last block falls straight through into it (§8's
        // "every block except the entry has >=1 predecessor").
        b.add_edge(begin_bb, finally_bb);
        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), finally_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: finally_bb }));
        }

        b.set_block(finally_bb, true);
        let ret = b.new_register();
        b.push(IrStmt::Invoke(InvokeOp { pos, ret, target: resource, member: "Close".to_string(), args: Vec::new() }));
        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), merge_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
        }

        b.add_except_info(ExceptInfo { begin: begin_bb, end: end_bb, handlers: vec![(finally_bb, None)] });
        b.set_block(merge_bb, true);
    }

    /// `try body except T1 as x {…} except T2 {…} finally {…}` → body block
    /// plus per-except handler blocks plus a synthetic finally re-raise
    /// handler; one `ExceptInfo` covering the protected range (§4.5.2).
    fn gen_try(&mut self, b: &mut IrBuilder<'a>, s: &TryStmt) {
        let begin_bb = b.current_block();
        self.gen_stmt(b, &s.body);
        let end_bb = b.current_block();

        let merge_bb = b.create_block();
        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), merge_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
        }

        let mut handler_entries = Vec::new();
        for handler in &s.handlers {
            match handler {
                Stmt::Except(e) => {
                    let handler_bb = b.create_block();
                    // Same out-of-band exceptional edge as `gen_with`'s
                    // finally handler: the protected range can transfer
                    // control here at any point, so it must appear as a
                    // predecessor even though no ordinary fallthrough reaches
                    // a handler block.
                    b.add_edge(begin_bb, handler_bb);
                    b.set_block(handler_bb, true);
                    if let Some(symbol) = e.symbol.get_if_set() {
                        let caught = b.new_register();
                        b.bind_local(symbol, caught);
                    }
                    self.gen_stmt(b, &e.body);
                    if !b.current_block_terminated() {
                        b.add_edge(b.current_block(), merge_bb);
                        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
                    }
                    let type_symbol = self.resolve_type_name(&e.type_name);
                    handler_entries.push((handler_bb, type_symbol));
                }
                Stmt::Finally(f) => {
                    let handler_bb = b.create_block();
                    b.add_edge(begin_bb, handler_bb);
                    b.set_block(handler_bb, true);
                    self.gen_stmt(b, &f.body);
                    let raised = b.new_register();
                    b.push(IrStmt::Raise(RaiseOp { pos: f.finally_pos, throwable: raised }));
                    handler_entries.push((handler_bb, None));
                }
                _ => unreachable!("TryStmt.handlers only holds Except/Finally"),
            }
        }

        b.add_except_info(ExceptInfo { begin: begin_bb, end: end_bb, handlers: handler_entries });
        b.set_block(merge_bb, true);
    }

    /// `except TypeName as x` names its caught type by identifier rather
    /// than through a one-write field the analyzer resolved, so the
    /// generator looks it up in the global symbol table directly -- a
    /// linear scan is fine here since it only runs once per handler at
    /// compile time, not per exception thrown at runtime.
    fn resolve_type_name(&self, name: &bsc_span::Identifier) -> Option<SymbolId> {
        for i in 0..self.symbols.len() {
            let id = SymbolId(i as u32);
            let symbol = self.symbols.get(id);
            if matches!(symbol.kind, SymbolKind::Class(_) | SymbolKind::Task(_)) && symbol.name == name.as_str() {
                return Some(id);
            }
        }
        None
    }

    fn gen_break(&mut self, b: &mut IrBuilder<'a>, s: &BreakStmt) {
        let target = match self.loop_stack.last() {
            Some(&(break_target, _)) => break_target,
            None => return,
        };
        if let Some(condition) = &s.condition {
            self.gen_conditional_jump(b, condition, target, s.break_pos);
        } else {
            b.add_edge(b.current_block(), target);
            b.push(IrStmt::Br(BranchOp { pos: s.break_pos, target }));
        }
    }

    fn gen_continue(&mut self, b: &mut IrBuilder<'a>, s: &ContinueStmt) {
        let target = match self.loop_stack.last() {
            Some(&(_, continue_target)) => continue_target,
            None => return,
        };
        if let Some(condition) = &s.condition {
            self.gen_conditional_jump(b, condition, target, s.continue_pos);
        } else {
            b.add_edge(b.current_block(), target);
            b.push(IrStmt::Br(BranchOp { pos: s.continue_pos, target }));
        }
    }

    /// `break if cond` / `continue if cond`: branch to `target` when `cond`
    /// holds, otherwise fall through to a freshly created successor block.
    fn gen_conditional_jump(&mut self, b: &mut IrBuilder<'a>, condition: &Expr, target: BlockId, pos: SourcePosition) {
        let cond = self.gen_expr(b, condition);
        let fallthrough = b.create_block();
        b.add_edge(b.current_block(), target);
        b.add_edge(b.current_block(), fallthrough);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos, cond, on_true: target, on_false: fallthrough }));
        b.set_block(fallthrough, true);
    }

    fn gen_return(&mut self, b: &mut IrBuilder<'a>, s: &ReturnStmt) {
        let value = s.value.as_ref().map(|e| self.gen_expr(b, e));
        let value = value.unwrap_or(IR_INVALID_VALUE);
        b.push(IrStmt::Return(ReturnOp { pos: s.return_pos, value }));
    }

    /// `assert c [: m]` → `BrCond` to merge/assertBB; in `assertBB` the
    /// optional message (default `"assertion failed."`) is evaluated and an
    /// `Assert` emitted (§4.5.2).
    fn gen_assert(&mut self, b: &mut IrBuilder<'a>, s: &AssertStmt) {
        let cond = self.gen_expr(b, &s.condition);
        let assert_bb = b.create_block();
        let merge_bb = b.create_block();
        b.add_edge(b.current_block(), merge_bb);
        b.add_edge(b.current_block(), assert_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos: s.assert_pos, cond, on_true: merge_bb, on_false: assert_bb }));

        b.set_block(assert_bb, true);
        let message = match &s.message {
            Some(m) => self.gen_expr(b, m),
            None => b.read_const(s.assert_pos, Value::String("assertion failed.".to_string())),
        };
        b.push(IrStmt::Assert(AssertOp { pos: s.assert_pos, cond, message }));
        if !b.current_block_terminated() {
            b.add_edge(b.current_block(), merge_bb);
            b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));
        }

        b.set_block(merge_bb, true);
    }

    /// Inplace operators (`x += y`) on a simple variable read the symbol,
    /// emit `InplaceOp`, and write back; on a member/subscript LHS they
    /// load, apply, and store back (§4.5.2).
    fn gen_assign(&mut self, b: &mut IrBuilder<'a>, s: &AssignStmt) {
        let pos = s.op_pos;
        let value = self.gen_expr(b, &s.value);

        match s.target.as_ref() {
            Expr::Variable(v) => {
                let symbol = v.symbol.get();
                let result = self.gen_assign_to_symbol(b, symbol, s.op, value, pos);
                b.write_symbol(pos, symbol, result);
            }
            Expr::SelfExpr(se) => {
                let symbol = se.symbol.get();
                let result = self.gen_assign_to_symbol(b, symbol, s.op, value, pos);
                b.write_symbol(pos, symbol, result);
            }
            Expr::MemberAccess(m) => {
                let target = self.gen_expr(b, &m.target);
                let result = if s.op == AssignOp::Assign {
                    value
                } else {
                    let old = b.new_register();
                    b.push(IrStmt::GetMember(GetMemberOp { pos, ret: old, target, member: m.member.as_str().to_string() }));
                    let ret = b.new_register();
                    b.push(IrStmt::Inplace(InplaceOp { pos, op: s.op.into(), ret, target: old, value }));
                    ret
                };
                b.push(IrStmt::SetMember(SetMemberOp { pos, target, member: m.member.as_str().to_string(), value: result }));
            }
            Expr::Subscript(sub) => {
                let target = self.gen_expr(b, &sub.target);
                let index = self.gen_expr(b, &sub.index);
                let result = if s.op == AssignOp::Assign {
                    value
                } else {
                    let old = b.new_register();
                    b.push(IrStmt::GetSubscript(GetSubscriptOp { pos, ret: old, target, index }));
                    let ret = b.new_register();
                    b.push(IrStmt::Inplace(InplaceOp { pos, op: s.op.into(), ret, target: old, value }));
                    ret
                };
                b.push(IrStmt::SetSubscript(SetSubscriptOp { pos, target, index, value: result }));
            }
            _ => unreachable!("parser only produces assignable lvalues as AssignStmt.target"),
        }
    }

    fn gen_assign_to_symbol(&mut self, b: &mut IrBuilder<'a>, symbol: SymbolId, op: AssignOp, value: IrValue, pos: SourcePosition) -> IrValue {
        if op == AssignOp::Assign {
            return value;
        }
        let old = b.read_symbol(pos, symbol);
        let ret = b.new_register();
        b.push(IrStmt::Inplace(InplaceOp { pos, op: op.into(), ret, target: old, value }));
        ret
    }

    // ----- expressions -----

    fn gen_expr(&mut self, b: &mut IrBuilder<'a>, expr: &Expr) -> IrValue {
        match expr {
            Expr::Invalid(_) => b.read_const(SourcePosition::synthetic(), Value::None),
            Expr::Literal(l) => self.gen_literal(b, l),
            Expr::Variable(v) => b.read_symbol(v.range.begin, v.symbol.get()),
            Expr::SelfExpr(s) => b.read_symbol(s.range.begin, s.symbol.get()),
            Expr::Super(s) => b.read_symbol(s.range.begin, s.symbol.get()),
            Expr::Binary(e) => self.gen_binary(b, e),
            Expr::Unary(e) => self.gen_unary(b, e),
            Expr::Logic(e) => self.gen_logic(b, e),
            Expr::Defined(e) => self.gen_defined(b, e),
            Expr::Raise(e) => {
                let value = self.gen_expr(b, &e.value);
                b.push(IrStmt::Raise(RaiseOp { pos: e.raise_pos, throwable: value }));
                b.read_const(e.raise_pos, Value::None)
            }
            Expr::TypeTest(e) => self.gen_type_test(b, e),
            Expr::ContainmentTest(e) => self.gen_containment_test(b, e),
            Expr::Ternary(e) => self.gen_ternary(b, e),
            Expr::MemberAccess(e) => {
                let target = self.gen_expr(b, &e.target);
                let ret = b.new_register();
                b.push(IrStmt::GetMember(GetMemberOp { pos: e.dot_pos, ret, target, member: e.member.as_str().to_string() }));
                ret
            }
            Expr::Subscript(e) => {
                let target = self.gen_expr(b, &e.target);
                let index = self.gen_expr(b, &e.index);
                let ret = b.new_register();
                b.push(IrStmt::GetSubscript(GetSubscriptOp { pos: e.open, ret, target, index }));
                ret
            }
            Expr::Invoke(e) => self.gen_invoke(b, e),
            Expr::Closure(e) => self.gen_closure(b, e),
            Expr::MakeList(e) => self.gen_make_list(b, e),
            Expr::MakeMap(e) => self.gen_make_map(b, e),
        }
    }

    fn gen_literal(&mut self, b: &mut IrBuilder<'a>, l: &LiteralExpr) -> IrValue {
        match &l.value {
            Literal::Integer(i) => b.read_const(l.range.begin, Value::Integer(*i)),
            Literal::Float(f) => b.read_const(l.range.begin, Value::Float(*f)),
            Literal::Boolean(v) => b.read_const(l.range.begin, Value::Boolean(*v)),
            Literal::String(s) => b.read_const(l.range.begin, Value::String(s.clone())),
            Literal::None => b.read_const(l.range.begin, Value::None),
            Literal::Interpolated { template, parts } => {
                let template_reg = b.read_const(l.range.begin, Value::String(template.clone()));
                let args: Vec<IrValue> = parts.iter().map(|p| self.gen_expr(b, p)).collect();
                let ret = b.new_register();
                b.push(IrStmt::Invoke(InvokeOp {
                    pos: l.range.begin,
                    ret,
                    target: template_reg,
                    member: "Format".to_string(),
                    args,
                }));
                ret
            }
        }
    }

    fn gen_binary(&mut self, b: &mut IrBuilder<'a>, e: &BinaryExpr) -> IrValue {
        let left = self.gen_expr(b, &e.left);
        let right = self.gen_expr(b, &e.right);
        let ret = b.new_register();
        if is_relational(e.op) {
            b.push(IrStmt::Test(TestOp { pos: e.op_pos, ret, kind: e.op.into(), left, right }));
        } else {
            b.push(IrStmt::Binary(IrBinaryOp { pos: e.op_pos, op: e.op.into(), ret, left, right }));
        }
        ret
    }

    fn gen_unary(&mut self, b: &mut IrBuilder<'a>, e: &UnaryExpr) -> IrValue {
        let value = self.gen_expr(b, &e.operand);
        match e.op {
            UnaryOp::Plus => value,
            UnaryOp::Minus => {
                let ret = b.new_register();
                b.push(IrStmt::Unary(IrUnaryOp { pos: e.op_pos, op: UnaryOpKind::Neg, ret, value }));
                ret
            }
            UnaryOp::BitNot => {
                let ret = b.new_register();
                b.push(IrStmt::Unary(IrUnaryOp { pos: e.op_pos, op: UnaryOpKind::BitNot, ret, value }));
                ret
            }
            UnaryOp::Not => {
                let ret = b.new_register();
                b.push(IrStmt::Unary(IrUnaryOp { pos: e.op_pos, op: UnaryOpKind::Not, ret, value }));
                ret
            }
        }
    }

    /// `a and b` / `a or b` → evaluate `a`; `BrCond` to rightBB or mergeBB;
    /// `Select` at merge (§4.5.2).
    fn gen_logic(&mut self, b: &mut IrBuilder<'a>, e: &LogicExpr) -> IrValue {
        let left = self.gen_expr(b, &e.left);
        let left_bb = b.current_block();
        let right_bb = b.create_block();
        let merge_bb = b.create_block();

        let (on_true, on_false) = match e.op {
            LogicOp::And => (right_bb, merge_bb),
            LogicOp::Or => (merge_bb, right_bb),
        };
        b.add_edge(left_bb, right_bb);
        b.add_edge(left_bb, merge_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos: e.op_pos, cond: left, on_true, on_false }));

        b.set_block(right_bb, true);
        let right = self.gen_expr(b, &e.right);
        let right_tail_bb = b.current_block();
        b.add_edge(right_tail_bb, merge_bb);
        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));

        b.set_block(merge_bb, true);
        let ret = b.new_register();
        b.push(IrStmt::Select(SelectOp { ret, targets: vec![left, right] }));
        ret
    }

    fn gen_defined(&mut self, b: &mut IrBuilder<'a>, e: &DefinedExpr) -> IrValue {
        let target = e.container.as_ref().map(|c| self.gen_expr(b, c));
        let id = Value::String(e.name.as_str().to_string());
        let ret = b.new_register();
        b.push(IrStmt::Defined(DefinedOp { pos: e.defined_pos, ret, id, target }));
        ret
    }

    /// `is T`/`is not T` → `Test` with `Instance`/`NotInstance`; operands
    /// are the target value and the type's symbol loaded via `LoadSymbol`
    /// (§4.5.2).
    fn gen_type_test(&mut self, b: &mut IrBuilder<'a>, e: &TypeTestExpr) -> IrValue {
        let value = self.gen_expr(b, &e.value);
        let type_symbol = e.symbol.get();
        let ty = b.read_symbol(e.is_pos, type_symbol);
        let kind = if e.not_pos.is_some() { TestKind::NotInstance } else { TestKind::Instance };
        let ret = b.new_register();
        b.push(IrStmt::Test(TestOp { pos: e.is_pos, ret, kind, left: value, right: ty }));
        ret
    }

    /// `a in b`/`a not in b` → `Test` with `Contain`/`NotContain`; per §9's
    /// resolved open question, the sequence (`target`) is the left operand
    /// and the tested element (`value`) is the right, matching the original
    /// implementation's operand order despite the surface syntax reading
    /// element-first.
    fn gen_containment_test(&mut self, b: &mut IrBuilder<'a>, e: &ContainmentTestExpr) -> IrValue {
        let value = self.gen_expr(b, &e.value);
        let target = self.gen_expr(b, &e.target);
        let kind = if e.is_negated() { TestKind::NotContain } else { TestKind::Contain };
        let ret = b.new_register();
        b.push(IrStmt::Test(TestOp { pos: e.in_pos, ret, kind, left: target, right: value }));
        ret
    }

    /// `expr1 if cond else expr2` → `BrCond` to two blocks assigning
    /// `expr1`/`expr2`, `Select` at the merge (§4.5.2).
    fn gen_ternary(&mut self, b: &mut IrBuilder<'a>, e: &TernaryExpr) -> IrValue {
        let cond = self.gen_expr(b, &e.condition);
        let then_bb = b.create_block();
        let else_bb = b.create_block();
        let merge_bb = b.create_block();

        b.add_edge(b.current_block(), then_bb);
        b.add_edge(b.current_block(), else_bb);
        b.push(IrStmt::BrCond(ConditionalBranchOp { pos: e.if_pos, cond, on_true: then_bb, on_false: else_bb }));

        b.set_block(then_bb, true);
        let then_value = self.gen_expr(b, &e.then_value);
        let then_tail = b.current_block();
        b.add_edge(then_tail, merge_bb);
        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));

        b.set_block(else_bb, true);
        let else_value = self.gen_expr(b, &e.else_value);
        let else_tail = b.current_block();
        b.add_edge(else_tail, merge_bb);
        b.push(IrStmt::Br(BranchOp { pos: SourcePosition::synthetic(), target: merge_bb }));

        b.set_block(merge_bb, true);
        let ret = b.new_register();
        b.push(IrStmt::Select(SelectOp { ret, targets: vec![then_value, else_value] }));
        ret
    }

    /// `self(args)`/`super(args)` desugar to `Invoke(<target>, "<init>",
    /// args)`; a plain call chooses `Call` for a function-like callee or
    /// `Invoke` when the callee is a member access (§4.5.2).
    fn gen_invoke(&mut self, b: &mut IrBuilder<'a>, e: &InvokeExpr) -> IrValue {
        let pos = e.open;
        match e.callee.as_ref() {
            Expr::SelfExpr(s) => {
                let target = b.read_symbol(pos, s.symbol.get());
                let args: Vec<IrValue> = e.args.iter().map(|a| self.gen_expr(b, a)).collect();
                let ret = b.new_register();
                b.push(IrStmt::Invoke(InvokeOp { pos, ret, target, member: "<init>".to_string(), args }));
                ret
            }
            Expr::Super(s) => {
                let target = b.read_symbol(pos, s.symbol.get());
                let args: Vec<IrValue> = e.args.iter().map(|a| self.gen_expr(b, a)).collect();
                let ret = b.new_register();
                b.push(IrStmt::Invoke(InvokeOp { pos, ret, target, member: "<init>".to_string(), args }));
                ret
            }
            Expr::MemberAccess(m) => {
                let target = self.gen_expr(b, &m.target);
                let args: Vec<IrValue> = e.args.iter().map(|a| self.gen_expr(b, a)).collect();
                let ret = b.new_register();
                b.push(IrStmt::Invoke(InvokeOp { pos, ret, target, member: m.member.as_str().to_string(), args }));
                ret
            }
            _ => {
                let target = self.gen_expr(b, &e.callee);
                let args: Vec<IrValue> = e.args.iter().map(|a| self.gen_expr(b, a)).collect();
                let ret = b.new_register();
                b.push(IrStmt::Call(CallOp { pos, ret, target, args }));
                ret
            }
        }
    }

    /// Compiles the closure body into its own `IrCodeBlock`, then emits
    /// `MakeClosure` reading each bounded local's current SSA value at the
    /// construction site (§4.5.2). `e.bounded_locals` holds `BoundedLocal`
    /// wrapper ids (§4.4): `captures` is read from the *enclosing* builder by
    /// each wrapper's `inner`, while the closure's own builder binds the
    /// wrapper ids themselves as its leading arguments, exactly like a
    /// method's `self` -- so a read of the captured variable inside the
    /// closure body resolves to that bound register instead of falling
    /// through to a by-name global load.
    fn gen_closure(&mut self, b: &mut IrBuilder<'a>, e: &ClosureExpr) -> IrValue {
        let symbol = e.symbol.get();
        let name = mangled_name(self.symbols, symbol);
        let params: Vec<SymbolId> = e.params.params.iter().map(|p| p.symbol.get()).collect();
        let pos = e.arrow;

        let bounded = e.bounded_locals.get();
        let captures: Vec<IrValue> = bounded.iter().map(|&wrapper| b.read_symbol(pos, bounded_local_inner(self.symbols, wrapper))).collect();

        let code = self.gen_function_body(&name, params, e.params.is_vararg(), &e.body, bounded);
        self.output.push(code);

        let ret = b.new_register();
        b.push(IrStmt::MakeClosure(MakeClosureOp { pos, ret, symbol, captures }));
        ret
    }

    fn gen_make_list(&mut self, b: &mut IrBuilder<'a>, e: &MakeListExpr) -> IrValue {
        let args: Vec<IrValue> = e.items.iter().map(|item| self.gen_expr(b, &item.value)).collect();
        let ret = b.new_register();
        b.push(IrStmt::Make(MakeOp { pos: e.open, kind: MakeKind::List, ret, args }));
        ret
    }

    fn gen_make_map(&mut self, b: &mut IrBuilder<'a>, e: &MakeMapExpr) -> IrValue {
        let mut args = Vec::with_capacity(e.entries.len() * 2);
        for entry in &e.entries {
            args.push(self.gen_expr(b, &entry.key));
            args.push(self.gen_expr(b, &entry.value));
        }
        let ret = b.new_register();
        b.push(IrStmt::Make(MakeOp { pos: e.open, kind: MakeKind::Map, ret, args }));
        ret
    }
}

fn is_relational(op: bsc_ast::BinaryOp) -> bool {
    use bsc_ast::BinaryOp::*;
    matches!(op, Less | LessOrEqual | Grater | GraterOrEqual | Equal | NotEqual)
}

fn mangled_name(symbols: &SymbolTable, id: SymbolId) -> String {
    let symbol = symbols.get(id);
    match &symbol.kind {
        SymbolKind::Function(f) => bsc_sema::mangle(&symbol.name, f.argc, f.vararg),
        SymbolKind::Method(m) => bsc_sema::mangle(&symbol.name, m.argc, m.vararg),
        _ => symbol.name.clone(),
    }
}

/// Unwraps a `BoundedLocal` wrapper id to the outer symbol it captures, so
/// `gen_closure` can read its current SSA value in the enclosing builder.
fn bounded_local_inner(symbols: &SymbolTable, id: SymbolId) -> SymbolId {
    match &symbols.get(id).kind {
        SymbolKind::BoundedLocal(b) => b.inner,
        _ => id,
    }
}

fn class_base(symbols: &SymbolTable, id: SymbolId) -> Option<SymbolId> {
    match &symbols.get(id).kind {
        SymbolKind::Class(ClassSymbol { base, .. }) => *base,
        SymbolKind::Task(TaskSymbol { base, .. }) => *base,
        _ => None,
    }
}
