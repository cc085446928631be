use bsc_ast::*;
use bsc_errors::ErrorCode;
use bsc_lexer::TokenKind;
use bsc_span::{Identifier, SourcePosition, SourceRange};

use crate::parser::Parser;

impl<'h> Parser<'h> {
    /// Top level (§4.3): `import`, `export`, `def`, `class`, `task`, and
    /// variable declarations (`var`, `const`; `static` accepted only for
    /// diagnostics). Returns `None` so the caller falls through to
    /// `parse_statement()`.
    pub(crate) fn try_parse_declaration(&mut self) -> Option<Decl> {
        match self.peek_kind() {
            TokenKind::Import => Some(self.parse_import_decl()),
            TokenKind::Export => Some(self.parse_export_decl()),
            TokenKind::Def => Some(Decl::Function(self.parse_function_decl())),
            TokenKind::Class => Some(Decl::Class(self.parse_class_decl())),
            TokenKind::Task => Some(Decl::Task(self.parse_task_decl())),
            TokenKind::Var | TokenKind::Const | TokenKind::Static => Some(Decl::Var(self.parse_var_decl(true))),
            _ => None,
        }
    }

    /// Local declarations allowed inside a block body: only `var`/`const`
    /// locals (import/export/class/task are top-level-only per §4.3).
    pub(crate) fn try_parse_local_declaration(&mut self) -> Option<Decl> {
        match self.peek_kind() {
            TokenKind::Var | TokenKind::Const => Some(Decl::Var(self.parse_var_decl(false))),
            _ => None,
        }
    }

    fn parse_import_decl(&mut self) -> Decl {
        let import_pos = self.bump().range.begin;
        let name = self.expect_identifier();
        let (as_pos, alias) = if self.at(TokenKind::As) { (Some(self.bump().range.begin), Some(self.expect_identifier())) } else { (None, None) };
        let end = alias.as_ref().map(|a| a.range.end).unwrap_or(name.range.end);
        Decl::Import(ImportDecl { range: SourceRange::new(import_pos, end), import_pos, name, as_pos, alias, symbol: OneWrite::empty() })
    }

    fn parse_export_decl(&mut self) -> Decl {
        let export_pos = self.bump().range.begin;
        let inner = self.try_parse_declaration().unwrap_or_else(|| {
            self.handler.error(ErrorCode::CannotExportHere, export_pos, "`export` must be followed by a declaration");
            Decl::Invalid(SourceRange::point(self.here()))
        });
        let range = SourceRange::new(export_pos, inner.range().end);
        Decl::Export(ExportDecl { range, export_pos, inner: Box::new(inner) })
    }

    /// Access-modifier parsing (§4.3.x): collects `const`/`static`/`var`
    /// into an `AccessFlags` plus the first-modifier position, diagnosing
    /// duplicates as "redundant keyword". `top_level` controls whether a
    /// bare `var`/`const` without `static` is legal here (class fields
    /// require `const`/`static`; script/local variables require neither).
    fn parse_access_flags(&mut self) -> (AccessFlags, SourcePosition) {
        let mut flags = AccessFlags::default();
        let first = self.here();
        loop {
            match self.peek_kind() {
                TokenKind::Const if !flags.is_const => {
                    flags.is_const = true;
                    self.bump();
                }
                TokenKind::Static if !flags.is_static => {
                    flags.is_static = true;
                    self.bump();
                }
                TokenKind::Var if !flags.is_var => {
                    flags.is_var = true;
                    self.bump();
                }
                TokenKind::Const | TokenKind::Static | TokenKind::Var => {
                    let pos = self.here();
                    self.handler.warn(ErrorCode::RedundantModifier, pos, "redundant keyword");
                    self.bump();
                }
                _ => break,
            }
        }
        (flags, first)
    }

    fn parse_var_decl(&mut self, top_level: bool) -> VarDecl {
        let (flags, keyword_pos) = self.parse_access_flags();
        if top_level && flags.is_static {
            self.handler.error(ErrorCode::ExpectedModifier, keyword_pos, "`static` is only valid inside a class");
        }
        if !top_level && flags.is_var {
            self.handler.error(ErrorCode::ExpectedModifier, keyword_pos, "`var` is only valid outside a class");
        }
        let name = self.expect_identifier();
        let (eq_pos, initializer) = if self.at(TokenKind::Assign) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = initializer.as_ref().map(|e| e.range().end).unwrap_or(name.range.end);
        VarDecl { range: SourceRange::new(keyword_pos, end), flags, keyword_pos, name, eq_pos, initializer, symbol: OneWrite::empty() }
    }

    pub(crate) fn parse_parameter_list(&mut self) -> Parameters {
        let open = self.expect(TokenKind::LeftParen, "`(`");
        let mut params = Vec::new();
        let mut commas = Vec::new();
        let mut vararg = None;

        if !self.at(TokenKind::RightParen) {
            loop {
                if self.at(TokenKind::Ellipsis) {
                    vararg = Some(self.bump().range.begin);
                    break;
                }
                params.push(Parameter::new(self.expect_identifier()));
                if self.at(TokenKind::Comma) {
                    commas.push(self.bump().range.begin);
                    if self.at(TokenKind::RightParen) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        let close = self.here();
        self.expect(TokenKind::RightParen, "`)`");
        let range = SourceRange::new(open, self.prev_end());
        Parameters { range, open, params, commas, vararg, close }
    }

    fn parse_function_decl(&mut self) -> FunctionDecl {
        let def_pos = self.bump().range.begin;
        let name = self.expect_identifier();
        let params = self.parse_parameter_list();
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(def_pos, body.range().end);
        FunctionDecl { range, def_pos, name, params, body, symbol: OneWrite::empty() }
    }

    // ----- classes -----

    fn parse_class_decl(&mut self) -> ClassDecl {
        let class_pos = self.bump().range.begin;
        let name = self.expect_identifier();
        let (extends_pos, base) = self.parse_optional_extends();
        let open = self.expect(TokenKind::LeftBrace, "`{`");
        let mut members = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            members.push(self.parse_class_member());
        }
        let close = self.here();
        self.expect(TokenKind::RightBrace, "`}`");
        let range = SourceRange::new(class_pos, self.prev_end());
        ClassDecl { range, class_pos, name, extends_pos, base, open, members, close, symbol: OneWrite::empty() }
    }

    fn parse_optional_extends(&mut self) -> (Option<SourcePosition>, Option<Identifier>) {
        if self.at(TokenKind::Extends) {
            let pos = self.bump().range.begin;
            let name = self.expect_identifier();
            (Some(pos), Some(name))
        } else {
            (None, None)
        }
    }

    /// Dispatch on the current token (§4.3): `init`, `deinit`, `get`/`set`
    /// (property), `def` (method or static method -- a reversed `static`
    /// after `def` is a specific diagnostic), or an identifier (field,
    /// requiring `const`/`static`).
    fn parse_class_member(&mut self) -> ClassMember {
        match self.peek_kind() {
            TokenKind::Init => ClassMember::Init(self.parse_init_decl()),
            TokenKind::Deinit => ClassMember::Deinit(self.parse_deinit_decl()),
            TokenKind::Get => ClassMember::Method(self.parse_accessor_method(MethodKind::Getter)),
            TokenKind::Set => ClassMember::Method(self.parse_accessor_method(MethodKind::Setter)),
            TokenKind::Def => ClassMember::Method(self.parse_def_method()),
            TokenKind::Static if self.cursor.at_n(1, TokenKind::Def) => {
                let static_pos = self.bump().range.begin;
                let mut method = self.parse_def_method();
                method.kind = MethodKind::StaticMethod;
                method.range = SourceRange::new(static_pos, method.range.end);
                ClassMember::Method(method)
            }
            TokenKind::Const | TokenKind::Static => ClassMember::Field(self.parse_field_decl()),
            TokenKind::Identifier => {
                self.handler.error(ErrorCode::ExpectedModifier, self.here(), "a class field requires `const` or `static`");
                ClassMember::Field(self.parse_field_decl())
            }
            _ => {
                let pos = self.here();
                self.handler.error(ErrorCode::UnexpectedToken, pos, format!("unexpected token {:?} in class body", self.peek_kind()));
                self.recover_to_member_boundary();
                ClassMember::Field(FieldDecl {
                    range: SourceRange::point(pos),
                    flags: AccessFlags::default(),
                    name: Identifier::new(SourceRange::point(pos), String::new()),
                    eq_pos: None,
                    initializer: None,
                    symbol: OneWrite::empty(),
                })
            }
        }
    }

    fn parse_init_decl(&mut self) -> InitDecl {
        let init_pos = self.bump().range.begin;
        let params = self.parse_parameter_list();
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(init_pos, body.range().end);
        InitDecl { range, init_pos, params, body, symbol: OneWrite::empty(), initializer_call: OneWrite::empty() }
    }

    fn parse_deinit_decl(&mut self) -> DeinitDecl {
        let deinit_pos = self.bump().range.begin;
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(deinit_pos, body.range().end);
        DeinitDecl { range, deinit_pos, body, symbol: OneWrite::empty() }
    }

    fn parse_accessor_method(&mut self, kind: MethodKind) -> MethodDecl {
        let def_pos = self.bump().range.begin;
        let name = self.expect_identifier();
        let params = self.parse_parameter_list();
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(def_pos, body.range().end);
        MethodDecl { range, def_pos, kind, name, params, body, symbol: OneWrite::empty() }
    }

    fn parse_def_method(&mut self) -> MethodDecl {
        let def_pos = self.bump().range.begin;
        if self.at(TokenKind::Static) {
            let pos = self.here();
            self.handler.error(ErrorCode::ExpectedModifier, pos, "`static` must come before `def`, not after");
            self.bump();
        }
        let kind = if self.at(TokenKind::Operator) {
            self.bump();
            MethodKind::Operator
        } else {
            MethodKind::Method
        };
        let name = self.expect_identifier();
        let params = self.parse_parameter_list();
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(def_pos, body.range().end);
        MethodDecl { range, def_pos, kind, name, params, body, symbol: OneWrite::empty() }
    }

    fn parse_field_decl(&mut self) -> FieldDecl {
        let (flags, start) = self.parse_access_flags();
        let name = self.expect_identifier();
        let (eq_pos, initializer) = if self.at(TokenKind::Assign) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = initializer.as_ref().map(|e| e.range().end).unwrap_or(name.range.end);
        FieldDecl { range: SourceRange::new(start, end), flags, name, eq_pos, initializer, symbol: OneWrite::empty() }
    }

    fn recover_to_member_boundary(&mut self) {
        while !matches!(
            self.peek_kind(),
            TokenKind::Init
                | TokenKind::Deinit
                | TokenKind::Get
                | TokenKind::Set
                | TokenKind::Def
                | TokenKind::Static
                | TokenKind::Const
                | TokenKind::Identifier
                | TokenKind::Inputs
                | TokenKind::Outputs
                | TokenKind::Do
                | TokenKind::DoFirst
                | TokenKind::DoLast
                | TokenKind::RightBrace
                | TokenKind::EndOfFile
        ) {
            self.skip_token_expr();
        }
    }

    // ----- tasks -----

    fn parse_task_decl(&mut self) -> TaskDecl {
        let task_pos = self.bump().range.begin;
        let name = self.expect_identifier();
        let (extends_pos, base) = self.parse_optional_extends();

        let (depends_on_pos, dependencies) = if self.at(TokenKind::DependsOn) {
            let pos = self.bump().range.begin;
            let mut deps = vec![self.expect_identifier()];
            while self.at(TokenKind::Comma) {
                self.bump();
                deps.push(self.expect_identifier());
            }
            (Some(pos), deps)
        } else {
            (None, Vec::new())
        };

        // A reversed `extends` after `dependsOn` is a specific diagnostic
        // (§4.3): the dependency list is parsed eagerly, so a trailing
        // `extends` at this point is necessarily out of order.
        if self.at(TokenKind::Extends) {
            let pos = self.here();
            self.handler.error(ErrorCode::UnexpectedToken, pos, "`extends` must come before `dependsOn`");
            self.bump();
            self.expect_identifier();
        }

        let open = self.expect(TokenKind::LeftBrace, "`{`");
        let mut members = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            members.push(self.parse_task_member());
        }
        let close = self.here();
        self.expect(TokenKind::RightBrace, "`}`");
        let range = SourceRange::new(task_pos, self.prev_end());
        TaskDecl { range, task_pos, name, extends_pos, base, depends_on_pos, dependencies, open, members, close, symbol: OneWrite::empty() }
    }

    /// `inputs`, `outputs`, `do`/`doFirst`/`doLast` (actions), or an
    /// identifier (property) (§4.3).
    fn parse_task_member(&mut self) -> TaskMember {
        match self.peek_kind() {
            TokenKind::Inputs => TaskMember::Inputs(self.parse_task_inputs()),
            TokenKind::Outputs => TaskMember::Outputs(self.parse_task_outputs()),
            TokenKind::Do => TaskMember::Action(self.parse_task_action(ActionKind::Do)),
            TokenKind::DoFirst => TaskMember::Action(self.parse_task_action(ActionKind::DoFirst)),
            TokenKind::DoLast => TaskMember::Action(self.parse_task_action(ActionKind::DoLast)),
            TokenKind::Identifier => TaskMember::Property(self.parse_task_property()),
            _ => {
                let pos = self.here();
                self.handler.error(ErrorCode::UnexpectedToken, pos, format!("unexpected token {:?} in task body", self.peek_kind()));
                self.recover_to_member_boundary();
                TaskMember::Property(TaskPropertyDecl {
                    range: SourceRange::point(pos),
                    name: Identifier::new(SourceRange::point(pos), String::new()),
                    eq_pos: None,
                    initializer: None,
                    symbol: OneWrite::empty(),
                })
            }
        }
    }

    fn parse_task_inputs(&mut self) -> TaskInputsDecl {
        let inputs_pos = self.bump().range.begin;
        let pattern = Box::new(self.parse_expression());
        let (with_pos, resolver) = if self.at(TokenKind::With) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = resolver.as_ref().map(|r| r.range().end).unwrap_or_else(|| pattern.range().end);
        TaskInputsDecl { range: SourceRange::new(inputs_pos, end), inputs_pos, pattern, with_pos, resolver }
    }

    fn parse_task_outputs(&mut self) -> TaskOutputsDecl {
        let outputs_pos = self.bump().range.begin;
        let pattern = Box::new(self.parse_expression());
        let (from_pos, source) = if self.at(TokenKind::From) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = source.as_ref().map(|s| s.range().end).unwrap_or_else(|| pattern.range().end);
        TaskOutputsDecl { range: SourceRange::new(outputs_pos, end), outputs_pos, pattern, from_pos, source }
    }

    fn parse_task_action(&mut self, kind: ActionKind) -> TaskActionDecl {
        let keyword_pos = self.bump().range.begin;
        let body = Box::new(self.parse_block_statement());
        let range = SourceRange::new(keyword_pos, body.range().end);
        TaskActionDecl { range, keyword_pos, kind, body, symbol: OneWrite::empty() }
    }

    fn parse_task_property(&mut self) -> TaskPropertyDecl {
        let name = self.expect_identifier();
        let (eq_pos, initializer) = if self.at(TokenKind::Assign) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = initializer.as_ref().map(|e| e.range().end).unwrap_or(name.range.end);
        TaskPropertyDecl { range: SourceRange::new(name.range.begin, end), name, eq_pos, initializer, symbol: OneWrite::empty() }
    }
}
