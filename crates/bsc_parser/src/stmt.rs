use bsc_ast::*;
use bsc_errors::ErrorCode;
use bsc_lexer::TokenKind;
use bsc_span::SourceRange;

use crate::parser::Parser;

/// Statement-level synchronization tokens: a token the recovery skip should
/// stop *before* so the outer declaration/statement parser can resume.
fn is_statement_sync(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RightBrace
            | TokenKind::EndOfFile
            | TokenKind::Var
            | TokenKind::Const
            | TokenKind::Def
            | TokenKind::Class
            | TokenKind::Task
            | TokenKind::Import
            | TokenKind::Export
            | TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Match
            | TokenKind::Try
            | TokenKind::With
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
    )
}

impl<'h> Parser<'h> {
    pub fn parse_statement(&mut self) -> Stmt {
        match self.peek_kind() {
            TokenKind::LeftBrace => self.parse_block_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Match => self.parse_match_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Assert => self.parse_assert_statement(),
            TokenKind::Pass => {
                let r = self.bump().range;
                Stmt::Pass(PassStmt { range: r, pass_pos: r.begin })
            }
            _ => self.parse_expr_or_assign_statement(),
        }
    }

    pub(crate) fn parse_block_statement(&mut self) -> Stmt {
        let open = self.here();
        self.expect(TokenKind::LeftBrace, "`{`");
        let mut body = Vec::new();
        while !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
            if let Some(decl) = self.try_parse_local_declaration() {
                body.push(Item::Decl(decl));
            } else {
                body.push(Item::Stmt(self.parse_statement()));
            }
        }
        let close = self.here();
        self.expect(TokenKind::RightBrace, "`}`");
        let range = SourceRange::new(open, self.prev_end());
        Stmt::Block(BlockStmt { range, open, close, body })
    }

    fn parse_if_statement(&mut self) -> Stmt {
        let if_pos = self.bump().range.begin;
        let condition = self.parse_expression();
        let if_body = Box::new(self.parse_block_statement());
        let (else_pos, else_body) = if self.at(TokenKind::Else) {
            let else_pos = self.bump().range.begin;
            let body = if self.at(TokenKind::If) { self.parse_if_statement() } else { self.parse_block_statement() };
            (Some(else_pos), Some(Box::new(body)))
        } else {
            (None, None)
        };
        let end = else_body.as_ref().map(|b| b.range().end).unwrap_or_else(|| if_body.range().end);
        Stmt::If(IfStmt { range: SourceRange::new(if_pos, end), if_pos, condition: Box::new(condition), if_body, else_pos, else_body })
    }

    /// `match` requires at least one labeled arm (§4.3); each arm is one or
    /// more stacked `case <constant>:`/`default:` labels followed by its
    /// body statements, surfaced as a `Stmt::Labeled`.
    fn parse_match_statement(&mut self) -> Stmt {
        let match_pos = self.bump().range.begin;
        let condition = self.parse_expression();
        let open = self.expect(TokenKind::LeftBrace, "`{`");
        let mut arms = Vec::new();
        let mut saw_default = false;
        while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
            let mut labels = Vec::new();
            while self.at(TokenKind::Case) || self.at(TokenKind::Default) {
                let is_default = self.at(TokenKind::Default);
                let keyword = self.bump().range.begin;
                let value = if is_default { None } else { Some(Box::new(self.parse_expression())) };
                let colon = self.expect(TokenKind::Colon, "`:`");
                let range = SourceRange::new(keyword, colon);
                if is_default {
                    if saw_default {
                        self.handler.error(ErrorCode::DuplicateDefaultLabel, keyword, "duplicate `default` label");
                    }
                    saw_default = true;
                }
                labels.push(Label { range, keyword, value, colon, is_default, evaluated_value: OneWrite::empty() });
            }
            let arm_start = labels[0].range.begin;
            let mut body = Vec::new();
            while !self.at(TokenKind::Case) && !self.at(TokenKind::Default) && !self.at(TokenKind::RightBrace) && !self.at(TokenKind::EndOfFile) {
                if let Some(decl) = self.try_parse_local_declaration() {
                    body.push(Item::Decl(decl));
                } else {
                    body.push(Item::Stmt(self.parse_statement()));
                }
            }
            let arm_end = body.last().map(|i| i.range().end).unwrap_or(arm_start);
            arms.push(Stmt::Labeled(LabeledStmt { range: SourceRange::new(arm_start, arm_end), labels, body }));
        }
        if arms.is_empty() {
            self.handler.error(ErrorCode::ExpectedStatement, self.here(), "`match` requires at least one `case`/`default` arm");
        }
        let close = self.here();
        self.expect(TokenKind::RightBrace, "`}`");
        let range = SourceRange::new(match_pos, self.prev_end());
        Stmt::Match(MatchStmt { range, match_pos, condition: Box::new(condition), open, close, arms })
    }

    /// `for id in expr body` introduces a new Loop scope with `id` bound
    /// read-only for the duration of `body` (§4.3).
    fn parse_for_statement(&mut self) -> Stmt {
        let for_pos = self.bump().range.begin;
        let param = self.expect_identifier();
        let in_pos = self.expect(TokenKind::In, "`in`");
        let expr = self.parse_expression();
        let body = self.parse_block_statement();
        let range = SourceRange::new(for_pos, body.range().end);
        Stmt::For(ForStmt { range, for_pos, param, in_pos, expr: Box::new(expr), body: Box::new(body), symbol: OneWrite::empty() })
    }

    fn parse_while_statement(&mut self) -> Stmt {
        let while_pos = self.bump().range.begin;
        let condition = self.parse_expression();
        let body = self.parse_block_statement();
        let range = SourceRange::new(while_pos, body.range().end);
        Stmt::While(WhileStmt { range, while_pos, condition: Box::new(condition), body: Box::new(body) })
    }

    fn parse_with_statement(&mut self) -> Stmt {
        let with_pos = self.bump().range.begin;
        let expr = self.parse_expression();
        let (as_pos, capture) = if self.at(TokenKind::As) {
            (Some(self.bump().range.begin), Some(self.expect_identifier()))
        } else {
            (None, None)
        };
        let body = self.parse_block_statement();
        let range = SourceRange::new(with_pos, body.range().end);
        Stmt::With(WithStmt { range, with_pos, expr: Box::new(expr), as_pos, capture, body: Box::new(body), symbol: OneWrite::empty() })
    }

    /// `try` requires a body plus at least one `except`/`finally` (§4.3).
    fn parse_try_statement(&mut self) -> Stmt {
        let try_pos = self.bump().range.begin;
        let body = self.parse_block_statement();
        let mut handlers = Vec::new();
        while self.at(TokenKind::Except) {
            handlers.push(self.parse_except_clause());
        }
        if self.at(TokenKind::Finally) {
            handlers.push(self.parse_finally_clause());
        }
        if handlers.is_empty() {
            self.handler.error(ErrorCode::ExpectedStatement, self.here(), "`try` requires at least one `except` or `finally`");
        }
        let end = handlers.last().map(|h| h.range().end).unwrap_or_else(|| body.range().end);
        Stmt::Try(TryStmt { range: SourceRange::new(try_pos, end), try_pos, body: Box::new(body), handlers })
    }

    fn parse_except_clause(&mut self) -> Stmt {
        let except_pos = self.bump().range.begin;
        let type_name = self.expect_identifier();
        let (as_pos, capture) = if self.at(TokenKind::As) {
            (Some(self.bump().range.begin), Some(self.expect_identifier()))
        } else {
            (None, None)
        };
        let body = self.parse_block_statement();
        let range = SourceRange::new(except_pos, body.range().end);
        Stmt::Except(ExceptStmt { range, except_pos, type_name, as_pos, capture, body: Box::new(body), symbol: OneWrite::empty() })
    }

    fn parse_finally_clause(&mut self) -> Stmt {
        let finally_pos = self.bump().range.begin;
        let body = self.parse_block_statement();
        let range = SourceRange::new(finally_pos, body.range().end);
        Stmt::Finally(FinallyStmt { range, finally_pos, body: Box::new(body) })
    }

    /// `break`/`continue`/`return` optionally take a trailing expression or
    /// `if`-guard, but only on the same source line (§4.3): no newline
    /// between the keyword and the guard.
    fn parse_break_statement(&mut self) -> Stmt {
        let break_pos = self.bump().range.begin;
        let (if_pos, condition) = self.parse_same_line_guard();
        let end = condition.as_ref().map(|c| c.range().end).unwrap_or(break_pos);
        Stmt::Break(BreakStmt { range: SourceRange::new(break_pos, end), break_pos, if_pos, condition })
    }

    fn parse_continue_statement(&mut self) -> Stmt {
        let continue_pos = self.bump().range.begin;
        let (if_pos, condition) = self.parse_same_line_guard();
        let end = condition.as_ref().map(|c| c.range().end).unwrap_or(continue_pos);
        Stmt::Continue(ContinueStmt { range: SourceRange::new(continue_pos, end), continue_pos, if_pos, condition })
    }

    fn parse_return_statement(&mut self) -> Stmt {
        let return_pos = self.bump().range.begin;
        let value = if !self.cursor.newline_before_current() && self.can_start_expression() { Some(Box::new(self.parse_expression())) } else { None };
        let end = value.as_ref().map(|v| v.range().end).unwrap_or(return_pos);
        Stmt::Return(ReturnStmt { range: SourceRange::new(return_pos, end), return_pos, value })
    }

    fn parse_same_line_guard(&mut self) -> (Option<bsc_span::SourcePosition>, Option<Box<Expr>>) {
        if self.cursor.newline_before_current() || !self.at(TokenKind::If) {
            return (None, None);
        }
        let if_pos = self.bump().range.begin;
        (Some(if_pos), Some(Box::new(self.parse_expression())))
    }

    fn parse_assert_statement(&mut self) -> Stmt {
        let assert_pos = self.bump().range.begin;
        let condition = self.parse_expression();
        let (colon_pos, message) = if self.at(TokenKind::Colon) {
            (Some(self.bump().range.begin), Some(Box::new(self.parse_expression())))
        } else {
            (None, None)
        };
        let end = message.as_ref().map(|m| m.range().end).unwrap_or_else(|| condition.range().end);
        Stmt::Assert(AssertStmt { range: SourceRange::new(assert_pos, end), assert_pos, condition: Box::new(condition), colon_pos, message })
    }

    fn parse_expr_or_assign_statement(&mut self) -> Stmt {
        let start = self.here();
        if matches!(self.peek_kind(), TokenKind::EndOfFile | TokenKind::RightBrace) {
            self.handler.error(ErrorCode::ExpectedStatement, start, format!("expected a statement, found {:?}", self.peek_kind()));
            return Stmt::Invalid(SourceRange::point(start));
        }

        let target = self.parse_expression();
        let op = match self.peek_kind() {
            TokenKind::Assign => Some(AssignOp::Assign),
            TokenKind::InplaceAdd => Some(AssignOp::Add),
            TokenKind::InplaceSub => Some(AssignOp::Sub),
            TokenKind::InplaceMul => Some(AssignOp::Mul),
            TokenKind::InplaceDiv => Some(AssignOp::Div),
            TokenKind::InplaceMod => Some(AssignOp::Mod),
            TokenKind::InplaceBitAnd => Some(AssignOp::BitAnd),
            TokenKind::InplaceBitOr => Some(AssignOp::BitOr),
            TokenKind::InplaceBitXor => Some(AssignOp::BitXor),
            TokenKind::InplaceLeftShift => Some(AssignOp::LeftShift),
            TokenKind::InplaceRightShift => Some(AssignOp::RightShift),
            _ => None,
        };

        if let Some(op) = op {
            let op_pos = self.bump().range.begin;
            let value = self.parse_expression();
            let range = target.range().merge(value.range());
            return Stmt::Assign(AssignStmt { range, target: Box::new(target), op, op_pos, value: Box::new(value) });
        }

        Stmt::Expression(Box::new(target))
    }

    fn can_start_expression(&mut self) -> bool {
        !matches!(
            self.peek_kind(),
            TokenKind::RightBrace
                | TokenKind::EndOfFile
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Except
                | TokenKind::Finally
        )
    }

    /// Conservative panic-mode recovery: skip to the next statement
    /// synchronization token, balancing any delimiter encountered along
    /// the way (§4.3 recovery primitives).
    pub(crate) fn recover_to_statement_boundary(&mut self) {
        while !is_statement_sync(self.peek_kind()) {
            self.skip_token_expr();
        }
    }
}
