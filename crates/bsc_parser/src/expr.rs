use bsc_ast::*;
use bsc_errors::ErrorCode;
use bsc_lexer::TokenKind;
use bsc_span::SourceRange;

use crate::parser::Parser;

impl<'h> Parser<'h> {
    /// Entry point for a standalone expression: ternary is the lowest
    /// precedence level (§4.3 precedence table, level 13).
    pub fn parse_expression(&mut self) -> Expr {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Expr {
        let then_value = self.parse_logic_or();
        if self.at(TokenKind::If) && !self.cursor.newline_before_current() {
            let if_pos = self.bump().range.begin;
            let condition = self.parse_logic_or();
            let else_pos = self.expect(TokenKind::Else, "`else`");
            let else_value = self.parse_ternary();
            let range = then_value.range().merge(else_value.range());
            return Expr::Ternary(TernaryExpr {
                range,
                then_value: Box::new(then_value),
                if_pos,
                condition: Box::new(condition),
                else_pos,
                else_value: Box::new(else_value),
            });
        }
        then_value
    }

    fn parse_logic_or(&mut self) -> Expr {
        let mut left = self.parse_logic_and();
        while self.at(TokenKind::Or) {
            let op_pos = self.bump().range.begin;
            let right = self.parse_logic_and();
            let range = left.range().merge(right.range());
            left = Expr::Logic(LogicExpr { range, op: LogicOp::Or, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_logic_and(&mut self) -> Expr {
        let mut left = self.parse_equality();
        while self.at(TokenKind::And) {
            let op_pos = self.bump().range.begin;
            let right = self.parse_equality();
            let range = left.range().merge(right.range());
            left = Expr::Logic(LogicExpr { range, op: LogicOp::And, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_equality(&mut self) -> Expr {
        let mut left = self.parse_relational();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let op_pos = self.bump().range.begin;
            let right = self.parse_relational();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    /// Relational level (§4.3 precedence 9): `< <= > >=`, plus `is [not]
    /// Type` and `[not] in postfix`, which yield distinct AST nodes rather
    /// than joining the binary-operator chain.
    fn parse_relational(&mut self) -> Expr {
        let left = self.parse_shift();

        if self.at(TokenKind::Is) {
            let is_pos = self.bump().range.begin;
            let not_pos = self.consume_if_kind(TokenKind::Not);
            let type_name = self.expect_identifier();
            let range = left.range().merge(type_name.range);
            return Expr::TypeTest(TypeTestExpr { range, is_pos, not_pos, value: Box::new(left), type_name, symbol: OneWrite::empty() });
        }

        if self.at(TokenKind::Not) && self.cursor.at_n(1, TokenKind::In) {
            let not_pos = Some(self.bump().range.begin);
            let in_pos = self.bump().range.begin;
            let target = self.parse_shift();
            let range = left.range().merge(target.range());
            return Expr::ContainmentTest(ContainmentTestExpr { range, in_pos, not_pos, value: Box::new(left), target: Box::new(target) });
        }
        if self.at(TokenKind::In) {
            let in_pos = self.bump().range.begin;
            let target = self.parse_shift();
            let range = left.range().merge(target.range());
            return Expr::ContainmentTest(ContainmentTestExpr { range, in_pos, not_pos: None, value: Box::new(left), target: Box::new(target) });
        }

        let mut left = left;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessOrEqual => BinaryOp::LessOrEqual,
                TokenKind::Grater => BinaryOp::Grater,
                TokenKind::GraterOrEqual => BinaryOp::GraterOrEqual,
                _ => break,
            };
            let op_pos = self.bump().range.begin;
            let right = self.parse_shift();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_shift(&mut self) -> Expr {
        let mut left = self.parse_bitor();
        loop {
            let op = match self.peek_kind() {
                TokenKind::LeftShift => BinaryOp::Shl,
                TokenKind::RightShift => BinaryOp::Shr,
                _ => break,
            };
            let op_pos = self.bump().range.begin;
            let right = self.parse_bitor();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_bitor(&mut self) -> Expr {
        let mut left = self.parse_bitxor();
        while self.at(TokenKind::BitOr) {
            let op_pos = self.bump().range.begin;
            let right = self.parse_bitxor();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op: BinaryOp::BitOr, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_bitxor(&mut self) -> Expr {
        let mut left = self.parse_bitand();
        while self.at(TokenKind::BitXor) {
            let op_pos = self.bump().range.begin;
            let right = self.parse_bitand();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op: BinaryOp::BitXor, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_bitand(&mut self) -> Expr {
        let mut left = self.parse_additive();
        while self.at(TokenKind::BitAnd) {
            let op_pos = self.bump().range.begin;
            let right = self.parse_additive();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op: BinaryOp::BitAnd, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Add => BinaryOp::Add,
                TokenKind::Sub => BinaryOp::Sub,
                _ => break,
            };
            let op_pos = self.bump().range.begin;
            let right = self.parse_multiplicative();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Mul => BinaryOp::Mul,
                TokenKind::Div => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            let op_pos = self.bump().range.begin;
            let right = self.parse_unary();
            let range = left.range().merge(right.range());
            left = Expr::Binary(BinaryExpr { range, op, op_pos, left: Box::new(left), right: Box::new(right) });
        }
        left
    }

    /// Unary level (§4.3 precedence 2), right-associative: `+ - ~ not`,
    /// `defined id [in postfix]`, `raise postfix`.
    fn parse_unary(&mut self) -> Expr {
        let op = match self.peek_kind() {
            TokenKind::Add => Some(UnaryOp::Plus),
            TokenKind::Sub => Some(UnaryOp::Minus),
            TokenKind::BitNot => Some(UnaryOp::BitNot),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let op_pos = self.bump().range.begin;
            let operand = self.parse_unary();
            let range = SourceRange::new(op_pos, operand.range().end);
            return Expr::Unary(UnaryExpr { range, op, op_pos, operand: Box::new(operand) });
        }

        if self.at(TokenKind::Defined) {
            let defined_pos = self.bump().range.begin;
            let name = self.expect_identifier();
            let mut range = SourceRange::new(defined_pos, name.range.end);
            let (in_pos, container) = if self.at(TokenKind::In) {
                let in_pos = self.bump().range.begin;
                let container = self.parse_postfix();
                range = SourceRange::new(defined_pos, container.range().end);
                (Some(in_pos), Some(Box::new(container)))
            } else {
                (None, None)
            };
            return Expr::Defined(DefinedExpr { range, defined_pos, name, in_pos, container });
        }

        if self.at(TokenKind::Raise) {
            let raise_pos = self.bump().range.begin;
            let value = self.parse_postfix();
            let range = SourceRange::new(raise_pos, value.range().end);
            return Expr::Raise(RaiseExpr { range, raise_pos, value: Box::new(value) });
        }

        self.parse_postfix()
    }

    /// Postfix level (§4.3 precedence 1), left-associative: `.`, `(args)`,
    /// `[index]`.
    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_primary();
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    let dot_pos = self.bump().range.begin;
                    let member = self.expect_identifier();
                    let range = expr.range().merge(member.range);
                    expr = Expr::MemberAccess(MemberAccessExpr { range, target: Box::new(expr), dot_pos, member });
                }
                TokenKind::LeftParen => {
                    let open = self.bump().range.begin;
                    let mut args = Vec::new();
                    let mut commas = Vec::new();
                    if !self.at(TokenKind::RightParen) {
                        args.push(self.parse_expression());
                        while self.at(TokenKind::Comma) {
                            commas.push(self.bump().range.begin);
                            if self.at(TokenKind::RightParen) {
                                break;
                            }
                            args.push(self.parse_expression());
                        }
                    }
                    let close_pos = self.here();
                    self.expect(TokenKind::RightParen, "`)`");
                    let range = SourceRange::new(expr.range().begin, self.prev_end());
                    expr = Expr::Invoke(InvokeExpr { range, callee: Box::new(expr), open, args, commas, close: close_pos });
                }
                TokenKind::LeftSquare => {
                    let open = self.bump().range.begin;
                    let index = self.parse_expression();
                    let close = self.here();
                    self.expect(TokenKind::RightSquare, "`]`");
                    let range = SourceRange::new(expr.range().begin, self.prev_end());
                    expr = Expr::Subscript(SubscriptExpr { range, target: Box::new(expr), open, index: Box::new(index), close });
                }
                _ => break,
            }
        }
        expr
    }

    fn consume_if_kind(&mut self, kind: TokenKind) -> Option<bsc_span::SourcePosition> {
        self.cursor.consume_if(kind).map(|t| t.range.begin)
    }

    /// Whether `(` begins a closure rather than a parenthesized expression
    /// (§4.3's closure-disambiguation rule): `()`, `(id,`, or `(id) =>`.
    fn looks_like_closure(&mut self) -> bool {
        if !self.at(TokenKind::LeftParen) {
            return false;
        }
        if self.cursor.at_n(1, TokenKind::RightParen) {
            return true;
        }
        if self.cursor.at_n(1, TokenKind::Identifier) {
            if self.cursor.at_n(2, TokenKind::Comma) {
                return true;
            }
            if self.cursor.at_n(2, TokenKind::RightParen) && self.cursor.at_n(3, TokenKind::Arrow) {
                return true;
            }
        }
        false
    }

    fn parse_primary(&mut self) -> Expr {
        match self.peek_kind() {
            TokenKind::Integer => self.parse_integer_literal(),
            TokenKind::Float => self.parse_float_literal(),
            TokenKind::True => {
                let r = self.bump().range;
                Expr::Literal(LiteralExpr { range: r, value: Literal::Boolean(true) })
            }
            TokenKind::False => {
                let r = self.bump().range;
                Expr::Literal(LiteralExpr { range: r, value: Literal::Boolean(false) })
            }
            TokenKind::None => {
                let r = self.bump().range;
                Expr::Literal(LiteralExpr { range: r, value: Literal::None })
            }
            TokenKind::String => self.parse_string_literal(),
            TokenKind::Self_ => {
                let r = self.bump().range;
                Expr::SelfExpr(SelfExpr { range: r, symbol: OneWrite::empty() })
            }
            TokenKind::Super => {
                let r = self.bump().range;
                Expr::Super(SuperExpr { range: r, symbol: OneWrite::empty() })
            }
            TokenKind::Identifier => {
                let tok = self.bump();
                Expr::Variable(VariableExpr { range: tok.range, name: Identifier::new(tok.range, tok.image.unwrap_or_default()), symbol: OneWrite::empty() })
            }
            TokenKind::LeftSquare => self.parse_list_literal(),
            TokenKind::LeftBrace => self.parse_map_literal(),
            TokenKind::LeftParen if self.looks_like_closure() => self.parse_closure(),
            TokenKind::LeftParen => {
                let open = self.bump().range.begin;
                let inner = self.parse_expression();
                self.expect(TokenKind::RightParen, "`)`");
                let range = SourceRange::new(open, self.prev_end());
                // The parenthesized form carries no dedicated node; §3.3
                // only requires every child's range to nest inside its
                // parent, which the widened range below still satisfies.
                match inner {
                    mut e => {
                        widen_range(&mut e, range);
                        e
                    }
                }
            }
            _ => {
                let pos = self.here();
                self.handler.error(ErrorCode::ExpectedExpression, pos, format!("expected expression, found {:?}", self.peek_kind()));
                self.bump();
                Expr::Invalid(SourceRange::point(pos))
            }
        }
    }

    fn parse_integer_literal(&mut self) -> Expr {
        let tok = self.bump();
        let text = self.cursor.lexer().source().string(tok.range);
        let value = parse_integer_text(text);
        Expr::Literal(LiteralExpr { range: tok.range, value: Literal::Integer(value) })
    }

    fn parse_float_literal(&mut self) -> Expr {
        let tok = self.bump();
        let text = self.cursor.lexer().source().string(tok.range);
        let value: f64 = text.parse().unwrap_or(0.0);
        Expr::Literal(LiteralExpr { range: tok.range, value: Literal::Float(value) })
    }

    /// Re-enters every `$id`/`${ ... }` fragment of a string token via
    /// `Lexer::scan_interpolations`, parsing each as an independent
    /// expression (§4.2/§4.5.2's interpolation desugaring).
    fn parse_string_literal(&mut self) -> Expr {
        let tok = self.bump();
        let image = tok.image.clone().unwrap_or_default();
        let fragments = self.cursor.lexer().scan_interpolations(tok.range);
        if fragments.is_empty() {
            Expr::Literal(LiteralExpr { range: tok.range, value: Literal::String(image) })
        } else {
            let parts = fragments.into_iter().map(|range| self.reparse_fragment(range)).collect();
            Expr::Literal(LiteralExpr { range: tok.range, value: Literal::Interpolated { template: image, parts } })
        }
    }

    fn parse_list_literal(&mut self) -> Expr {
        let open = self.bump().range.begin;
        let mut items = Vec::new();
        if !self.at(TokenKind::RightSquare) {
            items.push(self.parse_list_item());
            while self.at(TokenKind::Comma) {
                self.bump();
                if self.at(TokenKind::RightSquare) {
                    break;
                }
                items.push(self.parse_list_item());
            }
        }
        let close = self.here();
        self.expect(TokenKind::RightSquare, "`]`");
        let range = SourceRange::new(open, self.prev_end());
        Expr::MakeList(MakeListExpr { range, open, items, close })
    }

    fn parse_list_item(&mut self) -> ListItem {
        let spread = self.consume_if_kind(TokenKind::Ellipsis);
        ListItem { value: self.parse_expression(), spread }
    }

    fn parse_map_literal(&mut self) -> Expr {
        let open = self.bump().range.begin;
        let mut entries = Vec::new();
        if !self.at(TokenKind::RightBrace) {
            entries.push(self.parse_map_entry());
            while self.at(TokenKind::Comma) {
                self.bump();
                if self.at(TokenKind::RightBrace) {
                    break;
                }
                entries.push(self.parse_map_entry());
            }
        }
        let close = self.here();
        self.expect(TokenKind::RightBrace, "`}`");
        let range = SourceRange::new(open, self.prev_end());
        Expr::MakeMap(MakeMapExpr { range, open, entries, close })
    }

    fn parse_map_entry(&mut self) -> MapEntry {
        let key = self.parse_expression();
        let colon = self.expect(TokenKind::Colon, "`:`");
        let value = self.parse_expression();
        MapEntry { key, colon, value }
    }

    fn parse_closure(&mut self) -> Expr {
        let params = self.parse_parameter_list();
        let arrow = self.expect(TokenKind::Arrow, "`=>`");
        let body = if self.at(TokenKind::LeftBrace) {
            Box::new(self.parse_block_statement())
        } else {
            let expr = self.parse_expression();
            let range = expr.range();
            Box::new(Stmt::Arrow(ArrowStmt { range, arrow, expr: Box::new(expr) }))
        };
        let range = SourceRange::new(params.range.begin, body.range().end);
        Expr::Closure(ClosureExpr { range, params, arrow, body, symbol: OneWrite::empty(), bounded_locals: OneWrite::empty() })
    }
}

/// Widen a plain parenthesized expression's outer range in place to include
/// the parens, without allocating a dedicated "Paren" node (§9 -- the
/// document models variable-length/optional syntax as thin wrappers over
/// the primitive it decorates wherever a dedicated node would add nothing).
fn widen_range(expr: &mut Expr, range: SourceRange) {
    macro_rules! widen {
        ($e:expr) => {
            $e.range = range
        };
    }
    match expr {
        Expr::Invalid(r) => *r = range,
        Expr::Literal(e) => widen!(e),
        Expr::Variable(e) => widen!(e),
        Expr::SelfExpr(e) => widen!(e),
        Expr::Super(e) => widen!(e),
        Expr::Binary(e) => widen!(e),
        Expr::Unary(e) => widen!(e),
        Expr::Logic(e) => widen!(e),
        Expr::Defined(e) => widen!(e),
        Expr::Raise(e) => widen!(e),
        Expr::TypeTest(e) => widen!(e),
        Expr::ContainmentTest(e) => widen!(e),
        Expr::Ternary(e) => widen!(e),
        Expr::MemberAccess(e) => widen!(e),
        Expr::Subscript(e) => widen!(e),
        Expr::Invoke(e) => widen!(e),
        Expr::Closure(e) => widen!(e),
        Expr::MakeList(e) => widen!(e),
        Expr::MakeMap(e) => widen!(e),
    }
}

/// Parses a decimal or prefixed (`0b`/`0o`/`0x`) integer literal's source
/// text (as sliced by `SourceText::string`) into its value.
fn parse_integer_text(text: &str) -> i64 {
    let bytes = text.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'b' | b'B') {
        i64::from_str_radix(&text[2..], 2).unwrap_or(0)
    } else if bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'o' | b'O') {
        i64::from_str_radix(&text[2..], 8).unwrap_or(0)
    } else if bytes.len() > 1 && bytes[0] == b'0' && matches!(bytes[1], b'x' | b'X') {
        i64::from_str_radix(&text[2..], 16).unwrap_or(0)
    } else {
        text.parse().unwrap_or(0)
    }
}
