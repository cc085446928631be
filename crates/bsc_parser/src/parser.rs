use bsc_ast::*;
use bsc_errors::{ErrorCode, Handler};
use bsc_lexer::{SourceText, Token, TokenKind};
use bsc_span::{Identifier, SourcePosition, SourceRange};

use crate::cursor::Cursor;

/// Hand-written recursive-descent parser (§4.3): single-token lookahead
/// cache plus a small ring buffer for `peek(k)`, one-token "previous range"
/// bookkeeping, explicit panic-mode recovery.
pub struct Parser<'h> {
    pub(crate) cursor: Cursor<'h>,
    pub(crate) handler: &'h Handler,
}

impl<'h> Parser<'h> {
    pub fn new(source: SourceText, handler: &'h Handler) -> Self {
        Parser { cursor: Cursor::new(source, handler), handler }
    }

    /// Entry point: `parse_script()` repeatedly calls `parse_declaration()`;
    /// if that returns nothing, falls through to `parse_statement()` (§4.3
    /// top level).
    pub fn parse_script(&mut self) -> ScriptDecl {
        let start = self.cursor.peek().range.begin;
        let mut body = Vec::new();
        while !self.cursor.at(TokenKind::EndOfFile) {
            if let Some(decl) = self.try_parse_declaration() {
                body.push(Item::Decl(decl));
            } else {
                body.push(Item::Stmt(self.parse_statement()));
            }
        }
        let end = self.cursor.previous_range.end.max_or(start);
        ScriptDecl { range: SourceRange::new(start, end), body }
    }

    // ----- token helpers -----

    pub(crate) fn peek_kind(&mut self) -> TokenKind {
        self.cursor.peek().kind
    }

    pub(crate) fn at(&mut self, kind: TokenKind) -> bool {
        self.cursor.at(kind)
    }

    pub(crate) fn bump(&mut self) -> Token {
        self.cursor.bump()
    }

    pub(crate) fn here(&mut self) -> SourcePosition {
        self.cursor.peek().range.begin
    }

    pub(crate) fn prev_end(&self) -> SourcePosition {
        self.cursor.previous_range.end
    }

    /// Consume `kind` if present; otherwise report `MissingToken` at the
    /// current position and leave the cursor untouched (callers continue
    /// parsing as if the token had been there, per §7's "every stage
    /// continues after an error").
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> SourcePosition {
        if let Some(tok) = self.cursor.consume_if(kind) {
            tok.range.begin
        } else {
            let pos = self.here();
            self.handler.error(ErrorCode::MissingToken, pos, format!("expected {}, found {:?}", what, self.peek_kind()));
            pos
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Identifier {
        if self.at(TokenKind::Identifier) {
            let tok = self.bump();
            Identifier::new(tok.range, tok.image.unwrap_or_default())
        } else {
            let pos = self.here();
            self.handler.error(ErrorCode::MissingToken, pos, "expected identifier");
            Identifier::new(SourceRange::point(pos), String::new())
        }
    }

    /// Re-enter the parser over one `$id`/`${ ... }` interpolation
    /// fragment discovered by `Lexer::scan_interpolations`. Each fragment
    /// gets its own independent `Parser` over a zero-copy sub-range
    /// `SourceText`, sharing this parser's `Handler` so diagnostics land in
    /// the same collection (§4.2).
    pub(crate) fn reparse_fragment(&self, range: SourceRange) -> Expr {
        let sub_source = SourceText::sub_range(self.cursor.lexer().source(), range);
        let mut sub = Parser::new(sub_source, self.handler);
        sub.parse_expression()
    }
}

/// `SourcePosition` has no ordering defined on purpose (cursor/line/column
/// is compared only through `SourceRange`), but the script's end position
/// needs a fallback for an empty file; this trivial helper keeps that one
/// call site readable.
trait MaxOr {
    fn max_or(self, fallback: SourcePosition) -> SourcePosition;
}

impl MaxOr for SourcePosition {
    fn max_or(self, fallback: SourcePosition) -> SourcePosition {
        if self.cursor >= fallback.cursor {
            self
        } else {
            fallback
        }
    }
}
