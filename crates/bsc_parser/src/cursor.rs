use std::collections::VecDeque;

use bsc_errors::Handler;
use bsc_lexer::{Lexer, SourceText, Token, TokenKind};
use bsc_span::SourceRange;

/// A single-token lookahead cache backed by a small ring buffer so
/// `peek(k)` for small `k` doesn't need to re-lex. `EndOfLine` and
/// `Comment` tokens are filtered out of the buffer entirely except where a
/// caller explicitly asks for them (`next_raw`) -- most of the grammar
/// treats newlines as insignificant, but a handful of rules (§4.3's
/// same-line `break`/`continue`/`return` guard, the ternary's
/// must-not-cross-a-newline rule) need to see them, so the cursor exposes
/// both a filtered and a raw view.
pub struct Cursor<'h> {
    lexer: Lexer<'h>,
    buffer: VecDeque<Token>,
    /// Whether an `EndOfLine` token was skipped immediately before the
    /// token now at the front of `buffer`.
    newline_before_front: bool,
    pub previous_range: SourceRange,
}

impl<'h> Cursor<'h> {
    pub fn new(source: SourceText, handler: &'h Handler) -> Self {
        let lexer = Lexer::new(source, handler);
        let mut cursor = Cursor { lexer, buffer: VecDeque::new(), newline_before_front: false, previous_range: SourceRange::default() };
        cursor.fill(1);
        cursor
    }

    pub fn lexer(&self) -> &Lexer<'h> {
        &self.lexer
    }

    fn fill(&mut self, count: usize) {
        while self.buffer.len() < count {
            let mut saw_newline = false;
            loop {
                let tok = self.lexer.next_token();
                match tok.kind {
                    TokenKind::Comment => continue,
                    TokenKind::EndOfLine => {
                        saw_newline = true;
                        continue;
                    }
                    _ => {
                        if self.buffer.is_empty() {
                            self.newline_before_front = saw_newline;
                        }
                        self.buffer.push_back(tok);
                        break;
                    }
                }
            }
        }
    }

    pub fn peek(&mut self) -> &Token {
        self.fill(1);
        &self.buffer[0]
    }

    pub fn peek_n(&mut self, k: usize) -> &Token {
        self.fill(k + 1);
        &self.buffer[k]
    }

    pub fn at(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    pub fn at_n(&mut self, k: usize, kind: TokenKind) -> bool {
        self.peek_n(k).kind == kind
    }

    /// Whether a newline token was consumed between the previously-returned
    /// token and the one now at the front of the buffer.
    pub fn newline_before_current(&self) -> bool {
        self.newline_before_front
    }

    pub fn bump(&mut self) -> Token {
        self.fill(1);
        let tok = self.buffer.pop_front().expect("fill(1) guarantees a token");
        self.previous_range = tok.range;
        self.fill(1);
        tok
    }

    pub fn consume_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            None
        }
    }
}
