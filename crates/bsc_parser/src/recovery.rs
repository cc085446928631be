use bsc_lexer::TokenKind;
use bsc_span::SourceRange;

use crate::parser::Parser;

/// Where `skip_braces` should leave the cursor relative to the matching
/// closing brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceStop {
    Before,
    After,
}

impl<'h> Parser<'h> {
    /// Consume tokens until (but not past) the next newline. Since the
    /// cursor transparently discards `EndOfLine`/`Comment` tokens while
    /// filling its lookahead buffer, "the next newline" is detected as:
    /// the upcoming token has a newline before it.
    pub fn skip_to_eol(&mut self) {
        while !self.cursor.at(TokenKind::EndOfFile) && !self.cursor.newline_before_current() {
            self.cursor.bump();
        }
    }

    /// A conservative, token-class-specific best-effort skip used between
    /// synchronization points: consumes exactly one token, except that an
    /// opening delimiter is skipped as a balanced unit (never consumes a
    /// lone unmatched `)`/`]`/`}` that some outer recovery still needs to
    /// see).
    pub fn skip_token_expr(&mut self) {
        match self.cursor.peek().kind {
            TokenKind::LeftParen => self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen),
            TokenKind::LeftSquare => self.skip_balanced(TokenKind::LeftSquare, TokenKind::RightSquare),
            TokenKind::LeftBrace => {
                self.skip_braces(BraceStop::After, |_| false);
            }
            TokenKind::RightParen | TokenKind::RightSquare | TokenKind::RightBrace | TokenKind::EndOfFile => {
                // Don't consume a delimiter some enclosing recovery still needs.
            }
            _ => {
                self.cursor.bump();
            }
        }
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        debug_assert!(self.cursor.at(open));
        let mut depth = 0u32;
        loop {
            let kind = self.cursor.peek().kind;
            if kind == TokenKind::EndOfFile {
                break;
            }
            self.cursor.bump();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
        }
    }

    /// Balance braces and stop either before or after the matching `}`,
    /// optionally stopping earlier (before consuming) on a caller-supplied
    /// token predicate evaluated only at depth 1 (i.e. immediately inside
    /// the outermost unmatched brace). Assumes the cursor is at the opening
    /// `{`; consumes it as part of the skip.
    pub fn skip_braces(&mut self, stop: BraceStop, filter: impl Fn(TokenKind) -> bool) -> SourceRange {
        let start = self.cursor.peek().range;
        if !self.cursor.at(TokenKind::LeftBrace) {
            return start;
        }
        self.cursor.bump();
        let mut depth = 1u32;

        loop {
            let kind = self.cursor.peek().kind;
            if kind == TokenKind::EndOfFile {
                return SourceRange::new(start.begin, self.cursor.previous_range.end);
            }
            if depth == 1 && filter(kind) {
                return SourceRange::new(start.begin, self.cursor.previous_range.end);
            }
            match kind {
                TokenKind::LeftBrace => {
                    depth += 1;
                    self.cursor.bump();
                }
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.cursor.peek().range.end;
                        if stop == BraceStop::After {
                            self.cursor.bump();
                        }
                        return SourceRange::new(start.begin, end);
                    }
                    self.cursor.bump();
                }
                _ => {
                    self.cursor.bump();
                }
            }
        }
    }
}
