use bsc_errors::{ErrorCode, Handler};
use bsc_span::{SourcePosition, SourceRange};

use crate::char_class::*;
use crate::keyword;
use crate::source_text::{Scanned, SourceText};
use crate::token::{Token, TokenKind};

/// Produces a token stream from a `SourceText`. Every error is reported
/// and recovered from in place (advance past the offender, keep scanning)
/// so `next_token` never fails -- it always returns *some* token, possibly
/// `TokenKind::Invalid`.
pub struct Lexer<'h> {
    source: SourceText,
    handler: &'h Handler,
}

impl<'h> Lexer<'h> {
    pub fn new(source: SourceText, handler: &'h Handler) -> Self {
        Lexer { source, handler }
    }

    pub fn source(&self) -> &SourceText {
        &self.source
    }

    /// Re-enter the lexer over a string literal's interpolation fragments.
    /// `range` must be the full range of a `String` token (quotes included)
    /// as returned by `lex_string`. Returns the sub-ranges of each `$id` /
    /// `${ ... }` placeholder, in the order a fresh `Parser` should consume
    /// them to fill the `{0}`, `{1}`, ... slots in the token's image.
    pub fn scan_interpolations(&self, range: SourceRange) -> Vec<SourceRange> {
        let mut src = SourceText::sub_range(&self.source, range);
        let quote = src.advance();
        debug_assert!(quote == '\'' || quote == '"');

        let mut ranges = Vec::new();
        loop {
            let ch = src.advance();
            let Some(ch) = ch.as_char() else { break };
            if Scanned::Char(ch) == quote {
                break;
            }
            match ch {
                '\\' => {
                    src.advance();
                }
                '$' => {
                    if src.consume_if('{') {
                        let open = src.position();
                        let mut depth = 1u32;
                        loop {
                            let c = src.peek();
                            match c.as_char() {
                                Some('}') if depth == 1 => {
                                    let close = src.position();
                                    ranges.push(SourceRange::new(open, close));
                                    src.advance();
                                    depth = 0;
                                    break;
                                }
                                Some('}') => {
                                    depth -= 1;
                                }
                                Some('\'') | Some('"') => {
                                    let inner_quote = c;
                                    src.advance();
                                    while src.peek().as_char().is_some() && src.peek() != inner_quote {
                                        if src.peek() == '\\' {
                                            src.advance();
                                        }
                                        src.advance();
                                    }
                                }
                                Some('$') => {
                                    src.advance();
                                    if src.peek() == '{' {
                                        depth += 1;
                                    }
                                }
                                Some('{') => {
                                    depth += 1;
                                }
                                None => break,
                                _ => {}
                            }
                            src.advance();
                        }
                        debug_assert_eq!(depth, 0);
                    } else {
                        let begin = src.position();
                        let end = src.consume_while(is_identifier_continue);
                        ranges.push(SourceRange::new(begin, end));
                    }
                }
                _ => {}
            }
        }

        ranges
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            let start = self.source.consume_while(is_whitespace);

            match self.source.advance() {
                Scanned::InvalidEncoding => {
                    self.handler.error(ErrorCode::InvalidEncoding, self.source.position(), format!("invalid {} encoding", self.source.encoding_name()));
                    continue;
                }
                Scanned::InvalidCharacter => {
                    self.handler.error(ErrorCode::InvalidCharacter, self.source.position(), "invalid character");
                    continue;
                }
                Scanned::EndOfFile => {
                    return Token::new(TokenKind::EndOfFile, SourceRange::new(start, self.source.position()));
                }
                Scanned::Char(ch) => {
                    if let Some(tok) = self.lex_one(start, ch) {
                        return tok;
                    }
                    // `lex_one` returns None when it already reported and
                    // wants the outer loop to resume scanning.
                    continue;
                }
            }
        }
    }

    fn lex_one(&mut self, start: SourcePosition, ch: char) -> Option<Token> {
        match ch {
            '0' => match self.source.peek().as_char() {
                Some('b') | Some('B') => Some(self.lex_prefixed_integer(start, is_binary)),
                Some('o') | Some('O') => Some(self.lex_prefixed_integer(start, is_octal)),
                Some('x') | Some('X') => Some(self.lex_prefixed_integer(start, is_hexadecimal)),
                _ => Some(self.lex_number(start)),
            },
            '1'..='9' => Some(self.lex_number(start)),

            '\'' | '"' => Some(self.lex_string(start, ch)),

            '#' => {
                let end = self.source.consume_until(is_eol);
                Some(Token::new(TokenKind::Comment, SourceRange::new(start, end)))
            }

            '\r' | '\n' => {
                if ch == '\r' {
                    self.source.consume_if('\n');
                }
                Some(Token::new(TokenKind::EndOfLine, SourceRange::new(start, self.source.position())))
            }

            '+' => Some(self.punct(start, '=', TokenKind::InplaceAdd, TokenKind::Add)),
            '-' => Some(self.punct(start, '=', TokenKind::InplaceSub, TokenKind::Sub)),
            '*' => Some(self.punct(start, '=', TokenKind::InplaceMul, TokenKind::Mul)),
            '/' => Some(self.punct(start, '=', TokenKind::InplaceDiv, TokenKind::Div)),
            '%' => Some(self.punct(start, '=', TokenKind::InplaceMod, TokenKind::Mod)),
            '&' => Some(self.punct(start, '=', TokenKind::InplaceBitAnd, TokenKind::BitAnd)),
            '|' => Some(self.punct(start, '=', TokenKind::InplaceBitOr, TokenKind::BitOr)),
            '^' => Some(self.punct(start, '=', TokenKind::InplaceBitXor, TokenKind::BitXor)),
            '~' => Some(self.finish(start, TokenKind::BitNot)),

            '=' => {
                if self.source.consume_if('=') {
                    Some(self.finish(start, TokenKind::Equal))
                } else if self.source.consume_if('>') {
                    Some(self.finish(start, TokenKind::Arrow))
                } else {
                    Some(self.finish(start, TokenKind::Assign))
                }
            }

            '!' => {
                if self.source.consume_if('=') {
                    Some(self.finish(start, TokenKind::NotEqual))
                } else {
                    self.handler.error(ErrorCode::UnknownToken, start, "unexpected `!`; did you mean `!=`?");
                    None
                }
            }

            '<' => {
                if self.source.consume_if('=') {
                    Some(self.finish(start, TokenKind::LessOrEqual))
                } else if self.source.consume_if('<') {
                    Some(self.punct(start, '=', TokenKind::InplaceLeftShift, TokenKind::LeftShift))
                } else {
                    Some(self.finish(start, TokenKind::Less))
                }
            }

            '>' => {
                if self.source.consume_if('=') {
                    Some(self.finish(start, TokenKind::GraterOrEqual))
                } else if self.source.consume_if('>') {
                    Some(self.punct(start, '=', TokenKind::InplaceRightShift, TokenKind::RightShift))
                } else {
                    Some(self.finish(start, TokenKind::Grater))
                }
            }

            ',' => Some(self.finish(start, TokenKind::Comma)),
            ':' => Some(self.finish(start, TokenKind::Colon)),

            '.' => {
                if self.source.consume_if('.') {
                    if self.source.consume_if('.') {
                        Some(self.finish(start, TokenKind::Ellipsis))
                    } else {
                        self.handler.error(ErrorCode::UnknownToken, start, "unexpected `..`; did you mean `...`?");
                        None
                    }
                } else {
                    Some(self.finish(start, TokenKind::Dot))
                }
            }

            '(' => Some(self.finish(start, TokenKind::LeftParen)),
            ')' => Some(self.finish(start, TokenKind::RightParen)),
            '{' => Some(self.finish(start, TokenKind::LeftBrace)),
            '}' => Some(self.finish(start, TokenKind::RightBrace)),
            '[' => Some(self.finish(start, TokenKind::LeftSquare)),
            ']' => Some(self.finish(start, TokenKind::RightSquare)),

            c if c == '_' || c.is_ascii_alphabetic() => {
                let end = self.source.consume_while(is_identifier_continue);
                let image = self.source.string(SourceRange::new(start, end)).to_string();
                let kind = keyword::lookup(&image);
                if kind == TokenKind::Identifier {
                    Some(Token::with_image(kind, SourceRange::new(start, end), image))
                } else {
                    Some(Token::new(kind, SourceRange::new(start, end)))
                }
            }

            c if is_not_allowed_unicode_initially(Scanned::Char(c)) => {
                self.handler.error(ErrorCode::DisallowedCodePoint, start, "character not allowed at the start of an identifier");
                None
            }

            c if is_allowed_unicode(Scanned::Char(c)) => {
                let end = self.source.consume_while(is_identifier_continue);
                let image = self.source.string(SourceRange::new(start, end)).to_string();
                Some(Token::with_image(TokenKind::Identifier, SourceRange::new(start, end), image))
            }

            _ => {
                self.handler.error(ErrorCode::UnknownToken, start, format!("unknown character `{}`", ch));
                None
            }
        }
    }

    fn finish(&self, start: SourcePosition, kind: TokenKind) -> Token {
        Token::new(kind, SourceRange::new(start, self.source.position()))
    }

    fn punct(&mut self, start: SourcePosition, extra: char, if_extra: TokenKind, otherwise: TokenKind) -> Token {
        let kind = if self.source.consume_if(extra) { if_extra } else { otherwise };
        self.finish(start, kind)
    }

    fn lex_prefixed_integer(&mut self, start: SourcePosition, matcher: fn(Scanned) -> bool) -> Token {
        self.source.advance(); // prefix letter (b/o/x)
        let end = self.source.consume_while(matcher);
        if end.column - start.column == 2 {
            self.handler.error(ErrorCode::IncompleteNumericLiteral, end, "numeric literal prefix with no digits");
            Token::new(TokenKind::Invalid, SourceRange::new(start, end))
        } else {
            Token::new(TokenKind::Integer, SourceRange::new(start, end))
        }
    }

    fn lex_number(&mut self, start: SourcePosition) -> Token {
        let mut end = self.source.consume_while(is_decimal);
        let mut kind = TokenKind::Integer;

        if self.source.consume_if('.') {
            if !is_decimal(self.source.peek()) {
                return self.incomplete_number(start);
            }
            end = self.source.consume_while(is_decimal);
            kind = TokenKind::Float;
        }

        if self.source.consume_if('e') || self.source.consume_if('E') {
            if matches!(self.source.peek().as_char(), Some('+') | Some('-')) {
                self.source.advance();
            }
            if !is_decimal(self.source.peek()) {
                return self.incomplete_number(start);
            }
            end = self.source.consume_while(is_decimal);
            kind = TokenKind::Float;
        }

        Token::new(kind, SourceRange::new(start, end))
    }

    fn incomplete_number(&mut self, start: SourcePosition) -> Token {
        let end = self.source.position();
        self.handler.error(ErrorCode::IncompleteNumericLiteral, end, "missing digits after exponent");
        Token::new(TokenKind::Invalid, SourceRange::new(start, end))
    }

    /// Scans a string body, substituting every `$id`/`${ ... }`
    /// interpolation placeholder with a sequential `{N}` marker so the
    /// produced image is a Rust-`format!`-shaped string. Does not parse the
    /// interpolation expressions themselves; `scan_interpolations` re-enters
    /// for that once the token's full range is known.
    fn lex_string(&mut self, begin: SourcePosition, quote: char) -> Token {
        let mut invalid = false;
        let mut image = String::new();
        let mut index: u32 = 0;

        loop {
            let ch = self.source.peek();
            if ch == quote || is_eol(ch) {
                break;
            }
            match ch.as_char() {
                Some('$') => {
                    invalid |= self.skip_interpolation();
                    image.push('{');
                    image.push_str(&index.to_string());
                    image.push('}');
                    index += 1;
                }
                Some('\\') => {
                    image.push(self.lex_escape());
                }
                Some(_) => {
                    image.push(ch.as_char().unwrap());
                    self.source.advance();
                }
                None => break,
            }
        }

        let end_peek = self.source.peek();
        if is_eol(end_peek) || end_peek.is_eof() {
            self.handler.error(ErrorCode::UnterminatedString, self.source.position(), "unterminated string literal");
            invalid = true;
        } else {
            self.source.advance(); // closing quote
        }

        let end = self.source.position();
        let kind = if invalid { TokenKind::Invalid } else { TokenKind::String };
        Token::with_image(kind, SourceRange::new(begin, end), image)
    }

    fn lex_escape(&mut self) -> char {
        debug_assert!(self.source.peek() == '\\');
        self.source.advance();

        match self.source.advance().as_char() {
            Some('\'') => '\'',
            Some('"') => '"',
            Some('\\') => '\\',
            Some('$') => '$',
            Some('0') => '\0',
            Some('a') => '\u{7}',
            Some('b') => '\u{8}',
            Some('f') => '\u{C}',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('t') => '\t',
            Some('v') => '\u{B}',
            Some('x') => self.lex_hex_escape(2),
            Some('u') => self.lex_hex_escape(4),
            Some('U') => self.lex_hex_escape(8),
            _ => {
                self.handler.error(ErrorCode::InvalidEscape, self.source.position(), "invalid escape sequence");
                '\u{FFFD}'
            }
        }
    }

    fn lex_hex_escape(&mut self, digits: u32) -> char {
        let mut value: u32 = 0;
        let mut count = 0;
        while count < digits {
            match self.source.peek().as_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.source.advance();
                    value = value * 16 + c.to_digit(16).unwrap();
                    count += 1;
                }
                _ => break,
            }
        }

        if count < digits {
            self.handler.error(ErrorCode::InvalidEscape, self.source.position(), "incomplete escape sequence");
            return '\u{FFFD}';
        }

        char::from_u32(value).unwrap_or_else(|| {
            self.handler.error(ErrorCode::InvalidEscape, self.source.position(), "escape does not encode a valid code point");
            '\u{FFFD}'
        })
    }

    /// Verifies the shape of a `$id`/`${ ... }` placeholder and advances
    /// past it, tracking nested strings and nested `${ ... }` blocks with a
    /// delimiter-depth counter. Returns whether it found an error; actual
    /// parsing happens later via `scan_interpolations`.
    fn skip_interpolation(&mut self) -> bool {
        debug_assert!(self.source.peek() == '$');
        self.source.advance();

        if !self.source.consume_if('{') {
            if is_identifier_continue(self.source.peek()) && !is_decimal(self.source.peek()) {
                self.source.consume_while(is_identifier_continue);
                return false;
            }
            self.handler.error(ErrorCode::UnbalancedInterpolation, self.source.position(), "`$` must be followed by an identifier or `{`");
            return true;
        }

        let mut depth: Vec<char> = vec!['}'];
        let mut invalid = false;
        let in_string = |stack: &[char]| *stack.last().unwrap() != '}';

        while let Some(&top) = depth.last() {
            let ch = self.source.peek();
            if is_eol(ch) || ch.is_eof() {
                return true;
            } else if ch == top {
                depth.pop();
            } else {
                match ch.as_char().unwrap() {
                    '\'' | '"' => depth.push(ch.as_char().unwrap()),
                    '#' if !in_string(&depth) => {
                        self.handler.error(ErrorCode::CommentInInterpolation, self.source.position(), "`#` comment is not allowed inside an interpolated expression");
                        invalid = true;
                    }
                    '$' if in_string(&depth) => {
                        self.source.advance();
                        if self.source.peek() == '{' {
                            depth.push('}');
                        } else if !is_identifier_continue(self.source.peek()) {
                            self.handler.error(ErrorCode::UnbalancedInterpolation, self.source.position(), "`$` must be followed by an identifier or `{`");
                            invalid = true;
                        }
                    }
                    '$' => {
                        self.handler.error(ErrorCode::UnknownToken, self.source.position(), "`$` is not a valid character here");
                    }
                    '\\' if !in_string(&depth) => {
                        self.handler.error(ErrorCode::UnknownToken, self.source.position(), "`\\` is not a valid character here");
                        invalid = true;
                    }
                    '\\' => {
                        self.source.advance(); // skip escape; re-scanned by lex_escape at the outer level
                    }
                    '{' => depth.push('}'),
                    _ => {}
                }
            }
            self.source.advance();
        }

        invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_errors::Handler;

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let handler = Handler::new(false);
        let text = SourceText::new("t", src.as_bytes(), SourceText::DEFAULT_TABSIZE);
        let mut lexer = Lexer::new(text, &handler);
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.kind == TokenKind::EndOfFile {
                break;
            }
            kinds.push(tok.kind);
        }
        kinds
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(lex_all("var x = task"), vec![TokenKind::Var, TokenKind::Identifier, TokenKind::Assign, TokenKind::Task]);
    }

    #[test]
    fn lexes_numeric_prefixes() {
        assert_eq!(lex_all("0xFF 0b101 0o17 1.5e-3"), vec![TokenKind::Integer, TokenKind::Integer, TokenKind::Integer, TokenKind::Float]);
    }

    #[test]
    fn reports_incomplete_prefix() {
        let handler = Handler::new(false);
        let text = SourceText::new("t", b"0x", SourceText::DEFAULT_TABSIZE);
        let mut lexer = Lexer::new(text, &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert!(handler.has_errors());
    }

    #[test]
    fn string_with_identifier_interpolation_has_placeholder_image() {
        let handler = Handler::new(false);
        let text = SourceText::new("t", br#""hi $name!""#, SourceText::DEFAULT_TABSIZE);
        let mut lexer = Lexer::new(text, &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::String);
        assert_eq!(tok.image.unwrap(), "hi {0}!");
    }

    #[test]
    fn scan_interpolations_recovers_expression_ranges() {
        let handler = Handler::new(false);
        let text = SourceText::new("t", br#""a=${1 + 2} b=$c""#, SourceText::DEFAULT_TABSIZE);
        let mut lexer = Lexer::new(text, &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::String);
        let ranges = lexer.scan_interpolations(tok.range);
        assert_eq!(ranges.len(), 2);
        assert_eq!(lexer.source().string(ranges[0]), "1 + 2");
        assert_eq!(lexer.source().string(ranges[1]), "c");
    }

    #[test]
    fn unterminated_string_reports_and_marks_invalid() {
        let handler = Handler::new(false);
        let text = SourceText::new("t", b"\"abc\n", SourceText::DEFAULT_TABSIZE);
        let mut lexer = Lexer::new(text, &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Invalid);
        assert!(handler.has_errors());
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        assert_eq!(lex_all("# comment\nvar"), vec![TokenKind::Comment, TokenKind::EndOfLine, TokenKind::Var]);
    }
}
