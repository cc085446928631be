use std::rc::Rc;

use bsc_span::{SourcePosition, SourceRange};

/// Source encodings `SourceText` can sniff from a BOM (or be told
/// explicitly via `CompileOptions`). Decoding always normalizes to UTF-8
/// internally; `cursor` in every `SourcePosition` is a byte offset into
/// that normalized buffer, never into the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        }
    }

    /// Sniff a BOM off the front of `bytes`, defaulting to UTF-8 when none
    /// is present. Returns the encoding and the number of BOM bytes to skip.
    pub fn sniff(bytes: &[u8]) -> (Encoding, usize) {
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            (Encoding::Utf8, 3)
        } else if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
            (Encoding::Utf32Le, 4)
        } else if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
            (Encoding::Utf32Be, 4)
        } else if bytes.starts_with(&[0xFF, 0xFE]) {
            (Encoding::Utf16Le, 2)
        } else if bytes.starts_with(&[0xFE, 0xFF]) {
            (Encoding::Utf16Be, 2)
        } else {
            (Encoding::Utf8, 0)
        }
    }
}

/// One decoded unit of the source: either a valid code point, or one of the
/// two distinct error sentinels the design calls for. Replaces the source's
/// `char32_t` sentinel values (`EndOfFile`, `InvalidEncoding`,
/// `InvalidCharacter`) with a proper sum type -- the lexer matches on this
/// exhaustively instead of comparing magic integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scanned {
    Char(char),
    EndOfFile,
    InvalidEncoding,
    InvalidCharacter,
}

impl Scanned {
    pub fn is_eof(self) -> bool {
        matches!(self, Scanned::EndOfFile)
    }

    pub fn as_char(self) -> Option<char> {
        match self {
            Scanned::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq<char> for Scanned {
    fn eq(&self, other: &char) -> bool {
        matches!(self, Scanned::Char(c) if c == other)
    }
}

struct Decoded {
    /// Normalized always-UTF-8 text; `SourceRange::string` slices this.
    text: String,
    /// One entry per decoded unit: (byte offset into `text`, decode result).
    /// The final entry is a sentinel at `text.len()` representing EOF.
    units: Vec<(u32, Scanned)>,
}

fn decode(bytes: &[u8], encoding: Encoding) -> Decoded {
    let mut text = String::new();
    let mut units = Vec::new();

    macro_rules! push {
        ($scanned:expr) => {{
            units.push((text.len() as u32, $scanned));
        }};
    }

    match encoding {
        Encoding::Utf8 => {
            let mut rest = bytes;
            loop {
                match std::str::from_utf8(rest) {
                    Ok(valid) => {
                        for ch in valid.chars() {
                            push!(Scanned::Char(ch));
                            text.push(ch);
                        }
                        break;
                    }
                    Err(err) => {
                        let good = err.valid_up_to();
                        let valid = std::str::from_utf8(&rest[..good]).unwrap();
                        for ch in valid.chars() {
                            push!(Scanned::Char(ch));
                            text.push(ch);
                        }
                        push!(Scanned::InvalidEncoding);
                        text.push('\u{FFFD}');
                        let skip = err.error_len().unwrap_or(1).max(1);
                        rest = &rest[good + skip..];
                        if rest.is_empty() {
                            break;
                        }
                    }
                }
            }
        }
        Encoding::Utf16Le | Encoding::Utf16Be => {
            let units16: Vec<u16> = bytes
                .chunks(2)
                .map(|pair| match encoding {
                    Encoding::Utf16Le => u16::from_le_bytes([pair[0], *pair.get(1).unwrap_or(&0)]),
                    _ => u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]),
                })
                .collect();
            for result in char::decode_utf16(units16) {
                match result {
                    Ok(ch) => {
                        push!(Scanned::Char(ch));
                        text.push(ch);
                    }
                    Err(_) => {
                        push!(Scanned::InvalidCharacter);
                        text.push('\u{FFFD}');
                    }
                }
            }
        }
        Encoding::Utf32Le | Encoding::Utf32Be => {
            for chunk in bytes.chunks(4) {
                if chunk.len() < 4 {
                    push!(Scanned::InvalidEncoding);
                    text.push('\u{FFFD}');
                    continue;
                }
                let raw = match encoding {
                    Encoding::Utf32Le => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                    _ => u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                };
                match char::from_u32(raw) {
                    Some(ch) => {
                        push!(Scanned::Char(ch));
                        text.push(ch);
                    }
                    None => {
                        push!(Scanned::InvalidCharacter);
                        text.push('\u{FFFD}');
                    }
                }
            }
        }
    }

    units.push((text.len() as u32, Scanned::EndOfFile));
    Decoded { text, units }
}

/// Owns the normalized UTF-8 buffer and every decoded unit; shared by
/// `SourceText` and every sub-range view re-entering it for interpolation
/// fragments, so re-entrant lexing never copies the buffer.
struct Buffer {
    name: String,
    encoding: Encoding,
    decoded: Decoded,
}

/// A forward-cursor reader over a source buffer, producing 32-bit code
/// points. `SourceText` never owns a copy of the buffer: the initial
/// instance decodes once, and every re-entrant sub-range view (used to
/// re-lex string-interpolation fragments) shares the same `Rc<Buffer>`.
pub struct SourceText {
    buffer: Rc<Buffer>,
    tabsize: u32,
    /// Index into `buffer.decoded.units` of the current unit.
    index: usize,
    /// Index one-past the last unit this view is allowed to read (exclusive
    /// upper bound for sub-range views; `units.len()` for the root).
    limit: usize,
    line: u32,
    column: u32,
}

impl SourceText {
    pub const DEFAULT_TABSIZE: u32 = 4;

    pub fn new(name: impl Into<String>, bytes: &[u8], tabsize: u32) -> Self {
        let (encoding, bom_len) = Encoding::sniff(bytes);
        Self::with_encoding(name, bytes, encoding, bom_len, tabsize)
    }

    pub fn with_encoding(name: impl Into<String>, bytes: &[u8], encoding: Encoding, skip_bom: usize, tabsize: u32) -> Self {
        let decoded = decode(&bytes[skip_bom.min(bytes.len())..], encoding);
        let limit = decoded.units.len();
        let buffer = Rc::new(Buffer { name: name.into(), encoding, decoded });
        SourceText { buffer, tabsize, index: 0, limit, line: 1, column: 0 }
    }

    /// Construct a view over `range` of `parent`'s already-decoded buffer,
    /// without copying it. Used to re-enter the lexer on a `${ ... }`
    /// interpolation fragment once the outer string body scan has found
    /// its extent.
    pub fn sub_range(parent: &SourceText, range: SourceRange) -> Self {
        let units = &parent.buffer.decoded.units;
        let start_index = units
            .iter()
            .position(|(off, _)| *off >= range.begin.cursor)
            .unwrap_or(units.len() - 1);
        let end_index = units
            .iter()
            .position(|(off, _)| *off >= range.end.cursor)
            .unwrap_or(units.len() - 1);
        SourceText {
            buffer: Rc::clone(&parent.buffer),
            tabsize: parent.tabsize,
            index: start_index,
            limit: end_index + 1,
            line: range.begin.line,
            column: range.begin.column,
        }
    }

    pub fn name(&self) -> &str {
        &self.buffer.name
    }

    pub fn encoding_name(&self) -> &str {
        self.buffer.encoding.name()
    }

    fn current_unit(&self) -> Scanned {
        if self.index >= self.limit {
            Scanned::EndOfFile
        } else {
            self.buffer.decoded.units[self.index].1
        }
    }

    pub fn peek(&self) -> Scanned {
        self.current_unit()
    }

    pub fn advance(&mut self) -> Scanned {
        let ch = self.current_unit();
        self.bump();
        ch
    }

    fn bump(&mut self) {
        if self.index >= self.limit {
            return;
        }
        let scanned = self.buffer.decoded.units[self.index].1;
        self.index += 1;

        match scanned {
            Scanned::Char('\n') => {
                self.line += 1;
                self.column = 0;
            }
            Scanned::Char('\r') => {
                // \r\n counts as a single newline; only advance the line
                // once, on whichever of the pair is seen first.
                if self.current_unit() != Scanned::Char('\n') {
                    self.line += 1;
                    self.column = 0;
                }
            }
            Scanned::Char('\t') => {
                self.column = (self.column / self.tabsize + 1) * self.tabsize;
            }
            _ => {
                self.column += 1;
            }
        }
    }

    pub fn consume_if(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn consume_while(&mut self, mut predicate: impl FnMut(Scanned) -> bool) -> SourcePosition {
        while predicate(self.peek()) && !self.peek().is_eof() {
            self.bump();
        }
        self.position()
    }

    pub fn consume_until(&mut self, mut predicate: impl FnMut(Scanned) -> bool) -> SourcePosition {
        while !predicate(self.peek()) && !self.peek().is_eof() {
            self.bump();
        }
        self.position()
    }

    fn byte_offset(&self) -> u32 {
        if self.index >= self.buffer.decoded.units.len() {
            self.buffer.decoded.text.len() as u32
        } else {
            self.buffer.decoded.units[self.index].0
        }
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.byte_offset(), self.line, self.column)
    }

    /// Extract the original text spanned by `range`, for diagnostics.
    pub fn string(&self, range: SourceRange) -> &str {
        let begin = range.begin.cursor as usize;
        let end = range.end.cursor as usize;
        &self.buffer.decoded.text[begin..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(src: &mut SourceText) -> Vec<Scanned> {
        let mut out = Vec::new();
        loop {
            let ch = src.advance();
            if ch.is_eof() {
                break;
            }
            out.push(ch);
        }
        out
    }

    #[test]
    fn ascii_round_trips() {
        let mut src = SourceText::new("t", b"var x", SourceText::DEFAULT_TABSIZE);
        let chars: String = scan_all(&mut src).into_iter().filter_map(|c| c.as_char()).collect();
        assert_eq!(chars, "var x");
    }

    #[test]
    fn crlf_counts_as_one_newline() {
        let mut src = SourceText::new("t", b"a\r\nb", SourceText::DEFAULT_TABSIZE);
        src.advance(); // a
        src.advance(); // \r
        assert_eq!(src.position().line, 2);
        src.advance(); // \n
        assert_eq!(src.position().line, 2);
    }

    #[test]
    fn tab_advances_to_next_stop() {
        let mut src = SourceText::new("t", b"\tx", SourceText::DEFAULT_TABSIZE);
        src.advance();
        assert_eq!(src.position().column, 4);
    }

    #[test]
    fn invalid_utf8_reports_sentinel() {
        let mut src = SourceText::new("t", b"a\xFFb", SourceText::DEFAULT_TABSIZE);
        assert_eq!(src.advance(), Scanned::Char('a'));
        assert_eq!(src.advance(), Scanned::InvalidEncoding);
        assert_eq!(src.advance(), Scanned::Char('b'));
    }

    #[test]
    fn bom_is_sniffed_and_skipped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"x");
        let mut src = SourceText::new("t", &bytes, SourceText::DEFAULT_TABSIZE);
        assert_eq!(src.advance(), Scanned::Char('x'));
    }
}
