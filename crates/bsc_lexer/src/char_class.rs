use unicode_xid::UnicodeXID;

use crate::source_text::Scanned;

pub fn is_whitespace(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c == ' ' || c == '\t')
}

pub fn is_eol(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char('\r') | Scanned::Char('\n'))
}

pub fn is_decimal(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c.is_ascii_digit())
}

pub fn is_binary(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c == '0' || c == '1')
}

pub fn is_octal(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if ('0'..='7').contains(&c))
}

pub fn is_hexadecimal(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c.is_ascii_hexdigit())
}

/// Identifier continuation class: ASCII word characters plus the Unicode
/// XID_Continue range (the practical stand-in for the design's C11 Annex
/// D.1 table -- the same substitution the teacher's own lexer makes via
/// `unicode-xid` rather than hand-rolling the annex).
pub fn is_identifier_continue(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c == '_' || c.is_ascii_digit() || UnicodeXID::is_xid_continue(c))
}

pub fn is_identifier_start(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if c == '_' || UnicodeXID::is_xid_start(c))
}

/// `IsNotAllowedUnicodeInitially`: code points that are valid XID_Continue
/// but explicitly excluded from the first position (the "not initially
/// allowed" subset the design calls out).
pub fn is_not_allowed_unicode_initially(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if UnicodeXID::is_xid_continue(c) && !UnicodeXID::is_xid_start(c) && c != '_')
}

pub fn is_allowed_unicode(ch: Scanned) -> bool {
    matches!(ch, Scanned::Char(c) if UnicodeXID::is_xid_start(c) || UnicodeXID::is_xid_continue(c))
}
