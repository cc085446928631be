mod char_class;
mod keyword;
mod lexer;
mod source_text;
mod token;

pub use lexer::Lexer;
pub use source_text::{Encoding, Scanned, SourceText};
pub use token::{Token, TokenKind};

pub use keyword::lookup as lookup_keyword;
