//! PDF syntax parsing.
//!
//! - `lexer`: byte-level tokenizer
//! - `pdf_parser`: object, indirect object and content-stream parser

pub mod lexer;
pub mod pdf_parser;

pub use lexer::{Keyword, Lexer, Token};
pub use pdf_parser::{ContentParser, IndirectObject, MAX_NESTING_DEPTH, Operation, PDFParser};
