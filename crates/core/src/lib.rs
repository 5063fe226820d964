//! vellum - PDF object model, syntax parser and stream filter pipeline.
//!
//! The crate reads and writes the low-level layer of PDF files: the value
//! types, the tokenizer and object parser, the stream filters (Flate, LZW,
//! ASCII85, ASCIIHex, RunLength, CCITT fax) and a sequential writer with
//! optional RC4 / AES-128 encryption.

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod params;
pub mod parser;
pub mod utils;
pub mod writer;

pub use codec::{FilterDecoder, FilterRegistry};
pub use document::{PdfReader, XRefEntry};
pub use error::{PdfError, Result};
pub use model::{
    IdAllocator, MAX_REFERENCE_HOPS, NoResolver, ObjectId, ObjectTable, PDFArray, PDFDictionary,
    PDFObjRef, PDFObject, PDFStream, PDFString, PDFValue, Resolver, TextEncoding, resolve_direct,
};
pub use params::{CompressionParams, ReaderParams, WriterParams};
pub use parser::{ContentParser, Lexer, MAX_NESTING_DEPTH, PDFParser, Token};
pub use writer::{CryptMethod, PdfEncryption, PdfWriter, WriterContext};
