//! Reading PDF files.
//!
//! - `reader`: cross-reference parsing, trailer and the lazy object cache

pub mod reader;

pub use reader::{PdfReader, XRefEntry};
