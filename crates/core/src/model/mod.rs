//! PDF object model.
//!
//! - `objects`: values, identities and the id allocator
//! - `array` / `dictionary` / `string` / `stream`: container and payload types
//! - `table`: indirect object arena and reference resolution
//! - `serialize`: `to_pdf` byte output

pub mod array;
pub mod dictionary;
pub mod objects;
pub mod serialize;
pub mod stream;
pub mod string;
pub mod table;

pub use array::PDFArray;
pub use dictionary::PDFDictionary;
pub use objects::{IdAllocator, ObjectId, PDFObjRef, PDFObject, PDFValue};
pub use stream::PDFStream;
pub use string::{PDFString, TextEncoding};
pub use table::{MAX_REFERENCE_HOPS, NoResolver, ObjectTable, Resolver, resolve_direct};
