//! PDF object types.
//!
//! Every value carries an [`ObjectId`] handed out by an [`IdAllocator`].
//! Equality and hashing use that identity, not the contents: two objects
//! built from the same tokens are different objects.

use crate::error::{PdfError, Result};
use crate::model::array::PDFArray;
use crate::model::dictionary::PDFDictionary;
use crate::model::stream::PDFStream;
use crate::model::string::PDFString;
use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of a value, unique within one [`IdAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Source of object identities for one document session.
///
/// Ids increase strictly in creation order. The allocator is the only way
/// to construct values, so it doubles as the value factory.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: Cell<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next identity.
    pub fn next_id(&self) -> ObjectId {
        let id = self.next.get();
        self.next.set(id + 1);
        ObjectId(id)
    }

    /// Number of identities handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.get()
    }

    pub fn wrap(&self, value: PDFValue) -> PDFObject {
        PDFObject {
            id: self.next_id(),
            value,
        }
    }

    pub fn null(&self) -> PDFObject {
        self.wrap(PDFValue::Null)
    }

    pub fn boolean(&self, value: bool) -> PDFObject {
        self.wrap(PDFValue::Bool(value))
    }

    pub fn number(&self, value: f64) -> PDFObject {
        self.wrap(PDFValue::Number(value))
    }

    pub fn int(&self, value: i64) -> PDFObject {
        self.wrap(PDFValue::Number(value as f64))
    }

    pub fn name(&self, name: impl Into<String>) -> PDFObject {
        self.wrap(PDFValue::Name(name.into()))
    }

    pub fn string(&self, string: PDFString) -> PDFObject {
        self.wrap(PDFValue::String(string))
    }

    /// Raw byte string, no encoding hint.
    pub fn bytes(&self, bytes: impl Into<Vec<u8>>) -> PDFObject {
        self.string(PDFString::from_bytes(bytes))
    }

    /// Text string, PDFDocEncoding when possible, UTF-16BE otherwise.
    pub fn text(&self, text: &str) -> PDFObject {
        self.string(PDFString::from_text(text))
    }

    pub fn array(&self, array: PDFArray) -> PDFObject {
        self.wrap(PDFValue::Array(array))
    }

    pub fn dict(&self, dict: PDFDictionary) -> PDFObject {
        self.wrap(PDFValue::Dict(dict))
    }

    pub fn stream(&self, stream: PDFStream) -> PDFObject {
        self.wrap(PDFValue::Stream(Box::new(stream)))
    }

    pub fn reference(&self, reference: PDFObjRef) -> PDFObject {
        self.wrap(PDFValue::Ref(reference))
    }
}

/// The nine PDF value kinds.
#[derive(Debug)]
pub enum PDFValue {
    Null,
    Bool(bool),
    /// Integers and reals share one numeric representation.
    Number(f64),
    /// Name object (e.g., /Type, /Font), stored without the slash
    Name(String),
    String(PDFString),
    Array(PDFArray),
    Dict(PDFDictionary),
    Stream(Box<PDFStream>),
    /// Indirect object reference
    Ref(PDFObjRef),
}

impl PDFValue {
    /// Get type name for error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

/// A PDF value together with its identity.
///
/// The variant is fixed once built; only container contents can change.
#[derive(Debug)]
pub struct PDFObject {
    id: ObjectId,
    value: PDFValue,
}

impl PartialEq for PDFObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PDFObject {}

impl Hash for PDFObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PDFObject {
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    pub const fn value(&self) -> &PDFValue {
        &self.value
    }

    pub fn into_value(self) -> PDFValue {
        self.value
    }

    pub const fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub const fn is_null(&self) -> bool {
        matches!(self.value, PDFValue::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self.value {
            PDFValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self.value {
            PDFValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Numeric value truncated toward zero.
    pub fn as_int(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.is_finite())
            .map(|n| n as i64)
    }

    pub fn as_name(&self) -> Option<&str> {
        match &self.value {
            PDFValue::Name(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_string(&self) -> Option<&PDFString> {
        match &self.value {
            PDFValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_array(&self) -> Option<&PDFArray> {
        match &self.value {
            PDFValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut PDFArray> {
        match &mut self.value {
            PDFValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub const fn as_dict(&self) -> Option<&PDFDictionary> {
        match &self.value {
            PDFValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PDFDictionary> {
        match &mut self.value {
            PDFValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PDFStream> {
        match &self.value {
            PDFValue::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stream_mut(&mut self) -> Option<&mut PDFStream> {
        match &mut self.value {
            PDFValue::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_reference(&self) -> Option<PDFObjRef> {
        match self.value {
            PDFValue::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Deep copy with fresh identities throughout.
    ///
    /// Fails for streams backed by a one-shot reader.
    pub fn duplicate(&self, ids: &IdAllocator) -> Result<Self> {
        let value = match &self.value {
            PDFValue::Null => PDFValue::Null,
            PDFValue::Bool(b) => PDFValue::Bool(*b),
            PDFValue::Number(n) => PDFValue::Number(*n),
            PDFValue::Name(n) => PDFValue::Name(n.clone()),
            PDFValue::String(s) => PDFValue::String(s.clone()),
            PDFValue::Array(a) => PDFValue::Array(a.duplicate(ids)?),
            PDFValue::Dict(d) => PDFValue::Dict(d.duplicate(ids)?),
            PDFValue::Stream(s) => PDFValue::Stream(Box::new(s.duplicate(ids)?)),
            PDFValue::Ref(r) => PDFValue::Ref(*r),
        };
        Ok(ids.wrap(value))
    }
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PDFObjRef {
    /// Object number
    pub objid: u32,
    /// Generation number
    pub genno: u16,
}

impl PDFObjRef {
    /// Create a new object reference.
    pub const fn new(objid: u32, genno: u16) -> Self {
        Self { objid, genno }
    }
}

impl fmt::Display for PDFObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.objid, self.genno)
    }
}

// === Type conversion helper functions ===
//
// Strict counterparts of the `as_*` accessors, for call sites where a
// mismatch is a hard error.

/// Get integer value from object.
pub fn int_value(obj: &PDFObject) -> Result<i64> {
    obj.as_int().ok_or_else(|| type_error("int", obj))
}

/// Get numeric value from object.
pub fn num_value(obj: &PDFObject) -> Result<f64> {
    obj.as_number().ok_or_else(|| type_error("number", obj))
}

/// Get name value from object.
pub fn name_value(obj: &PDFObject) -> Result<&str> {
    obj.as_name().ok_or_else(|| type_error("name", obj))
}

/// Get dictionary value from object.
pub fn dict_value(obj: &PDFObject) -> Result<&PDFDictionary> {
    obj.as_dict().ok_or_else(|| type_error("dict", obj))
}

/// Get stream value from object.
pub fn stream_value(obj: &PDFObject) -> Result<&PDFStream> {
    obj.as_stream().ok_or_else(|| type_error("stream", obj))
}

const fn type_error(expected: &'static str, obj: &PDFObject) -> PdfError {
    PdfError::TypeError {
        expected,
        got: obj.type_name(),
    }
}
