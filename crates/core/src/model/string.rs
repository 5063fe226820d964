//! PDF string objects.

use crate::utils::{decode_text, encode_pdf_doc, encode_utf16be};

/// How the bytes of a string were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Bytes supplied directly; no text interpretation implied.
    #[default]
    Raw,
    PdfDoc,
    /// UTF-16BE with a leading byte-order mark.
    Utf16Be,
}

/// Byte string with an encoding hint and a hex-write flag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PDFString {
    bytes: Vec<u8>,
    encoding: TextEncoding,
    hex: bool,
}

impl PDFString {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: TextEncoding::Raw,
            hex: false,
        }
    }

    /// Text string: PDFDocEncoding when every character fits, else UTF-16BE.
    pub fn from_text(text: &str) -> Self {
        match encode_pdf_doc(text) {
            Some(bytes) => Self {
                bytes,
                encoding: TextEncoding::PdfDoc,
                hex: false,
            },
            None => Self {
                bytes: encode_utf16be(text),
                encoding: TextEncoding::Utf16Be,
                hex: false,
            },
        }
    }

    /// Builder-style toggle for `<hex>` serialization.
    pub fn with_hex(mut self, hex: bool) -> Self {
        self.hex = hex;
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub const fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn set_hex(&mut self, hex: bool) {
        self.hex = hex;
    }

    /// Decode as a text string (BOM-detected UTF-16BE, else PDFDocEncoding).
    pub fn to_text(&self) -> String {
        decode_text(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
