//! Error types for the vellum PDF library.

use thiserror::Error;

/// Primary error type for PDF parsing, decoding and writing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Malformed token shape (lone `)`, stray `>`, bad hex digit).
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    /// Input ended inside a token or container.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Structural error: non-Name dictionary key, misplaced delimiter or operator.
    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    /// Unknown filter, missing required filter keys, unsupported parameter shape.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Corrupt payload that a codec cannot invert.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// API used out of order (e.g. writing a length before the stream body).
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("no valid xref table found")]
    NoValidXRef,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    pub(crate) fn decode(filter: &str, msg: impl std::fmt::Display) -> Self {
        Self::DecodeError(format!("{filter}: {msg}"))
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
