//! Reader and writer parameters.

/// Flate compression settings applied by `PDFStream::flate_compress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionParams {
    /// Master switch; when false, compression requests are no-ops.
    pub enabled: bool,
    /// zlib level, 0 (store) to 9 (best). Larger values are clamped.
    pub level: u32,
}

impl Default for CompressionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
        }
    }
}

impl CompressionParams {
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            level: 0,
        }
    }

    pub fn with_level(level: u32) -> Self {
        Self {
            enabled: true,
            level: level.min(9),
        }
    }

    pub(crate) fn flate_level(&self) -> flate2::Compression {
        flate2::Compression::new(self.level.min(9))
    }
}

/// Parameters for `PdfWriter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterParams {
    pub compression: CompressionParams,

    /// Header version, written as `%PDF-major.minor`.
    pub version: (u8, u8),

    /// Emit the high-bit comment line after the header so transports treat
    /// the file as binary.
    pub binary_comment: bool,
}

impl Default for WriterParams {
    fn default() -> Self {
        Self {
            compression: CompressionParams::default(),
            version: (1, 7),
            binary_comment: true,
        }
    }
}

/// Parameters for `PdfReader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderParams {
    /// Maximum number of parsed objects kept in the cache. `None` keeps
    /// everything until released.
    pub cache_capacity: Option<usize>,

    /// Rebuild the cross-reference table by scanning for `N G obj` when the
    /// table is missing or damaged.
    pub allow_xref_fallback: bool,
}

impl Default for ReaderParams {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            allow_xref_fallback: true,
        }
    }
}
