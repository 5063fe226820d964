//! Codec modules for PDF stream filters and encryption.
//!
//! This module contains:
//! - `aes`: AES-CBC encryption/decryption
//! - `arcfour`: RC4 encryption
//! - `ascii85`: ASCII85 and ASCIIHex codecs
//! - `ccitt`: CCITT fax decompression
//! - `flate`: zlib codec
//! - `lzw`: LZW codec
//! - `predictor`: TIFF and PNG predictors
//! - `runlength`: RunLength codec
//!
//! [`FilterRegistry`] maps `/Filter` names to decoders and applies a
//! stream's whole filter chain.

pub mod aes;
pub mod arcfour;
pub mod ascii85;
pub mod ccitt;
pub mod flate;
pub mod lzw;
pub mod predictor;
pub mod runlength;

pub use arcfour::Arcfour;
pub use ascii85::{ascii85decode, ascii85encode, asciihexdecode, asciihexencode};
pub use ccitt::ccittfaxdecode;
pub use flate::{flate_decode, flate_encode};
pub use lzw::{lzwdecode, lzwdecode_with_earlychange, lzwencode};
pub use predictor::apply_predictor;
pub use runlength::{rldecode, rlencode};

use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{PDFObject, PDFValue};
use crate::model::table::{NoResolver, Resolver, resolve_direct};
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Integer entry of a `DecodeParms` dictionary, or `default`.
pub(crate) fn param_int(params: Option<&PDFDictionary>, key: &str, default: i64) -> i64 {
    params
        .and_then(|p| p.get_int(key, &NoResolver))
        .unwrap_or(default)
}

/// A single stream filter.
///
/// `filter` is the name the decoder was looked up under, `params` the
/// filter's `DecodeParms` entry and `stream_dict` the owning stream's
/// dictionary (CCITT reads the image size from it).
pub trait FilterDecoder: Send + Sync {
    fn decode(
        &self,
        data: &[u8],
        filter: &str,
        params: Option<&PDFDictionary>,
        stream_dict: &PDFDictionary,
    ) -> Result<Vec<u8>>;
}

impl<F> FilterDecoder for F
where
    F: Fn(&[u8], &str, Option<&PDFDictionary>, &PDFDictionary) -> Result<Vec<u8>> + Send + Sync,
{
    fn decode(
        &self,
        data: &[u8],
        filter: &str,
        params: Option<&PDFDictionary>,
        stream_dict: &PDFDictionary,
    ) -> Result<Vec<u8>> {
        self(data, filter, params, stream_dict)
    }
}

/// Filter name to decoder table.
#[derive(Clone)]
pub struct FilterRegistry {
    decoders: FxHashMap<String, Arc<dyn FilterDecoder>>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// A registry with no decoders at all.
    pub fn empty() -> Self {
        Self {
            decoders: FxHashMap::default(),
        }
    }

    /// A registry with every built-in filter and its abbreviation.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for name in ["FlateDecode", "Fl"] {
            registry.register(name, flate_filter);
        }
        for name in ["LZWDecode", "LZW"] {
            registry.register(name, lzw_filter);
        }
        for name in ["ASCIIHexDecode", "AHx"] {
            registry.register(name, asciihex_filter);
        }
        for name in ["ASCII85Decode", "A85"] {
            registry.register(name, ascii85_filter);
        }
        for name in ["RunLengthDecode", "RL"] {
            registry.register(name, runlength_filter);
        }
        for name in ["CCITTFaxDecode", "CCF"] {
            registry.register(name, ccitt_filter);
        }
        // Decryption happens before the chain; image codecs stay encoded.
        for name in ["Crypt", "DCTDecode", "DCT", "JPXDecode", "JBIG2Decode"] {
            registry.register(name, passthrough_filter);
        }
        registry
    }

    /// Add or replace the decoder for `name`.
    pub fn register(&mut self, name: impl Into<String>, decoder: impl FilterDecoder + 'static) {
        self.decoders.insert(name.into(), Arc::new(decoder));
    }

    pub fn get(&self, name: &str) -> Option<&dyn FilterDecoder> {
        self.decoders.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Apply the `/Filter` chain of `stream_dict` to `data`.
    ///
    /// Filter names and parameter dictionaries may be indirect; they are
    /// resolved through `resolver`. A stream without `/Filter` decodes to
    /// its raw bytes.
    pub fn decode<R: Resolver + ?Sized>(
        &self,
        data: &[u8],
        stream_dict: &PDFDictionary,
        resolver: &R,
    ) -> Result<Vec<u8>> {
        let filters = filter_chain(stream_dict, resolver)?;
        let params = decode_parms(stream_dict, resolver, filters.len())?;

        let mut current = Cow::Borrowed(data);
        for (name, params) in filters.into_iter().zip(params) {
            let Some(decoder) = self.get(name) else {
                warn!(filter = name, "unknown stream filter");
                return Err(PdfError::UnsupportedFormat(format!("unknown filter /{name}")));
            };
            current = Cow::Owned(decoder.decode(&current, name, params, stream_dict)?);
        }
        Ok(current.into_owned())
    }
}

/// `/Filter` as a list of names.
fn filter_chain<'a, R: Resolver + ?Sized>(
    dict: &'a PDFDictionary,
    resolver: &'a R,
) -> Result<Vec<&'a str>> {
    let Some(filter) = dict.get_direct("Filter", resolver) else {
        return Ok(Vec::new());
    };
    match filter.value() {
        PDFValue::Null => Ok(Vec::new()),
        PDFValue::Name(name) => Ok(vec![name.as_str()]),
        PDFValue::Array(items) => items
            .iter()
            .map(|item| {
                resolve_direct(item, resolver)
                    .and_then(PDFObject::as_name)
                    .ok_or_else(|| {
                        PdfError::UnsupportedFormat(format!(
                            "/Filter array entry is {}",
                            item.type_name()
                        ))
                    })
            })
            .collect(),
        other => Err(PdfError::UnsupportedFormat(format!(
            "/Filter is {}",
            other.type_name()
        ))),
    }
}

/// `/DecodeParms` aligned with a chain of `count` filters.
///
/// A single dictionary belongs to the first filter only.
fn decode_parms<'a, R: Resolver + ?Sized>(
    dict: &'a PDFDictionary,
    resolver: &'a R,
    count: usize,
) -> Result<Vec<Option<&'a PDFDictionary>>> {
    let mut params = vec![None; count];
    let Some(value) = dict.get_direct("DecodeParms", resolver) else {
        return Ok(params);
    };
    match value.value() {
        PDFValue::Null => {}
        PDFValue::Dict(d) => {
            if let Some(first) = params.first_mut() {
                *first = Some(d);
            }
        }
        PDFValue::Array(items) => {
            for (slot, item) in params.iter_mut().zip(items.iter()) {
                let entry = resolve_direct(item, resolver);
                *slot = match entry.map(PDFObject::value) {
                    None | Some(PDFValue::Null) => None,
                    Some(PDFValue::Dict(d)) => Some(d),
                    Some(other) => {
                        return Err(PdfError::UnsupportedFormat(format!(
                            "/DecodeParms entry is {}",
                            other.type_name()
                        )));
                    }
                };
            }
        }
        other => {
            return Err(PdfError::UnsupportedFormat(format!(
                "/DecodeParms is {}",
                other.type_name()
            )));
        }
    }
    Ok(params)
}

fn flate_filter(
    data: &[u8],
    _filter: &str,
    params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    apply_predictor(flate_decode(data)?, params)
}

fn lzw_filter(
    data: &[u8],
    _filter: &str,
    params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    let early_change = param_int(params, "EarlyChange", 1);
    apply_predictor(lzwdecode_with_earlychange(data, early_change)?, params)
}

fn asciihex_filter(
    data: &[u8],
    _filter: &str,
    _params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    asciihexdecode(data)
}

fn ascii85_filter(
    data: &[u8],
    _filter: &str,
    _params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    ascii85decode(data)
}

fn runlength_filter(
    data: &[u8],
    _filter: &str,
    _params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    rldecode(data)
}

fn ccitt_filter(
    data: &[u8],
    _filter: &str,
    params: Option<&PDFDictionary>,
    stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    ccittfaxdecode(data, params, stream_dict)
}

fn passthrough_filter(
    data: &[u8],
    _filter: &str,
    _params: Option<&PDFDictionary>,
    _stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    Ok(data.to_vec())
}
