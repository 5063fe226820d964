//! LZW stream codec using the weezl crate.

use crate::error::{PdfError, Result};
use weezl::{BitOrder, LzwStatus, decode::Decoder, encode::Encoder};

/// Decode LZW-encoded data (PDF variant: MSB first, 8-bit, EarlyChange 1).
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, 1)
}

/// Decode LZW-encoded data with an explicit EarlyChange setting.
///
/// EarlyChange=1 (the PDF default) widens codes one entry early, which is
/// weezl's TIFF size switch; EarlyChange=0 is the plain GIF-style switch.
/// A missing EOD code is accepted; an invalid code is an error.
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    let mut decoder = if early_change == 0 {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    let mut output = Vec::with_capacity(data.len() * 3);
    let result = decoder.into_vec(&mut output).decode(data);
    match result.status {
        Ok(LzwStatus::Done | LzwStatus::Ok | LzwStatus::NoProgress) => Ok(output),
        Err(err) => Err(PdfError::decode("LZWDecode", err)),
    }
}

/// Encode data with LZW (MSB first, 8-bit, EarlyChange 1).
pub fn lzwencode(data: &[u8]) -> Result<Vec<u8>> {
    Encoder::with_tiff_size_switch(BitOrder::Msb, 8)
        .encode(data)
        .map_err(|err| PdfError::decode("LZWDecode", err))
}
