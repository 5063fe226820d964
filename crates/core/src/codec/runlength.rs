//! RunLength stream codec.

use crate::error::{PdfError, Result};

/// Decode RunLength-encoded data.
///
/// Format:
/// - Length byte 0-127: Copy next (length + 1) bytes literally
/// - Length byte 128: End of data, even if bytes remain
/// - Length byte 129-255: Repeat next byte (257 - length) times
///
/// A run cut short by the end of input is an error. A missing EOD byte is
/// accepted.
pub fn rldecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let length = data[i];
        i += 1;

        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                let literal = data.get(i..i + count).ok_or_else(|| {
                    PdfError::decode(
                        "RunLengthDecode",
                        format!("literal run of {count} bytes truncated at offset {i}"),
                    )
                })?;
                result.extend_from_slice(literal);
                i += count;
            }
            129..=255 => {
                let byte = *data.get(i).ok_or_else(|| {
                    PdfError::decode("RunLengthDecode", "repeat run missing its byte")
                })?;
                i += 1;
                result.extend(std::iter::repeat_n(byte, 257 - length as usize));
            }
        }
    }

    Ok(result)
}

/// Encode data with RunLength, terminated by the EOD byte.
pub fn rlencode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 2);
    let mut literal_start = 0;
    let mut i = 0;

    let flush_literal = |out: &mut Vec<u8>, literal: &[u8]| {
        for chunk in literal.chunks(128) {
            out.push((chunk.len() - 1) as u8);
            out.extend_from_slice(chunk);
        }
    };

    while i < data.len() {
        let byte = data[i];
        let mut run = 1;
        while run < 128 && i + run < data.len() && data[i + run] == byte {
            run += 1;
        }
        if run >= 2 {
            flush_literal(&mut out, &data[literal_start..i]);
            out.push((257 - run) as u8);
            out.push(byte);
            i += run;
            literal_start = i;
        } else {
            i += 1;
        }
    }
    flush_literal(&mut out, &data[literal_start..]);
    out.push(128);
    out
}
