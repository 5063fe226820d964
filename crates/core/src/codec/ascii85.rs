//! ASCII85 and ASCIIHex stream codecs.

use crate::error::{PdfError, Result};

const fn is_ascii_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x00' | b'\x0c')
}

/// Decode ASCII85-encoded data (PDF variant).
///
/// Accepts `<~ ~>` markers, whitespace, `z` for a zero group and a missing
/// EOD. Characters outside `!`..`u`, a `z` inside a group, a lone final
/// character and group overflow are errors.
pub fn ascii85decode(data: &[u8]) -> Result<Vec<u8>> {
    let data = data.strip_prefix(b"<~").unwrap_or(data);

    let mut result = Vec::with_capacity(data.len() / 5 * 4 + 4);
    let mut group = [0u8; 5];
    let mut n = 0;

    for (pos, &byte) in data.iter().enumerate() {
        match byte {
            b'~' => break,
            b'z' => {
                if n != 0 {
                    return Err(PdfError::decode(
                        "ASCII85Decode",
                        format!("'z' inside a group at offset {pos}"),
                    ));
                }
                result.extend_from_slice(&[0; 4]);
            }
            b'!'..=b'u' => {
                group[n] = byte - b'!';
                n += 1;
                if n == 5 {
                    result.extend_from_slice(&group_value(&group)?.to_be_bytes());
                    n = 0;
                }
            }
            b if is_ascii_whitespace(b) => {}
            other => {
                return Err(PdfError::decode(
                    "ASCII85Decode",
                    format!("invalid character {other:#04x} at offset {pos}"),
                ));
            }
        }
    }

    match n {
        0 => {}
        1 => {
            return Err(PdfError::decode(
                "ASCII85Decode",
                "final group has a single character",
            ));
        }
        _ => {
            group[n..].fill(b'u' - b'!');
            let bytes = group_value(&group)?.to_be_bytes();
            result.extend_from_slice(&bytes[..n - 1]);
        }
    }

    Ok(result)
}

fn group_value(digits: &[u8; 5]) -> Result<u32> {
    let value = digits
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + u64::from(d));
    u32::try_from(value)
        .map_err(|_| PdfError::decode("ASCII85Decode", "group value exceeds 2^32"))
}

/// Encode data as ASCII85, terminated with `~>`.
pub fn ascii85encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 7);
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(word);
        if chunk.len() == 4 && value == 0 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        for slot in digits.iter_mut().rev() {
            *slot = (value % 85) as u8 + b'!';
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}

/// Decode ASCIIHex-encoded data.
///
/// Whitespace is skipped, `>` ends the data, an odd final digit is padded
/// with zero. Any other character is an error.
pub fn asciihexdecode(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;

    for (pos, &byte) in data.iter().enumerate() {
        if byte == b'>' {
            break;
        }
        if is_ascii_whitespace(byte) {
            continue;
        }
        let nibble = hex_nibble(byte).ok_or_else(|| {
            PdfError::decode(
                "ASCIIHexDecode",
                format!("invalid character {byte:#04x} at offset {pos}"),
            )
        })?;
        match pending.take() {
            Some(high) => result.push((high << 4) | nibble),
            None => pending = Some(nibble),
        }
    }

    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

/// Encode data as uppercase hex pairs, terminated with `>`.
pub fn asciihexencode(data: &[u8]) -> Vec<u8> {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = Vec::with_capacity(data.len() * 2 + 1);
    for &b in data {
        out.push(DIGITS[(b >> 4) as usize]);
        out.push(DIGITS[(b & 0x0F) as usize]);
    }
    out.push(b'>');
    out
}

pub(crate) const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
