//! Flate (zlib) stream codec.

use crate::error::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Inflate a complete zlib stream.
///
/// Corrupt data and streams that end before the zlib trailer are errors;
/// partial output is never returned.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = inflater.total_in() as usize;
        let status = inflater
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| PdfError::decode("FlateDecode", e))?;
        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let input_left = (inflater.total_in() as usize) < data.len();
                let made_room = out.len() == out.capacity();
                if !input_left && !made_room {
                    return Err(PdfError::decode("FlateDecode", "truncated zlib stream"));
                }
            }
        }
    }
}

/// Deflate `data` into a zlib stream at `level`.
pub fn flate_encode(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_stream_is_error() {
        let encoded = flate_encode(&[42u8; 1000], Compression::default()).unwrap();
        let cut = &encoded[..encoded.len() - 6];
        assert!(matches!(flate_decode(cut), Err(PdfError::DecodeError(_))));
    }

    #[test]
    fn test_stream_split_across_output_growth() {
        // Output far larger than the initial buffer, so decompression resumes
        // with input still pending.
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let encoded = flate_encode(&data, Compression::fast()).unwrap();
        assert_eq!(flate_decode(&encoded).unwrap(), data);
        assert!(flate_decode(&encoded[..encoded.len() / 2]).is_err());
    }

    #[test]
    fn test_large_output_grows_buffer() {
        let data = vec![7u8; 1 << 20];
        let encoded = flate_encode(&data, Compression::best()).unwrap();
        assert_eq!(flate_decode(&encoded).unwrap(), data);
    }
}
