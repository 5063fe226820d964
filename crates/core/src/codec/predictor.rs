//! Predictor post-processing for Flate and LZW (TIFF 2, PNG 10-15).

use crate::codec::param_int;
use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;

/// Predictor parameters from a filter's `DecodeParms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

/// Most components per sample accepted.
const MAX_COLORS: usize = 32;
/// Longest predicted row accepted, in bytes.
const MAX_ROW_BYTES: usize = 1 << 24;

impl PredictorParams {
    pub fn from_dict(params: Option<&PDFDictionary>) -> Self {
        let defaults = Self::default();
        let positive = |key: &str| usize::try_from(param_int(params, key, 1).max(1)).unwrap_or(usize::MAX);
        Self {
            predictor: param_int(params, "Predictor", defaults.predictor),
            colors: positive("Colors"),
            bits_per_component: usize::try_from(param_int(params, "BitsPerComponent", 8).max(1))
                .unwrap_or(usize::MAX),
            columns: positive("Columns"),
        }
    }

    /// Bytes per row of samples, without the PNG tag byte. Fails when the
    /// geometry overflows or exceeds the row limit.
    pub fn row_bytes(&self) -> Result<usize> {
        if self.colors == 0 || self.colors > MAX_COLORS {
            return Err(PdfError::decode("Predictor", format!("unsupported Colors {}", self.colors)));
        }
        if !matches!(self.bits_per_component, 1 | 2 | 4 | 8 | 16) {
            return Err(PdfError::decode(
                "Predictor",
                format!("unsupported BitsPerComponent {}", self.bits_per_component),
            ));
        }
        self.colors
            .checked_mul(self.bits_per_component)
            .and_then(|bits| bits.checked_mul(self.columns))
            .map(|bits| bits.div_ceil(8))
            .filter(|&len| len <= MAX_ROW_BYTES)
            .ok_or_else(|| PdfError::decode("Predictor", format!("{} columns is too wide", self.columns)))
    }

    /// Bytes per whole pixel, at least one.
    fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component / 8).max(1)
    }
}

/// Undo the predictor named in `params`; values below 10 other than 2 are
/// identity.
pub fn apply_predictor(data: Vec<u8>, params: Option<&PDFDictionary>) -> Result<Vec<u8>> {
    let p = PredictorParams::from_dict(params);
    match p.predictor {
        2 => apply_tiff_predictor(&data, &p),
        n if n >= 10 => apply_png_predictor(&data, &p),
        _ => Ok(data),
    }
}

/// TIFF predictor 2: horizontal differencing per component.
pub fn apply_tiff_predictor(data: &[u8], p: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = p.row_bytes()?;
    let mut out = Vec::with_capacity(data.len());
    match p.bits_per_component {
        8 => {
            for row in data.chunks(row_bytes) {
                let start = out.len();
                for (i, &v) in row.iter().enumerate() {
                    let left = if i >= p.colors { out[start + i - p.colors] } else { 0 };
                    out.push(v.wrapping_add(left));
                }
            }
        }
        16 => {
            let stride = p.colors * 2;
            for row in data.chunks(row_bytes) {
                let start = out.len();
                out.extend_from_slice(row);
                let mut i = stride;
                while i + 1 < row.len() {
                    let left = u16::from_be_bytes([out[start + i - stride], out[start + i - stride + 1]]);
                    let cur = u16::from_be_bytes([row[i], row[i + 1]]);
                    let [hi, lo] = cur.wrapping_add(left).to_be_bytes();
                    out[start + i] = hi;
                    out[start + i + 1] = lo;
                    i += 2;
                }
            }
        }
        bpc @ (1 | 2 | 4) => {
            let mask = (1u16 << bpc) - 1;
            let per_row = p.colors * p.columns;
            for row in data.chunks(row_bytes) {
                let mut decoded = vec![0u8; row.len()];
                let mut prev = vec![0u16; p.colors];
                for sample in 0..per_row {
                    let bit = sample * bpc;
                    let byte = bit / 8;
                    if byte >= row.len() {
                        break;
                    }
                    let shift = 8 - bpc - bit % 8;
                    let delta = (u16::from(row[byte]) >> shift) & mask;
                    let component = sample % p.colors;
                    let value = (prev[component] + delta) & mask;
                    prev[component] = value;
                    decoded[byte] |= (value << shift) as u8;
                }
                out.extend_from_slice(&decoded);
            }
        }
        other => {
            return Err(PdfError::UnsupportedFormat(format!(
                "TIFF predictor with {other} bits per component"
            )));
        }
    }
    Ok(out)
}

/// PNG predictors: each row starts with a filter-type byte.
pub fn apply_png_predictor(data: &[u8], p: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = p.row_bytes()?;
    let bpp = p.pixel_bytes();
    let row_size = row_bytes + 1;

    // No row is longer than the input itself.
    let buffer_len = row_bytes.min(data.len());
    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; buffer_len];
    let mut current_row = vec![0u8; buffer_len];

    for (row_index, chunk) in data.chunks(row_size).enumerate() {
        let filter_type = chunk[0];
        let row_data = &chunk[1..];
        let n = row_data.len();
        current_row[..n].fill(0);

        match filter_type {
            0 => current_row[..n].copy_from_slice(row_data),
            1 => {
                for i in 0..n {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..n {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..n {
                    let left = if i >= bpp { u16::from(current_row[i - bpp]) } else { 0 };
                    let above = u16::from(prev_row[i]);
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..n {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(paeth_predictor(left, above, upper_left));
                }
            }
            other => {
                return Err(PdfError::decode(
                    "Predictor",
                    format!("invalid PNG filter type {other} in row {row_index}"),
                ));
            }
        }

        result.extend_from_slice(&current_row[..n]);
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    Ok(result)
}

const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
