//! CCITT fax decoder.
//!
//! ITU-T Recommendation T.4 - Group 3 facsimile (MH and MR coding)
//! ITU-T Recommendation T.6 - Group 4 facsimile (MMR coding)
//!
//! Group 3 input is decoded tolerantly: EOL codes are optional, a bad line
//! is skipped up to the next EOL, and a damaged stream is retried as
//! byte-aligned MH rows. Group 4 input is strict.

use crate::codec::param_int;
use crate::error::{PdfError, Result};
use crate::model::dictionary::PDFDictionary;
use crate::model::table::NoResolver;
use once_cell::sync::Lazy;
use tracing::debug;

/// Binary code tree, branching on each input bit.
#[derive(Debug)]
enum HuffNode<T> {
    Branch(Box<HuffNode<T>>, Box<HuffNode<T>>),
    Leaf(T),
    Empty,
}

impl<T: Copy> HuffNode<T> {
    fn build(codes: &[(T, &str)]) -> Self {
        let mut root = HuffNode::Empty;
        for &(value, bits) in codes {
            root.insert(value, bits);
        }
        root
    }

    fn insert(&mut self, value: T, bits: &str) {
        let mut node = self;
        for c in bits.bytes() {
            if matches!(node, HuffNode::Empty) {
                *node = HuffNode::Branch(Box::new(HuffNode::Empty), Box::new(HuffNode::Empty));
            }
            debug_assert!(matches!(node, HuffNode::Branch(..)), "conflicting code {bits}");
            node = match node {
                HuffNode::Branch(zero, one) => {
                    if c == b'1' {
                        one
                    } else {
                        zero
                    }
                }
                HuffNode::Leaf(_) | HuffNode::Empty => return,
            };
        }
        debug_assert!(matches!(node, HuffNode::Empty), "conflicting code {bits}");
        *node = HuffNode::Leaf(value);
    }

    fn decode(&self, reader: &mut BitReader<'_>) -> std::result::Result<T, LineError> {
        let mut node = self;
        loop {
            match node {
                HuffNode::Leaf(value) => return Ok(*value),
                HuffNode::Branch(zero, one) => {
                    let bit = reader.read_bit().ok_or(LineError::Eof)?;
                    node = if bit { one } else { zero };
                }
                HuffNode::Empty => return Err(LineError::Invalid),
            }
        }
    }
}

/// Two-dimensional coding modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pass,
    Horizontal,
    Vertical(i8),
    Uncompressed,
    Extension(u8),
}

const MODE_CODES: &[(Mode, &str)] = &[
    (Mode::Vertical(0), "1"),
    (Mode::Vertical(1), "011"),
    (Mode::Vertical(-1), "010"),
    (Mode::Horizontal, "001"),
    (Mode::Pass, "0001"),
    (Mode::Vertical(2), "000011"),
    (Mode::Vertical(-2), "000010"),
    (Mode::Vertical(3), "0000011"),
    (Mode::Vertical(-3), "0000010"),
    (Mode::Uncompressed, "0000001111"),
    (Mode::Extension(1), "0000001000"),
    (Mode::Extension(2), "0000001001"),
    (Mode::Extension(3), "0000001010"),
    (Mode::Extension(4), "0000001011"),
    (Mode::Extension(5), "0000001100"),
    (Mode::Extension(6), "0000001101"),
    (Mode::Extension(7), "0000001110"),
];

// Terminating codes (0-63), make-up codes (64-1728) and the shared
// extended make-up codes (1792-2560).
const WHITE_CODES: &[(u16, &str)] = &[
    (0, "00110101"), (1, "000111"), (2, "0111"), (3, "1000"), (4, "1011"), (5, "1100"),
    (6, "1110"), (7, "1111"), (8, "10011"), (9, "10100"), (10, "00111"), (11, "01000"),
    (12, "001000"), (13, "000011"), (14, "110100"), (15, "110101"), (16, "101010"),
    (17, "101011"), (18, "0100111"), (19, "0001100"), (20, "0001000"), (21, "0010111"),
    (22, "0000011"), (23, "0000100"), (24, "0101000"), (25, "0101011"), (26, "0010011"),
    (27, "0100100"), (28, "0011000"), (29, "00000010"), (30, "00000011"), (31, "00011010"),
    (32, "00011011"), (33, "00010010"), (34, "00010011"), (35, "00010100"), (36, "00010101"),
    (37, "00010110"), (38, "00010111"), (39, "00101000"), (40, "00101001"), (41, "00101010"),
    (42, "00101011"), (43, "00101100"), (44, "00101101"), (45, "00000100"), (46, "00000101"),
    (47, "00001010"), (48, "00001011"), (49, "01010010"), (50, "01010011"), (51, "01010100"),
    (52, "01010101"), (53, "00100100"), (54, "00100101"), (55, "01011000"), (56, "01011001"),
    (57, "01011010"), (58, "01011011"), (59, "01001010"), (60, "01001011"), (61, "00110010"),
    (62, "00110011"), (63, "00110100"), (64, "11011"), (128, "10010"), (192, "010111"),
    (256, "0110111"), (320, "00110110"), (384, "00110111"), (448, "01100100"),
    (512, "01100101"), (576, "01101000"), (640, "01100111"), (704, "011001100"),
    (768, "011001101"), (832, "011010010"), (896, "011010011"), (960, "011010100"),
    (1024, "011010101"), (1088, "011010110"), (1152, "011010111"), (1216, "011011000"),
    (1280, "011011001"), (1344, "011011010"), (1408, "011011011"), (1472, "010011000"),
    (1536, "010011001"), (1600, "010011010"), (1664, "011000"), (1728, "010011011"),
    (1792, "00000001000"), (1856, "00000001100"), (1920, "00000001101"), (1984, "000000010010"),
    (2048, "000000010011"), (2112, "000000010100"), (2176, "000000010101"),
    (2240, "000000010110"), (2304, "000000010111"), (2368, "000000011100"),
    (2432, "000000011101"), (2496, "000000011110"), (2560, "000000011111"),
];

const BLACK_CODES: &[(u16, &str)] = &[
    (0, "0000110111"), (1, "010"), (2, "11"), (3, "10"), (4, "011"), (5, "0011"), (6, "0010"),
    (7, "00011"), (8, "000101"), (9, "000100"), (10, "0000100"), (11, "0000101"),
    (12, "0000111"), (13, "00000100"), (14, "00000111"), (15, "000011000"), (16, "0000010111"),
    (17, "0000011000"), (18, "0000001000"), (19, "00001100111"), (20, "00001101000"),
    (21, "00001101100"), (22, "00000110111"), (23, "00000101000"), (24, "00000010111"),
    (25, "00000011000"), (26, "000011001010"), (27, "000011001011"), (28, "000011001100"),
    (29, "000011001101"), (30, "000001101000"), (31, "000001101001"), (32, "000001101010"),
    (33, "000001101011"), (34, "000011010010"), (35, "000011010011"), (36, "000011010100"),
    (37, "000011010101"), (38, "000011010110"), (39, "000011010111"), (40, "000001101100"),
    (41, "000001101101"), (42, "000011011010"), (43, "000011011011"), (44, "000001010100"),
    (45, "000001010101"), (46, "000001010110"), (47, "000001010111"), (48, "000001100100"),
    (49, "000001100101"), (50, "000001010010"), (51, "000001010011"), (52, "000000100100"),
    (53, "000000110111"), (54, "000000111000"), (55, "000000100111"), (56, "000000101000"),
    (57, "000001011000"), (58, "000001011001"), (59, "000000101011"), (60, "000000101100"),
    (61, "000001011010"), (62, "000001100110"), (63, "000001100111"), (64, "0000001111"),
    (128, "000011001000"), (192, "000011001001"), (256, "000001011011"), (320, "000000110011"),
    (384, "000000110100"), (448, "000000110101"), (512, "0000001101100"),
    (576, "0000001101101"), (640, "0000001001010"), (704, "0000001001011"),
    (768, "0000001001100"), (832, "0000001001101"), (896, "0000001110010"),
    (960, "0000001110011"), (1024, "0000001110100"), (1088, "0000001110101"),
    (1152, "0000001110110"), (1216, "0000001110111"), (1280, "0000001010010"),
    (1344, "0000001010011"), (1408, "0000001010100"), (1472, "0000001010101"),
    (1536, "0000001011010"), (1600, "0000001011011"), (1664, "0000001100100"),
    (1728, "0000001100101"), (1792, "00000001000"), (1856, "00000001100"),
    (1920, "00000001101"), (1984, "000000010010"), (2048, "000000010011"),
    (2112, "000000010100"), (2176, "000000010101"), (2240, "000000010110"),
    (2304, "000000010111"), (2368, "000000011100"), (2432, "000000011101"),
    (2496, "000000011110"), (2560, "000000011111"),
];

static MODE_TREE: Lazy<HuffNode<Mode>> = Lazy::new(|| HuffNode::build(MODE_CODES));
static WHITE_TREE: Lazy<HuffNode<u16>> = Lazy::new(|| HuffNode::build(WHITE_CODES));
static BLACK_TREE: Lazy<HuffNode<u16>> = Lazy::new(|| HuffNode::build(BLACK_CODES));

const WHITE: u8 = 0;
const BLACK: u8 = 1;

/// Minimum run of zero bits in an EOL code, before its final 1 bit.
const EOL_ZEROS: usize = 11;

/// End-of-facsimile-block prefix for Group 4: two EOL codes.
const EOFB: u32 = 0x001001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineError {
    /// A code that does not exist, or a run past the line end.
    Invalid,
    /// Input ended in the middle of a line.
    Eof,
}

type LineResult<T> = std::result::Result<T, LineError>;

/// MSB-first bit cursor over the encoded data.
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn len(&self) -> usize {
        self.data.len() * 8
    }

    fn bit_at(&self, pos: usize) -> bool {
        (self.data[pos / 8] >> (7 - pos % 8)) & 1 == 1
    }

    fn read_bit(&mut self) -> Option<bool> {
        if self.pos >= self.len() {
            return None;
        }
        let bit = self.bit_at(self.pos);
        self.pos += 1;
        Some(bit)
    }

    fn peek(&self, count: usize) -> Option<u32> {
        if self.pos + count > self.len() {
            return None;
        }
        Some((0..count).fold(0u32, |acc, i| (acc << 1) | u32::from(self.bit_at(self.pos + i))))
    }

    fn align(&mut self) {
        self.pos = self.pos.div_ceil(8) * 8;
    }

    fn zeros_ahead(&self) -> usize {
        (self.pos..self.len())
            .take_while(|&p| !self.bit_at(p))
            .count()
    }

    /// True when nothing but zero padding remains.
    fn is_exhausted(&self) -> bool {
        self.pos + self.zeros_ahead() >= self.len()
    }

    /// Consume consecutive EOL codes, including any fill bits before them.
    fn skip_eols(&mut self) -> usize {
        let mut count = 0;
        loop {
            let zeros = self.zeros_ahead();
            if zeros >= EOL_ZEROS && self.pos + zeros < self.len() {
                self.pos += zeros + 1;
                count += 1;
            } else {
                return count;
            }
        }
    }

    /// Move to the start of the next EOL code. Returns false at end of data.
    fn seek_eol(&mut self) -> bool {
        let mut zeros = 0;
        for p in self.pos..self.len() {
            if self.bit_at(p) {
                if zeros >= EOL_ZEROS {
                    self.pos = p - zeros;
                    return true;
                }
                zeros = 0;
            } else {
                zeros += 1;
            }
        }
        self.pos = self.len();
        false
    }
}

/// Widest or tallest image accepted, in pixels.
pub const MAX_DIMENSION: usize = 1 << 20;
/// Largest packed output accepted, in bytes.
pub const MAX_OUTPUT_BYTES: usize = 256 << 20;

/// Decoding parameters for `CCITTFaxDecode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcittParams {
    /// Negative: Group 4. Zero: Group 3 1D. Positive: Group 3 mixed 1D/2D.
    pub k: i64,
    pub columns: usize,
    pub rows: usize,
    pub black_is_1: bool,
    pub encoded_byte_align: bool,
    pub end_of_block: bool,
}

impl CcittParams {
    /// Read the filter parameters. The image's `Width` and `Height` are
    /// required; positive `Columns` and `Rows` override them.
    pub fn from_dicts(params: Option<&PDFDictionary>, stream_dict: &PDFDictionary) -> Result<Self> {
        let dimension = |param: &str, key: &str| -> Result<usize> {
            let declared = match stream_dict.get_int(key, &NoResolver) {
                Some(v) if v > 0 => v as usize,
                _ => {
                    return Err(PdfError::UnsupportedFormat(format!(
                        "CCITTFaxDecode needs a positive /{key}"
                    )));
                }
            };
            match param_int(params, param, 0) {
                v if v > 0 => Ok(v as usize),
                _ => Ok(declared),
            }
        };
        let flag = |key: &str, default: bool| {
            params
                .and_then(|p| p.get_bool(key, &NoResolver))
                .unwrap_or(default)
        };
        let parsed = Self {
            k: param_int(params, "K", 0),
            columns: dimension("Columns", "Width")?,
            rows: dimension("Rows", "Height")?,
            black_is_1: flag("BlackIs1", false),
            encoded_byte_align: flag("EncodedByteAlign", false),
            end_of_block: flag("EndOfBlock", true),
        };
        parsed.output_len()?;
        Ok(parsed)
    }

    /// Size of the packed bitmap, or an error when the geometry is out of range.
    fn output_len(&self) -> Result<usize> {
        if self.columns == 0 || self.rows == 0 {
            return Err(PdfError::decode("CCITTFaxDecode", "empty image"));
        }
        if self.columns > MAX_DIMENSION || self.rows > MAX_DIMENSION {
            return Err(PdfError::decode(
                "CCITTFaxDecode",
                format!("{}x{} exceeds {MAX_DIMENSION} pixels per side", self.columns, self.rows),
            ));
        }
        self.row_bytes()
            .checked_mul(self.rows)
            .filter(|&len| len <= MAX_OUTPUT_BYTES)
            .ok_or_else(|| PdfError::decode("CCITTFaxDecode", "bitmap too large"))
    }

    fn row_bytes(&self) -> usize {
        self.columns.div_ceil(8)
    }
}

/// Rows decoded by one pass over the input.
struct Attempt {
    lines: Vec<Vec<u8>>,
    fails: usize,
}

/// Decode a `CCITTFaxDecode` stream into packed 1-bit rows.
pub fn ccittfaxdecode(
    data: &[u8],
    params: Option<&PDFDictionary>,
    stream_dict: &PDFDictionary,
) -> Result<Vec<u8>> {
    let params = CcittParams::from_dicts(params, stream_dict)?;
    decode_with_params(data, &params)
}

/// Decode with parameters already read from the dictionaries.
pub fn decode_with_params(data: &[u8], params: &CcittParams) -> Result<Vec<u8>> {
    let out_len = params.output_len()?;
    let lines = if params.k < 0 {
        decode_g4(data, params)?
    } else {
        let attempt = decode_t4(data, params);
        if attempt.fails == 0 {
            attempt.lines
        } else {
            let retry = decode_rle(data, params);
            debug!(
                t4_fails = attempt.fails,
                rle_fails = retry.fails,
                "CCITT stream retried as byte-aligned MH rows"
            );
            if attempt.lines.is_empty() && retry.lines.is_empty() {
                return Err(PdfError::decode("CCITTFaxDecode", "no decodable rows"));
            }
            let score = |a: &Attempt| (a.fails, std::cmp::Reverse(a.lines.len()));
            if score(&retry) < score(&attempt) {
                retry.lines
            } else {
                attempt.lines
            }
        }
    };
    Ok(pack_lines(&lines, params, out_len))
}

fn pack_lines(lines: &[Vec<u8>], params: &CcittParams, out_len: usize) -> Vec<u8> {
    let row_bytes = params.row_bytes();
    let mut out = vec![0u8; out_len];
    for (row, line) in out.chunks_mut(row_bytes).zip(lines) {
        for (x, _) in line.iter().enumerate().filter(|&(_, &c)| c == BLACK) {
            row[x / 8] |= 0x80 >> (x % 8);
        }
    }
    if !params.black_is_1 {
        for byte in &mut out {
            *byte = !*byte;
        }
    }
    out
}

/// Group 3: optional EOLs, optional per-line 1D/2D tag, resync on errors.
fn decode_t4(data: &[u8], params: &CcittParams) -> Attempt {
    let width = params.columns;
    let mut reader = BitReader::new(data);
    let mut reference = vec![WHITE; width];
    let mut attempt = Attempt { lines: Vec::new(), fails: 0 };

    while attempt.lines.len() < params.rows {
        let mut eols = reader.skip_eols();
        if eols == 0 && params.encoded_byte_align {
            reader.align();
            eols = reader.skip_eols();
        }
        if eols >= 2 && params.end_of_block {
            break;
        }
        if reader.is_exhausted() {
            break;
        }
        let one_dimensional = if params.k > 0 {
            match reader.read_bit() {
                Some(tag) => tag,
                None => break,
            }
        } else {
            true
        };
        let line = if one_dimensional {
            decode_1d_line(&mut reader, width)
        } else {
            decode_2d_line(&mut reader, &reference)
        };
        match line {
            Ok(line) => {
                reference.clone_from(&line);
                attempt.lines.push(line);
            }
            Err(err) => {
                attempt.fails += 1;
                if err == LineError::Eof || !reader.seek_eol() {
                    break;
                }
            }
        }
    }
    attempt
}

/// Group 3 without EOLs: every row is MH coded and starts on a byte.
fn decode_rle(data: &[u8], params: &CcittParams) -> Attempt {
    let mut reader = BitReader::new(data);
    let mut attempt = Attempt { lines: Vec::new(), fails: 0 };

    while attempt.lines.len() < params.rows && !reader.is_exhausted() {
        match decode_1d_line(&mut reader, params.columns) {
            Ok(line) => attempt.lines.push(line),
            Err(LineError::Invalid) => attempt.fails += 1,
            Err(LineError::Eof) => {
                attempt.fails += 1;
                break;
            }
        }
        reader.align();
    }
    attempt
}

/// Group 4: every line is 2D coded against the previous one.
fn decode_g4(data: &[u8], params: &CcittParams) -> Result<Vec<Vec<u8>>> {
    let mut reader = BitReader::new(data);
    let mut reference = vec![WHITE; params.columns];
    let mut lines = Vec::with_capacity(params.rows);

    while lines.len() < params.rows {
        if params.encoded_byte_align {
            reader.align();
        }
        if params.end_of_block && reader.peek(24) == Some(EOFB) {
            break;
        }
        if reader.is_exhausted() {
            break;
        }
        let line = decode_2d_line(&mut reader, &reference).map_err(|err| {
            PdfError::decode(
                "CCITTFaxDecode",
                format!("{err:?} data in Group 4 row {} at bit {}", lines.len(), reader.pos),
            )
        })?;
        reference.clone_from(&line);
        lines.push(line);
    }
    Ok(lines)
}

fn read_run(reader: &mut BitReader<'_>, color: u8) -> LineResult<usize> {
    let tree = if color == WHITE { &*WHITE_TREE } else { &*BLACK_TREE };
    let mut total = 0usize;
    loop {
        let run = tree.decode(reader)?;
        total += usize::from(run);
        if run < 64 {
            return Ok(total);
        }
    }
}

fn fill(line: &mut [u8], from: usize, to: usize, color: u8) {
    let to = to.min(line.len());
    if from < to {
        line[from..to].fill(color);
    }
}

fn decode_1d_line(reader: &mut BitReader<'_>, width: usize) -> LineResult<Vec<u8>> {
    let mut line = vec![WHITE; width];
    let mut a0 = 0;
    let mut color = WHITE;
    while a0 < width {
        let run = read_run(reader, color)?;
        if a0 + run > width {
            return Err(LineError::Invalid);
        }
        fill(&mut line, a0, a0 + run, color);
        a0 += run;
        color ^= 1;
    }
    Ok(line)
}

/// Changing elements on the reference line relative to `a0`: `b1` is the
/// first one right of `a0` with the color opposite to `color`, `b2` the next
/// one after it. Both default to the line width.
fn find_b1_b2(reference: &[u8], a0: isize, color: u8) -> (usize, usize) {
    let width = reference.len();
    let changes_at = |x: usize| {
        let before = if x == 0 { WHITE } else { reference[x - 1] };
        reference[x] != before
    };
    let start = (a0 + 1).max(0) as usize;
    let b1 = (start..width)
        .find(|&x| changes_at(x) && reference[x] != color)
        .unwrap_or(width);
    let b2 = (b1 + 1..width).find(|&x| changes_at(x)).unwrap_or(width);
    (b1, b2)
}

fn decode_2d_line(reader: &mut BitReader<'_>, reference: &[u8]) -> LineResult<Vec<u8>> {
    let width = reference.len();
    let mut line = vec![WHITE; width];
    let mut a0: isize = -1;
    let mut color = WHITE;

    while a0 < width as isize {
        let start = a0.max(0) as usize;
        match MODE_TREE.decode(reader)? {
            Mode::Pass => {
                let (_, b2) = find_b1_b2(reference, a0, color);
                fill(&mut line, start, b2, color);
                a0 = b2 as isize;
            }
            Mode::Horizontal => {
                let first = read_run(reader, color)?;
                let second = read_run(reader, color ^ 1)?;
                let end = start + first + second;
                if end > width {
                    return Err(LineError::Invalid);
                }
                fill(&mut line, start, start + first, color);
                fill(&mut line, start + first, end, color ^ 1);
                a0 = end as isize;
            }
            Mode::Vertical(delta) => {
                let (b1, _) = find_b1_b2(reference, a0, color);
                let a1 = b1 as isize + isize::from(delta);
                if a1 < start as isize || a1 > width as isize {
                    return Err(LineError::Invalid);
                }
                fill(&mut line, start, a1 as usize, color);
                a0 = a1;
                color ^= 1;
            }
            Mode::Uncompressed | Mode::Extension(_) => return Err(LineError::Invalid),
        }
    }
    Ok(line)
}
