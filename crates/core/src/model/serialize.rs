//! Serialization of values to PDF syntax.
//!
//! The output uses the minimal token grammar: a separating space is written
//! only before values that do not start with a delimiter.

use crate::error::Result;
use crate::model::array::PDFArray;
use crate::model::dictionary::PDFDictionary;
use crate::model::objects::{PDFObject, PDFValue};
use crate::model::string::PDFString;
use crate::utils::name_to_bytes;
use crate::writer::WriterContext;
use std::borrow::Cow;
use std::io::Write;

impl PDFObject {
    /// Write this value in PDF syntax.
    ///
    /// With a context carrying encryption, strings and stream payloads are
    /// encrypted for the context's current object.
    pub fn to_pdf(&self, ctx: Option<&WriterContext<'_>>, out: &mut dyn Write) -> Result<()> {
        write_value(self.value(), ctx, out)
    }

    /// Serialize without a writer context.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.to_pdf(None, &mut out)?;
        Ok(out)
    }
}

fn write_value(value: &PDFValue, ctx: Option<&WriterContext<'_>>, out: &mut dyn Write) -> Result<()> {
    match value {
        PDFValue::Null => out.write_all(b"null")?,
        PDFValue::Bool(true) => out.write_all(b"true")?,
        PDFValue::Bool(false) => out.write_all(b"false")?,
        PDFValue::Number(n) => out.write_all(format_number(*n).as_bytes())?,
        PDFValue::Name(name) => write_name(name, out)?,
        PDFValue::String(s) => write_string(s, ctx, out)?,
        PDFValue::Array(array) => write_array(array, ctx, out)?,
        PDFValue::Dict(dict) => write_dictionary(dict, ctx, out, None)?,
        PDFValue::Stream(stream) => stream.write_pdf(ctx, out)?,
        PDFValue::Ref(r) => write!(out, "{} {} R", r.objid, r.genno)?,
    }
    Ok(())
}

/// Values that begin with a delimiter need no separating space.
const fn starts_with_delimiter(value: &PDFValue) -> bool {
    matches!(
        value,
        PDFValue::Name(_)
            | PDFValue::String(_)
            | PDFValue::Array(_)
            | PDFValue::Dict(_)
            | PDFValue::Stream(_)
    )
}

fn write_array(array: &PDFArray, ctx: Option<&WriterContext<'_>>, out: &mut dyn Write) -> Result<()> {
    out.write_all(b"[")?;
    for (i, item) in array.iter().enumerate() {
        if i > 0 && !starts_with_delimiter(item.value()) {
            out.write_all(b" ")?;
        }
        write_value(item.value(), ctx, out)?;
    }
    out.write_all(b"]")?;
    Ok(())
}

/// Write `<<…>>`. With `length`, the `/Length` entry is written as that
/// number whatever the dictionary holds.
pub(crate) fn write_dictionary(
    dict: &PDFDictionary,
    ctx: Option<&WriterContext<'_>>,
    out: &mut dyn Write,
    length: Option<u64>,
) -> Result<()> {
    out.write_all(b"<<")?;
    for (key, value) in dict.iter() {
        write_name(key, out)?;
        if key == "Length"
            && let Some(length) = length
        {
            write!(out, " {length}")?;
            continue;
        }
        if !starts_with_delimiter(value.value()) {
            out.write_all(b" ")?;
        }
        write_value(value.value(), ctx, out)?;
    }
    if let Some(length) = length
        && !dict.contains_key("Length")
    {
        write!(out, "/Length {length}")?;
    }
    out.write_all(b">>")?;
    Ok(())
}

/// Shortest decimal that reads back as `n`, never in exponent form.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        tracing::warn!(value = %n, "non-finite number written as 0");
        return "0".to_string();
    }
    if n == 0.0 {
        // also folds -0
        return "0".to_string();
    }
    // f64 Display is shortest-roundtrip and never uses an exponent.
    format!("{n}")
}

const fn is_name_regular(b: u8) -> bool {
    matches!(b, 0x21..=0x7E)
        && !matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        )
}

/// Write `/Name`, escaping irregular bytes as `#xx`.
pub fn write_name(name: &str, out: &mut dyn Write) -> Result<()> {
    out.write_all(b"/")?;
    for &b in name_to_bytes(name).iter() {
        if is_name_regular(b) {
            out.write_all(&[b])?;
        } else {
            write!(out, "#{b:02X}")?;
        }
    }
    Ok(())
}

fn write_string(s: &PDFString, ctx: Option<&WriterContext<'_>>, out: &mut dyn Write) -> Result<()> {
    let bytes: Cow<'_, [u8]> = match ctx.map(WriterContext::crypto).transpose()?.flatten() {
        Some((enc, current)) => Cow::Owned(enc.encrypt(current, s.as_bytes())?),
        None => Cow::Borrowed(s.as_bytes()),
    };
    if s.is_hex() {
        write_hex_string(&bytes, out)
    } else {
        write_literal_string(&bytes, out)
    }
}

pub fn write_hex_string(bytes: &[u8], out: &mut dyn Write) -> Result<()> {
    out.write_all(b"<")?;
    for b in bytes {
        write!(out, "{b:02X}")?;
    }
    out.write_all(b">")?;
    Ok(())
}

/// Positions of parentheses that have no partner.
fn unbalanced_parens(bytes: &[u8]) -> Vec<bool> {
    let mut unbalanced = vec![false; bytes.len()];
    let mut open = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => open.push(i),
            b')' => {
                if open.pop().is_none() {
                    unbalanced[i] = true;
                }
            }
            _ => {}
        }
    }
    for i in open {
        unbalanced[i] = true;
    }
    unbalanced
}

/// Write `(…)` escaping backslash, unbalanced parens and control bytes.
pub fn write_literal_string(bytes: &[u8], out: &mut dyn Write) -> Result<()> {
    let unbalanced = unbalanced_parens(bytes);
    let mut buf = Vec::with_capacity(bytes.len() + 2);
    buf.push(b'(');
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            0x08 => buf.extend_from_slice(b"\\b"),
            0x0C => buf.extend_from_slice(b"\\f"),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'(' | b')' if unbalanced[i] => {
                buf.push(b'\\');
                buf.push(b);
            }
            0x00..=0x1F | 0x7F => buf.extend_from_slice(format!("\\{b:03o}").as_bytes()),
            _ => buf.push(b),
        }
    }
    buf.push(b')');
    out.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(bytes: &[u8]) -> String {
        let mut out = Vec::new();
        write_literal_string(bytes, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.5), "-3.5");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e-7), "0.0000001");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_balanced_parens_left_alone() {
        assert_eq!(literal(b"a(b)c"), "(a(b)c)");
    }

    #[test]
    fn test_unbalanced_parens_escaped() {
        assert_eq!(literal(b"a)b(c"), "(a\\)b\\(c)");
        assert_eq!(literal(b"(("), "(\\(\\()");
    }

    #[test]
    fn test_control_bytes() {
        assert_eq!(literal(b"\x01\n\\"), "(\\001\\n\\\\)");
    }

    #[test]
    fn test_name_escaping() {
        let mut out = Vec::new();
        write_name("A B#(", &mut out).unwrap();
        assert_eq!(out, b"/A#20B#23#28");
    }
}
