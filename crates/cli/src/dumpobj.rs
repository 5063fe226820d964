//! dumpobj - Dump the objects of a PDF file as XML or JSON
//!
//! Reads the cross-reference table, then prints the trailer, selected
//! objects or every object. Stream payloads can be written raw, decoded,
//! or as escaped text.

mod logging;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use vellum_core::utils::name_to_bytes;
use vellum_core::{PDFDictionary, PDFObjRef, PDFObject, PDFValue, PdfReader, ReaderParams};

/// Escape special characters for XML output.
fn escape(s: &[u8]) -> String {
    let mut result = String::with_capacity(s.len());
    for &byte in s {
        match byte {
            b'&' => result.push_str("&amp;"),
            b'<' => result.push_str("&lt;"),
            b'>' => result.push_str("&gt;"),
            b'"' => result.push_str("&quot;"),
            b'\'' => result.push_str("&#39;"),
            b'\\' => result.push_str("&#92;"),
            0..=31 | 127..=255 => result.push_str(&format!("&#{byte};")),
            _ => result.push(byte as char),
        }
    }
    result
}

/// How stream payloads are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamCodec {
    None,
    Raw,
    Binary,
    Text,
}

fn decoded(reader: &PdfReader, obj: &PDFObject) -> Vec<u8> {
    let Some(stream) = obj.as_stream() else {
        return Vec::new();
    };
    match reader.decode_stream(stream) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("Warning: cannot decode stream: {err}");
            stream.raw_data().unwrap_or_default().to_vec()
        }
    }
}

fn dump_dict_xml<W: Write>(
    out: &mut W,
    reader: &PdfReader,
    dict: &PDFDictionary,
    codec: StreamCodec,
) -> Result<()> {
    writeln!(out, r#"<dict size="{}">"#, dict.len())?;
    for (k, v) in dict.iter() {
        writeln!(out, "<key>{}</key>", escape(&name_to_bytes(k)))?;
        write!(out, "<value>")?;
        dumpxml(out, reader, v, codec)?;
        writeln!(out, "</value>")?;
    }
    write!(out, "</dict>")?;
    Ok(())
}

/// Dump a PDF object as XML.
fn dumpxml<W: Write>(
    out: &mut W,
    reader: &PdfReader,
    obj: &PDFObject,
    codec: StreamCodec,
) -> Result<()> {
    match obj.value() {
        PDFValue::Null => write!(out, "<null />")?,
        PDFValue::Bool(b) => write!(out, "<boolean>{b}</boolean>")?,
        PDFValue::Number(n) => write!(out, "<number>{n}</number>")?,
        PDFValue::String(s) => write!(
            out,
            r#"<string size="{}">{}</string>"#,
            s.len(),
            escape(s.as_bytes())
        )?,
        PDFValue::Name(name) => write!(out, "<literal>{}</literal>", escape(&name_to_bytes(name)))?,
        PDFValue::Array(arr) => {
            writeln!(out, r#"<list size="{}">"#, arr.len())?;
            for item in arr {
                dumpxml(out, reader, item, codec)?;
                writeln!(out)?;
            }
            write!(out, "</list>")?;
        }
        PDFValue::Dict(dict) => dump_dict_xml(out, reader, dict, codec)?,
        PDFValue::Stream(stream) => match codec {
            StreamCodec::Raw => out.write_all(stream.raw_data().unwrap_or_default())?,
            StreamCodec::Binary => out.write_all(&decoded(reader, obj))?,
            StreamCodec::Text | StreamCodec::None => {
                writeln!(out, "<stream>")?;
                writeln!(out, "<props>")?;
                dump_dict_xml(out, reader, stream.dict(), codec)?;
                writeln!(out)?;
                writeln!(out, "</props>")?;
                if codec == StreamCodec::Text {
                    let data = decoded(reader, obj);
                    writeln!(out, r#"<data size="{}">{}</data>"#, data.len(), escape(&data))?;
                }
                write!(out, "</stream>")?;
            }
        },
        PDFValue::Ref(objref) => write!(out, r#"<ref id="{}" />"#, objref.objid)?,
    }
    Ok(())
}

fn dict_json(reader: &PdfReader, dict: &PDFDictionary, codec: StreamCodec) -> Value {
    let map: Map<String, Value> = dict
        .iter()
        .map(|(k, v)| (k.to_string(), to_json(reader, v, codec)))
        .collect();
    Value::Object(map)
}

/// JSON rendering; names, strings and references are tagged objects so
/// they stay distinguishable.
fn to_json(reader: &PdfReader, obj: &PDFObject, codec: StreamCodec) -> Value {
    match obj.value() {
        PDFValue::Null => Value::Null,
        PDFValue::Bool(b) => Value::Bool(*b),
        PDFValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        PDFValue::Name(name) => json!({ "name": name }),
        PDFValue::String(s) => json!({ "string": s.to_text() }),
        PDFValue::Array(arr) => Value::Array(arr.iter().map(|v| to_json(reader, v, codec)).collect()),
        PDFValue::Dict(dict) => dict_json(reader, dict, codec),
        PDFValue::Stream(stream) => {
            let mut entry = Map::new();
            entry.insert("dict".into(), dict_json(reader, stream.dict(), codec));
            entry.insert(
                "length".into(),
                json!(stream.raw_data().map_or(0, <[u8]>::len)),
            );
            if codec == StreamCodec::Text {
                let data = decoded(reader, obj);
                entry.insert("data".into(), json!(String::from_utf8_lossy(&data)));
            }
            json!({ "stream": entry })
        }
        PDFValue::Ref(r) => json!({ "ref": [r.objid, r.genno] }),
    }
}

#[derive(Serialize)]
struct ObjectRecord {
    id: u32,
    generation: u16,
    value: Value,
}

#[derive(Serialize)]
struct Dump {
    objects: Vec<ObjectRecord>,
    trailer: Value,
}

/// Objects to print, in order; unknown numbers are reported and skipped.
fn selected(reader: &PdfReader, objids: &[u32], all: bool) -> Vec<PDFObjRef> {
    if all {
        return reader.object_numbers().collect();
    }
    objids
        .iter()
        .filter_map(|&objid| match reader.xref_entry(objid) {
            Some(entry) => Some(PDFObjRef::new(objid, entry.genno)),
            None => {
                eprintln!("not found: object {objid}");
                None
            }
        })
        .collect()
}

fn dump_xml<W: Write>(out: &mut W, reader: &mut PdfReader, args: &Args, codec: StreamCodec) -> Result<()> {
    if args.all {
        write!(out, "<pdf>")?;
    }
    for reference in selected(reader, &args.objects, args.all) {
        let obj = match reader.get_and_release(reference) {
            Ok(obj) => obj,
            Err(err) => {
                eprintln!("not found: object {} - {err}", reference.objid);
                continue;
            }
        };
        if args.all {
            writeln!(out, r#"<object id="{}">"#, reference.objid)?;
        }
        dumpxml(out, reader, &obj, codec)?;
        if args.all {
            writeln!(out)?;
            writeln!(out, "</object>")?;
        }
        writeln!(out)?;
    }
    if args.all || args.objects.is_empty() {
        writeln!(out, "<trailer>")?;
        dump_dict_xml(out, reader, reader.trailer(), StreamCodec::None)?;
        writeln!(out)?;
        writeln!(out, "</trailer>")?;
    }
    if args.all {
        write!(out, "</pdf>")?;
    }
    if codec != StreamCodec::Raw && codec != StreamCodec::Binary {
        writeln!(out)?;
    }
    Ok(())
}

fn dump_json<W: Write>(out: &mut W, reader: &mut PdfReader, args: &Args, codec: StreamCodec) -> Result<()> {
    let references = selected(reader, &args.objects, args.all);
    let mut objects = Vec::with_capacity(references.len());
    for reference in references {
        match reader.get_and_release(reference) {
            Ok(obj) => objects.push(ObjectRecord {
                id: reference.objid,
                generation: reference.genno,
                value: to_json(reader, &obj, codec),
            }),
            Err(err) => eprintln!("not found: object {} - {err}", reference.objid),
        }
    }
    let dump = Dump {
        objects,
        trailer: dict_json(reader, reader.trailer(), StreamCodec::None),
    };
    serde_json::to_writer_pretty(&mut *out, &dump)?;
    writeln!(out)?;
    Ok(())
}

/// A command line tool for dumping PDF objects.
#[derive(Parser, Debug)]
#[command(name = "dumpobj")]
#[command(author, version, about = "Dump PDF objects as XML or JSON", long_about = None)]
#[command(group(
    ArgGroup::new("stream_codec")
        .args(["raw_stream", "binary_stream", "text_stream"])
))]
struct Args {
    /// One or more paths to PDF files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Show the library's debug diagnostics on stderr
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Comma-separated list of object numbers to dump
    #[arg(short = 'i', long = "objects", value_delimiter = ',')]
    objects: Vec<u32>,

    /// Dump every object in the cross-reference table
    #[arg(short = 'a', long = "all", action = ArgAction::SetTrue)]
    all: bool,

    /// Maximum number of parsed objects kept in memory
    #[arg(long = "cache-capacity")]
    cache_capacity: Option<usize>,

    /// Fail instead of scanning when the cross-reference table is damaged
    #[arg(long = "strict", action = ArgAction::SetTrue)]
    strict: bool,

    /// Write JSON instead of XML
    #[arg(long = "json", action = ArgAction::SetTrue)]
    json: bool,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Write stream objects without decoding (raw)
    #[arg(short = 'r', long = "raw-stream", action = ArgAction::SetTrue)]
    raw_stream: bool,

    /// Write decoded stream objects as binary
    #[arg(short = 'b', long = "binary-stream", action = ArgAction::SetTrue)]
    binary_stream: bool,

    /// Write decoded stream objects as text
    #[arg(short = 't', long = "text-stream", action = ArgAction::SetTrue)]
    text_stream: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.debug);

    let codec = if args.raw_stream {
        StreamCodec::Raw
    } else if args.binary_stream {
        StreamCodec::Binary
    } else if args.text_stream {
        StreamCodec::Text
    } else {
        StreamCodec::None
    };

    let params = ReaderParams {
        cache_capacity: args.cache_capacity,
        allow_xref_fallback: !args.strict,
    };

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("cannot create {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    for path in &args.files {
        let mut reader = PdfReader::from_mmap(path, &params)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if reader.is_fallback() {
            eprintln!(
                "Warning: {} has no valid xref; objects were located by scanning",
                path.display()
            );
        }
        if args.json {
            dump_json(&mut output, &mut reader, &args, codec)?;
        } else {
            dump_xml(&mut output, &mut reader, &args, codec)?;
        }
    }

    output.flush()?;
    Ok(())
}
