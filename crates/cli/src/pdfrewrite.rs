//! pdfrewrite - Rewrite a PDF file with every stream Flate-compressed
//!
//! Objects keep their numbers. The trailer's /Root, /Info and /ID carry
//! over; a fresh cross-reference table replaces the old one.

mod logging;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use vellum_core::{CompressionParams, PDFDictionary, PdfReader, PdfWriter, ReaderParams, WriterParams};

/// Rewrite a PDF, recompressing its streams.
#[derive(Parser, Debug)]
#[command(name = "pdfrewrite")]
#[command(author, version, about = "Rewrite a PDF with compressed streams", long_about = None)]
struct Args {
    /// Input PDF
    input: PathBuf,

    /// Output PDF
    output: PathBuf,

    /// zlib compression level, 0-9
    #[arg(short = 'l', long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,

    /// Copy stream payloads unchanged
    #[arg(long = "no-compress", action = ArgAction::SetTrue)]
    no_compress: bool,

    /// Report each rewritten object on stderr
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Show the library's debug diagnostics on stderr
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.debug);

    let mut reader = PdfReader::from_mmap(&args.input, &ReaderParams::default())
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    if reader.trailer().contains_key("Encrypt") {
        bail!("{} is encrypted; decryption is not supported", args.input.display());
    }

    let compression = if args.no_compress {
        CompressionParams::disabled()
    } else {
        CompressionParams::with_level(args.level)
    };
    let params = WriterParams {
        compression,
        ..WriterParams::default()
    };

    let file = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    let mut writer = PdfWriter::new(BufWriter::new(file), params)?;

    let references: Vec<_> = reader.object_numbers().collect();
    let mut compressed = 0usize;
    for reference in references {
        let mut obj = match reader.get_and_release(reference) {
            Ok(obj) => obj,
            Err(err) => {
                eprintln!("Warning: skipping object {reference}: {err}");
                continue;
            }
        };
        if let Some(stream) = obj.as_stream_mut()
            && stream.flate_compress(reader.ids(), &writer.params().compression)?
        {
            compressed += 1;
        }
        writer.add_object_at(&obj, reference)?;
        if args.verbose {
            eprintln!("{reference}: {}", obj.type_name());
        }
    }

    let mut trailer = PDFDictionary::new();
    for key in ["Root", "Info", "ID"] {
        if let Some(value) = reader.trailer().get(key) {
            trailer.put(key, value.duplicate(reader.ids())?);
        }
    }
    writer.close(reader.ids(), trailer)?;

    if args.verbose {
        eprintln!("{compressed} streams compressed");
    }
    Ok(())
}
