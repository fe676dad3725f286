use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::cli::OutputFormat;

/// Writes the random bytes to stdout or a file in the specified format.
pub fn write_output(
    bytes: &[u8],
    format: &OutputFormat,
    output_file: Option<&Path>,
) -> io::Result<()> {
    match output_file {
        Some(path) => {
            let f = File::create(path)?;
            let mut out = BufWriter::new(f);
            format_output(bytes, format, &mut out)?;
            out.flush()
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            format_output(bytes, format, &mut out)?;
            out.flush()
        }
    }
}

fn format_output(bytes: &[u8], format: &OutputFormat, out: &mut dyn Write) -> io::Result<()> {
    match format {
        OutputFormat::Hex => {
            for b in bytes {
                write!(out, "{:02x}", b)?;
            }
            writeln!(out)?;
        }
        OutputFormat::HexUpper => {
            for b in bytes {
                write!(out, "{:02X}", b)?;
            }
            writeln!(out)?;
        }
        OutputFormat::Raw => out.write_all(bytes)?,
        OutputFormat::Base64 => writeln!(out, "{}", STANDARD.encode(bytes))?,
        OutputFormat::Base64url => writeln!(out, "{}", URL_SAFE_NO_PAD.encode(bytes))?,
    }
    Ok(())
}
