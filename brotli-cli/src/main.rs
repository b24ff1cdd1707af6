//! Command-line driver for `brotli-core`: reads a compressed stream from a file or
//! stdin and writes the decompressed bytes to a file or stdout.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(about = "Decompress an LZ77+Huffman compressed stream")]
struct Args {
    /// Path to the compressed input; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Path to write decompressed output to; writes stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut input: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(File::open(path).with_context(|| format!("opening {}", path.display()))?),
        None => Box::new(io::stdin()),
    };

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout()),
    };

    let mut compressed = Vec::new();
    input.read_to_end(&mut compressed).context("reading compressed input")?;

    brotli_core::decompress(compressed.as_slice(), &mut output).context("decompressing stream")?;
    output.flush().context("flushing output")?;
    Ok(())
}
