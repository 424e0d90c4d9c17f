#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vintage_x86::{DecodeResult, Decoder, Instruction, Model};

const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Parser, Debug)]
#[command(
    name = "vintage-dasm",
    about = "Disassemble raw 16-bit x86 machine code for the 8086 through the 80386."
)]
struct Args {
    /// Binary file holding the machine code
    input: PathBuf,

    /// CPU model whose instruction set applies (8086, 80186, 80286, 80386)
    #[arg(long, default_value_t = Model::I8086)]
    model: Model,

    /// Bytes read from the file and handed to the decoder per call
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Address of the first byte (decimal, or hex with a 0x prefix)
    #[arg(long, value_name = "ADDR", default_value = "0", value_parser = parse_address)]
    origin: u64,

    /// Print one JSON object per instruction instead of text
    #[arg(long, action = clap::ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Record {
    address: u64,
    bytes: String,
    length: usize,
    mnemonic: String,
    text: String,
    undefined: bool,
}

fn parse_address(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }

    let mut input =
        File::open(&args.input).with_context(|| format!("open input {}", args.input.display()))?;
    debug!(input = %args.input.display(), model = %args.model, chunk_size = args.chunk_size, "disassembling");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut listing = Listing {
        decoder: Decoder::new(args.model),
        address: args.origin,
        pending: Vec::new(),
        shortfall: 0,
        json: args.json,
    };

    let mut buf = vec![0u8; args.chunk_size];
    loop {
        let n = input
            .read(&mut buf)
            .with_context(|| format!("read {}", args.input.display()))?;
        if n == 0 {
            break;
        }
        listing.feed(&buf[..n], &mut out)?;
    }
    out.flush().context("flush output")?;

    if !listing.pending.is_empty() {
        eprintln!(
            "(incomplete: {} more bytes needed)",
            listing.shortfall.max(1)
        );
    }
    Ok(())
}

struct Listing {
    decoder: Decoder,
    address: u64,
    /// Bytes of the instruction still being decoded.
    pending: Vec<u8>,
    shortfall: usize,
    json: bool,
}

impl Listing {
    fn feed(&mut self, mut chunk: &[u8], out: &mut impl Write) -> anyhow::Result<()> {
        while !chunk.is_empty() {
            match self.decoder.decode(chunk) {
                DecodeResult::Complete {
                    length,
                    instruction,
                } => {
                    let used = length - self.pending.len();
                    self.pending.extend_from_slice(&chunk[..used]);
                    chunk = &chunk[used..];
                    self.emit(&instruction, out)?;
                    self.address += length as u64;
                    self.pending.clear();
                    self.shortfall = 0;
                }
                DecodeResult::NeedMore { at_least } => {
                    self.pending.extend_from_slice(chunk);
                    self.shortfall = at_least;
                    chunk = &[];
                }
            }
        }
        Ok(())
    }

    fn emit(&self, instruction: &Instruction, out: &mut impl Write) -> anyhow::Result<()> {
        let bytes: String = self.pending.iter().map(|b| format!("{b:02X}")).collect();
        if self.json {
            let record = Record {
                address: self.address,
                bytes,
                length: self.pending.len(),
                mnemonic: instruction.mnemonic().into_owned(),
                text: instruction.to_string(),
                undefined: instruction.is_undefined(),
            };
            serde_json::to_writer(&mut *out, &record).context("serialize record")?;
            writeln!(out).context("write output")?;
        } else {
            writeln!(out, "{:05X}  {bytes:<14}  {instruction}", self.address)
                .context("write output")?;
        }
        Ok(())
    }
}
