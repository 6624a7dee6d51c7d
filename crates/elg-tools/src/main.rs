//! Offline diagnostic tooling for the ELG wire format: decode a captured
//! request frame, or encode a synthetic response frame, without standing up
//! a gateway or an upstream connection.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elg_common::frame;
use elg_common::message::{CryptoInfo, CRYPTO_INFO_LEN};

#[derive(Parser)]
#[command(name = "elg-tools")]
#[command(about = "Decode and encode ELG gateway wire frames offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a captured request frame (header-length byte + header +
    /// crypto info + encrypted body) and print its contents.
    DecodeRq {
        /// Path to a file containing one raw request frame.
        path: PathBuf,
        /// Partner AES key, hex-encoded (32 hex chars).
        #[arg(short, long)]
        key: String,
    },
    /// Build a synthetic response frame for a given partner key and
    /// location, and print it as hex (or write it to a file).
    EncodeRs {
        /// Partner AES key, hex-encoded (32 hex chars).
        #[arg(short, long)]
        key: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
        #[arg(long)]
        hpe: f64,
        /// Write the raw frame bytes here instead of printing hex.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn parse_key(key: &str) -> Result<[u8; 16]> {
    let bytes = hex::decode(key).context("key is not valid hex")?;
    let bytes: [u8; 16] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| anyhow::anyhow!("key must decode to 16 bytes, got {}", v.len()))?;
    Ok(bytes)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::DecodeRq { path, key } => decode_rq(&path, &key)?,
        Commands::EncodeRs {
            key,
            lat,
            lon,
            hpe,
            out,
        } => encode_rs(&key, lat, lon, hpe, out)?,
    }

    Ok(())
}

fn decode_rq(path: &PathBuf, key: &str) -> Result<()> {
    let key = parse_key(key)?;
    let buf = fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    if buf.is_empty() {
        anyhow::bail!("empty capture file");
    }

    let hdr_len = buf[0] as usize;
    if buf.len() < 1 + hdr_len {
        anyhow::bail!("capture file shorter than its declared header length");
    }

    let header = frame::decode_rq_header(&buf[1..1 + hdr_len])?;
    println!("header: {header:#?}");

    let body_buf = &buf[1 + hdr_len..];
    if body_buf.len() > CRYPTO_INFO_LEN {
        let crypto_info = CryptoInfo::from_bytes(&body_buf[..CRYPTO_INFO_LEN])?;
        println!("crypto_info: {crypto_info:#?}");
    }

    let rq = frame::decode_rq_body(body_buf, &key)?;
    println!("body: {rq:#?}");

    Ok(())
}

fn encode_rs(key: &str, lat: f64, lon: f64, hpe: f64, out: Option<PathBuf>) -> Result<()> {
    let key = parse_key(key)?;
    let (header_len_byte, body) = frame::encode_rs(&key, lat, lon, hpe)?;

    let mut wire = Vec::with_capacity(1 + body.len());
    wire.push(header_len_byte);
    wire.extend_from_slice(&body);

    match out {
        Some(path) => {
            fs::write(&path, &wire).with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {} bytes to {}", wire.len(), path.display());
        }
        None => println!("{}", hex::encode(&wire)),
    }

    Ok(())
}
