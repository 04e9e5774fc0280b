// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Computes the CRC-16 of one or more inputs, reading bytes either directly
//! off the command line (`--hex`) or from files (`--file`) (§6).

use clap::Parser;
use prinbee_storage::crc16::{crc16_compute, to_le_bytes};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "crc16", about = "Computes the CRC-16 used to frame Prinbee journal and block headers")]
struct Args {
    /// Hex-encoded byte strings to checksum, one CRC printed per value.
    #[arg(long)]
    hex: Vec<String>,

    /// Files to checksum, one CRC printed per file.
    #[arg(long)]
    file: Vec<PathBuf>,
}

fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let text = text.trim();
    if text.len() % 2 != 0 {
        return Err(format!("hex string '{text}' has an odd number of digits"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| format!("invalid hex digits in '{text}'")))
        .collect()
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.hex.is_empty() && args.file.is_empty() {
        eprintln!("crc16: nothing to do, pass --hex <bytes> or --file <path> at least once");
        return ExitCode::FAILURE;
    }

    let mut failed = false;

    for hex in &args.hex {
        match decode_hex(hex) {
            Ok(bytes) => {
                let crc = crc16_compute(&bytes);
                let wire = to_le_bytes(crc);
                println!("{hex}: {crc:#06x} ({:02x}{:02x})", wire[0], wire[1]);
            }
            Err(message) => {
                eprintln!("crc16: {message}");
                failed = true;
            }
        }
    }

    for path in &args.file {
        match std::fs::read(path) {
            Ok(bytes) => {
                let crc = crc16_compute(&bytes);
                println!("{}: {crc:#06x}", path.display());
            }
            Err(error) => {
                eprintln!("crc16: could not read {}: {error}", path.display());
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
