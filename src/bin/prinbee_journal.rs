// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Dumps a journal directory for inspection: every live event, in request-id
//! or time order, optionally decoding the request id as a big-endian binary
//! integer and/or showing attachment contents as text (§6).

use clap::Parser;
use prinbee_storage::journal::{Journal, Status};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "prinbee-journal", about = "Lists the events recorded in a Prinbee journal directory")]
struct Args {
    /// List the events without dumping their attachment contents.
    #[arg(long)]
    list: bool,

    /// Sort events by time instead of by request id.
    #[arg(long = "by-time")]
    by_time: bool,

    /// Assume attachments are text and print them as-is.
    #[arg(long)]
    text: bool,

    /// Decode the request id as a big-endian 1/2/4/8-byte integer.
    #[arg(long = "binary-id")]
    binary_id: bool,

    /// Path to the journal directory.
    path: PathBuf,
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::Ready => "Ready",
        Status::Forwarded => "Forwarded",
        Status::Acknowledged => "Acknowledged",
        Status::Completed => "Completed",
        Status::Failed => "Failed",
    }
}

fn format_request_id(id: &[u8], binary_id: bool) -> String {
    if binary_id {
        match id.len() {
            1 => return id[0].to_string(),
            2 => return u16::from_be_bytes([id[0], id[1]]).to_string(),
            4 => return u32::from_be_bytes([id[0], id[1], id[2], id[3]]).to_string(),
            8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(id);
                return u64::from_be_bytes(bytes).to_string();
            }
            _ => {}
        }
    }
    String::from_utf8_lossy(id).into_owned()
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.path.as_os_str().is_empty() {
        eprintln!("error: <path> cannot be an empty string.");
        return ExitCode::FAILURE;
    }

    let mut journal = match Journal::open(&args.path) {
        Ok(journal) => journal,
        Err(error) => {
            eprintln!("error: could not load journal at \"{}\": {error}", args.path.display());
            return ExitCode::FAILURE;
        }
    };

    journal.rewind();
    loop {
        let event = match journal.next_event(args.by_time, true) {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(error) => {
                eprintln!("error: {error}");
                return ExitCode::FAILURE;
            }
        };

        let id = format_request_id(&event.request_id, args.binary_id);
        let (file_name, offset) = event
            .debug
            .as_ref()
            .map_or((String::new(), 0), |d| (d.file_name.clone(), d.offset));
        println!("Event: {id} (file: \"{file_name}\", offset: {offset})");
        println!("  Status: {}", status_name(event.status));
        println!("  Event Time: {}.{:09}", event.time_sec, event.time_nsec);

        if !args.list {
            for (index, attachment) in event.attachments.iter().enumerate() {
                let size = attachment.size().unwrap_or(0);
                println!("  Attachment #{index}: {size} byte(s){}", if attachment.is_file() { " (external)" } else { "" });
                if args.text {
                    match attachment.read() {
                        Ok(bytes) => println!("    {}", String::from_utf8_lossy(&bytes)),
                        Err(error) => println!("    <could not read: {error}>"),
                    }
                }
            }
        }
    }

    ExitCode::SUCCESS
}
