//! jedi CLI — operational tooling exercising the client engine against
//! the in-memory test doubles for the key store and WKD-IBE provider
//! (both are external collaborators in production; see `DESIGN.md`).
//!
//! Usage:
//!   jedi encrypt --hierarchy <id> --uri <uri> --timestamp <rfc3339> --input <file> --output <file>
//!   jedi decrypt --hierarchy <id> --uri <uri> --timestamp <rfc3339> --input <file> --output <file>
//!   jedi delegate --hierarchy <id> --uri <uri> --start <rfc3339> --end <rfc3339>

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jedi_core::{
    Cancellation, ClientConfig, ClientState, DefaultPatternEncoder, InMemoryKeyStore,
    MockWkdIbeProvider, PatternEncoder, Permissions, WkdIbeProvider,
};

/// Fixed for reproducibility across separate `encrypt`/`decrypt` process
/// invocations. A real deployment never runs the mock provider at all.
const DEMO_PEPPER: [u8; 32] = *b"jedi-core-cli-demo-pepper-000000";
const MAX_URI_LENGTH: usize = 16;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "encrypt" => cmd_encrypt(&args[2..]),
        "decrypt" => cmd_decrypt(&args[2..]),
        "delegate" => cmd_delegate(&args[2..]),
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" => {
            println!("jedi {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        cmd => {
            eprintln!("error: unknown command '{}'", cmd);
            print_usage();
            Err("unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"jedi — JEDI client engine CLI

USAGE:
    jedi <COMMAND> [OPTIONS]

COMMANDS:
    encrypt     Encrypt a file under a (hierarchy, uri, timestamp)
    decrypt     Decrypt a file under a (hierarchy, uri, timestamp)
    delegate    Print the minimal covering pattern list for a time range

EXAMPLES:
    jedi encrypt --hierarchy example.org --uri building1/floor2/temp \
        --timestamp 2026-07-28T10:00:00Z --input plain.txt --output cipher.bin

    jedi decrypt --hierarchy example.org --uri building1/floor2/temp \
        --timestamp 2026-07-28T10:00:00Z --input cipher.bin --output plain.txt

    jedi delegate --hierarchy example.org --uri building1/floor2/temp \
        --start 2026-07-28T00:00:00Z --end 2026-07-29T00:00:00Z

OPTIONS:
    -h, --help       Print help
    -V, --version    Print version

NOTE: this CLI drives the client engine against an in-memory key store
and a non-cryptographic mock WKD-IBE provider, both seeded from a fixed
demo pepper. It is a development aid, not a production tool.
"#
    );
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to start tokio runtime")
}

async fn demo_client(hierarchy: &[u8]) -> Result<ClientState, Box<dyn std::error::Error>> {
    let provider = Arc::new(MockWkdIbeProvider::with_pepper(DEMO_PEPPER));
    let store = Arc::new(InMemoryKeyStore::new());

    let params = provider.setup(hierarchy)?;
    store.seed_params(hierarchy, params.clone()).await;

    let wildcard_len = DefaultPatternEncoder::new(MAX_URI_LENGTH).pattern_len(0);
    let wildcard_pattern = jedi_core::Pattern::empty(wildcard_len);
    let key = provider.keygen(&params, &wildcard_pattern.to_attribute_list())?;
    store.seed_key(hierarchy, wildcard_pattern, key).await;

    Ok(ClientState::new(
        ClientConfig::default(),
        Arc::new(DefaultPatternEncoder::new(MAX_URI_LENGTH)),
        store,
        provider,
    ))
}

struct CommonOpts {
    hierarchy: Vec<u8>,
    uri: String,
}

fn parse_common(args: &[String], i: &mut usize, opts: &mut CommonOpts) -> bool {
    match args[*i].as_str() {
        "--hierarchy" | "-H" => {
            *i += 1;
            opts.hierarchy = args[*i].as_bytes().to_vec();
            true
        }
        "--uri" | "-u" => {
            *i += 1;
            opts.uri = args[*i].clone();
            true
        }
        _ => false,
    }
}

fn cmd_encrypt(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut opts = CommonOpts {
        hierarchy: Vec::new(),
        uri: String::new(),
    };
    let mut timestamp: Option<DateTime<Utc>> = None;
    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        if !parse_common(args, &mut i, &mut opts) {
            match args[i].as_str() {
                "--timestamp" | "-t" => {
                    i += 1;
                    timestamp = Some(args.get(i).ok_or("missing --timestamp")?.parse()?);
                }
                "--input" | "-i" => {
                    i += 1;
                    input_path = Some(PathBuf::from(args.get(i).ok_or("missing --input")?));
                }
                "--output" | "-o" => {
                    i += 1;
                    output_path = Some(PathBuf::from(args.get(i).ok_or("missing --output")?));
                }
                _ => return Err(format!("unknown option: {}", args[i]).into()),
            }
        }
        i += 1;
    }

    let timestamp = timestamp.ok_or("missing --timestamp")?;
    let output_path = output_path.ok_or("missing --output")?;

    let plaintext = if let Some(path) = &input_path {
        fs::read(path)?
    } else {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    };

    runtime().block_on(async {
        let client = demo_client(&opts.hierarchy).await?;
        let cancel = Cancellation::new();
        let ciphertext = client
            .encrypt(&cancel, &opts.hierarchy, &opts.uri, timestamp, &plaintext)
            .await
            .map_err(|e| format!("encryption failed: {e}"))?;
        fs::write(&output_path, &ciphertext)?;
        eprintln!("Encrypted {} bytes -> {} bytes", plaintext.len(), ciphertext.len());
        eprintln!("Output: {}", output_path.display());
        Ok(())
    })
}

fn cmd_decrypt(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut opts = CommonOpts {
        hierarchy: Vec::new(),
        uri: String::new(),
    };
    let mut timestamp: Option<DateTime<Utc>> = None;
    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        if !parse_common(args, &mut i, &mut opts) {
            match args[i].as_str() {
                "--timestamp" | "-t" => {
                    i += 1;
                    timestamp = Some(args.get(i).ok_or("missing --timestamp")?.parse()?);
                }
                "--input" | "-i" => {
                    i += 1;
                    input_path = Some(PathBuf::from(args.get(i).ok_or("missing --input")?));
                }
                "--output" | "-o" => {
                    i += 1;
                    output_path = Some(PathBuf::from(args.get(i).ok_or("missing --output")?));
                }
                _ => return Err(format!("unknown option: {}", args[i]).into()),
            }
        }
        i += 1;
    }

    let timestamp = timestamp.ok_or("missing --timestamp")?;

    let ciphertext = if let Some(path) = &input_path {
        fs::read(path)?
    } else {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    };

    runtime().block_on(async {
        let client = demo_client(&opts.hierarchy).await?;
        let cancel = Cancellation::new();
        let plaintext = client
            .decrypt(&cancel, &opts.hierarchy, &opts.uri, timestamp, &ciphertext)
            .await
            .map_err(|e| format!("decryption failed: {e}"))?;

        if let Some(path) = &output_path {
            fs::write(path, &plaintext)?;
            eprintln!("Decrypted {} bytes -> {} bytes", ciphertext.len(), plaintext.len());
            eprintln!("Output: {}", path.display());
        } else {
            io::stdout().write_all(&plaintext)?;
        }
        Ok(())
    })
}

fn cmd_delegate(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let mut opts = CommonOpts {
        hierarchy: Vec::new(),
        uri: String::new(),
    };
    let mut start: Option<DateTime<Utc>> = None;
    let mut end: Option<DateTime<Utc>> = None;

    let mut i = 0;
    while i < args.len() {
        if !parse_common(args, &mut i, &mut opts) {
            match args[i].as_str() {
                "--start" => {
                    i += 1;
                    start = Some(args.get(i).ok_or("missing --start")?.parse()?);
                }
                "--end" => {
                    i += 1;
                    end = Some(args.get(i).ok_or("missing --end")?.parse()?);
                }
                _ => return Err(format!("unknown option: {}", args[i]).into()),
            }
        }
        i += 1;
    }

    let start = start.ok_or("missing --start")?;
    let end = end.ok_or("missing --end")?;

    runtime().block_on(async {
        let client = demo_client(&opts.hierarchy).await?;
        let cancel = Cancellation::new();
        let delegation = client
            .delegate(&cancel, &opts.hierarchy, &opts.uri, start, end, Permissions::DECRYPT)
            .await
            .map_err(|e| format!("delegation failed: {e}"))?;

        println!("Delegation for {} patterns:", delegation.patterns.len());
        for pattern in &delegation.patterns {
            println!("  {} bound slots", pattern.slots().iter().filter(|s| s.is_some()).count());
        }
        Ok(())
    })
}
