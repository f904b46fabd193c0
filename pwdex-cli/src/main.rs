use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pwdex::conversion::parse_hex_key;
use pwdex::{DATASET_FILE_NAME, INDEX_FILE_NAME, Lookup, LookupEngine, PrefixLen, build_to_files};
use sha1::{Digest, Sha1};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;

use error::Error;

/// Exit status for a successful build or a found secret.
const FOUND: u8 = 0;

/// Exit status when the secret is absent from the corpus. Errors exit 2.
const NOT_FOUND: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "pwdex")]
#[command(about = "Build and query packed breach-digest snapshots")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a dataset/index snapshot from a sorted hex corpus
    Build {
        /// Corpus file: ascending lines of `<40-hex digest>:<count>`
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to publish pwdex.dat and pwdex.idx into
        #[arg(short, long)]
        output: PathBuf,

        /// Prefix width in bytes (1-3); trades index memory for search depth
        #[arg(short = 'p', long, default_value_t = 3)]
        prefix_len: usize,

        /// Overwrite an existing snapshot in the output directory
        #[arg(long)]
        force: bool,

        /// Disable progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check whether a secret's digest appears in a snapshot
    Check {
        /// Directory containing pwdex.dat and pwdex.idx
        #[arg(short, long)]
        data: PathBuf,

        /// Password to hash with SHA-1 and look up
        password: Option<String>,

        /// Look up a raw 40-character hex digest instead of a password
        #[arg(long, conflicts_with = "password")]
        sha1: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<u8, Error> {
    match args.command {
        Command::Build { input, output, prefix_len, force, no_progress } => {
            run_build(input, output, prefix_len, force, no_progress)
        }
        Command::Check { data, password, sha1 } => run_check(data, password, sha1),
    }
}

fn run_build(
    input: PathBuf,
    output: PathBuf,
    prefix_len: usize,
    force: bool,
    no_progress: bool,
) -> Result<u8, Error> {
    let prefix_len = PrefixLen::new(prefix_len)?;

    if !force {
        for name in [DATASET_FILE_NAME, INDEX_FILE_NAME] {
            if output.join(name).exists() {
                return Err(Error::SnapshotExists { path: output });
            }
        }
    }

    let file = File::open(&input)?;
    let total_bytes = file.metadata()?.len();
    let started = Instant::now();

    let progress_bar = if no_progress {
        None
    } else {
        let pb = ProgressBar::new(total_bytes);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
                )
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let index = match &progress_bar {
        Some(pb) => build_to_files(
            BufReader::new(pb.wrap_read(file)),
            prefix_len,
            &output,
        )?,
        None => build_to_files(BufReader::new(file), prefix_len, &output)?,
    };

    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    info!(elapsed = ?started.elapsed(), "build finished");
    println!(
        "Built {} records into {} ({} buckets, largest bucket {})",
        index.record_count(),
        output.display(),
        index.prefix_len().bucket_count(),
        index.max_bucket_len(),
    );

    Ok(FOUND)
}

fn run_check(
    data: PathBuf,
    password: Option<String>,
    sha1: Option<String>,
) -> Result<u8, Error> {
    let key = secret_to_key(password, sha1)?;
    let engine = LookupEngine::open_dir(&data)?;

    match engine.lookup(&key)? {
        Lookup::Found => {
            println!("Pwned! This secret appears in the breach corpus.");
            Ok(FOUND)
        }
        Lookup::NotFound => {
            println!("Not found in the breach corpus.");
            Ok(NOT_FOUND)
        }
    }
}

/// Resolve the secret to a 20-byte key: either SHA-1 of a password, or a
/// digest the caller already has in hex.
fn secret_to_key(
    password: Option<String>,
    sha1: Option<String>,
) -> Result<[u8; pwdex::KEY_LEN], Error> {
    if let Some(hex) = sha1 {
        return match parse_hex_key(hex.as_bytes()) {
            Some(key) => Ok(key),
            None => Err(Error::BadDigest { value: hex }),
        };
    }

    let Some(password) = password else {
        return Err(Error::MissingSecret);
    };

    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    Ok(hasher.finalize().into())
}
