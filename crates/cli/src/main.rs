use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use commands::*;
use settings::Settings;

#[derive(Parser)]
#[command(version, about = "Authenticate contactless identity documents")]
struct Cli {
    /// Settings file (defaults to ./idcheck.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trusted root certificate, DER or PEM
    #[arg(short, long)]
    trusted_root: Option<PathBuf>,

    /// Only use this reader (any reader if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Scan a document and verify it against the trusted root
    Scan {
        /// Key printed on the document, compared with the chip's fingerprint
        #[arg(short, long)]
        key: Option<String>,

        /// Abort the scan after this many seconds (0 waits forever)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Parse a certificate file and verify it against the trusted root
    Inspect {
        /// Certificate file, DER or PEM
        #[arg(required = true)]
        cert_file: PathBuf,
    },
}

fn main() -> eyre::Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.trusted_root {
        settings.trusted_root = Some(path);
    }
    if let Some(reader) = cli.reader {
        settings.reader = Some(reader);
    }

    match cli.command {
        Commands::List => list_command(),
        Commands::Scan { key, timeout } => {
            if let Some(timeout) = timeout {
                settings.scan_timeout_secs = timeout;
            }
            scan_command(&settings, key)
        }
        Commands::Inspect { cert_file } => inspect_command(&settings, &cert_file),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();
}
