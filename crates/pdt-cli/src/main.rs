//! pdt-convert: build physioData containers from raw recordings

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "pdt-convert",
    version,
    about = "Convert raw delimited recordings into physioData containers"
)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the conversion described by a JSON configuration file
    Convert {
        config: PathBuf,
        /// Raw sample file, overriding the configured one
        #[arg(long)]
        input: Option<PathBuf>,
        /// Destination, instead of the source path with the output extension
        #[arg(long)]
        output: Option<PathBuf>,
        /// Recorded as the creating user instead of the account name
        #[arg(long)]
        user: Option<String>,
    },
    /// Write the ECG/EDA example configuration
    Init {
        path: PathBuf,
        /// Raw sample file the configuration points at
        #[arg(long, default_value = "recording.txt")]
        source: PathBuf,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Summarize a saved container
    Inspect { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert { config, input, output, user } => {
            commands::convert(&config, input, output, user)
        }
        Commands::Init { path, source, force } => commands::init(&path, source, force),
        Commands::Inspect { file } => commands::inspect(&file),
    }
}
