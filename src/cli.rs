use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::logging::LogArgs;

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Hexadecimal (lowercase)
    Hex,
    /// Uppercase hexadecimal
    HexUpper,
    /// Raw binary bytes
    Raw,
    /// Base64 (standard, with padding)
    Base64,
    /// Base64 URL-safe (no padding)
    Base64url,
}

#[derive(Debug, Args)]
pub struct AccumulatorArgs {
    /// Seed file carrying entropy between runs (created with mode 0600)
    #[arg(short = 's', long = "seed-file")]
    pub seed_file: Option<PathBuf>,

    /// Seconds between background seed file rewrites (1-86400)
    #[arg(long)]
    pub resave_interval: Option<u64>,

    /// Configuration file path (default: /etc/fortuna.toml)
    #[arg(long = "config")]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(name = "fortuna", about = "Fortuna cryptographic random byte generator")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Number of random bytes to generate
    #[arg(short = 'n', long = "bytes", default_value_t = 32)]
    pub bytes: usize,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Hex)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output-file")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub accumulator: AccumulatorArgs,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep feeding ambient entropy into the pools and print a block every interval
    Stream(StreamArgs),
}

#[derive(Debug, Parser)]
pub struct StreamArgs {
    /// Seconds between output blocks
    #[arg(short = 'i', long, default_value_t = 1)]
    pub interval: u64,

    /// Bytes per output block
    #[arg(short = 'b', long, default_value_t = 32)]
    pub block_size: usize,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Hex)]
    pub format: OutputFormat,

    /// Do not feed CPU jitter samples
    #[arg(long)]
    pub no_jitter: bool,

    /// Do not feed procfs snapshots
    #[arg(long)]
    pub no_procfs: bool,

    #[command(flatten)]
    pub accumulator: AccumulatorArgs,

    #[command(flatten)]
    pub log: LogArgs,
}
