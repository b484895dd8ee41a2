//! CLI definitions for tprobe.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tprobe_core::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "tprobe",
    version,
    about = "Conditional trace probes for suspended frames",
    after_help = "Examples:\n  tprobe check probes.def\n  tprobe replay probes.def hits.jsonl --format json\n  tprobe replay probes.def hits.jsonl --threads --keep-going"
)]
pub struct Cli {
    /// Log dispatch details to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a session definition and list its probes.
    Check {
        /// Session-definition file.
        definition: PathBuf,
    },
    /// Replay a recorded hit trace through a session.
    Replay {
        /// Session-definition file.
        definition: PathBuf,
        /// Hit trace in JSON Lines form.
        trace: PathBuf,
        /// Session config (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Record format (overrides config).
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Record file (overrides config; stdout otherwise).
        #[arg(long)]
        output: Option<PathBuf>,
        /// Replay each recorded thread concurrently.
        #[arg(long)]
        threads: bool,
        /// Keep replaying a thread after a halt.
        #[arg(long)]
        keep_going: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}
