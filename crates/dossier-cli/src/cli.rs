use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dossier",
    about = "Dossier: validate agent-produced artifacts and compose founder-facing reports",
    version
)]
pub struct Cli {
    /// Diagnostic log level (overridden by DOSSIER_LOG)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose a pitch-deck review report
    DeckReview(ComposeArgs),

    /// Compose an investment-committee simulation report
    IcSim(ComposeArgs),

    /// Compose a market sizing report with figure provenance
    MarketSizing(ComposeArgs),

    /// List a pipeline's rules and its code/severity table
    Rules {
        /// Pipeline to describe
        #[arg(value_enum)]
        pipeline: PipelineName,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ComposeArgs {
    /// Directory holding the pipeline's JSON artifacts
    #[arg(short, long)]
    pub dir: PathBuf,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Write the JSON output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit 1 when any high or medium finding remains
    #[arg(long)]
    pub strict: bool,

    /// Reference date for staleness checks (YYYY-MM-DD, default today)
    #[arg(long)]
    pub as_of: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PipelineName {
    DeckReview,
    IcSim,
    MarketSizing,
}
