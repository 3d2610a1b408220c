//! Dossier CLI: the `dossier` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands, PipelineName};
use dossier_pipelines::{deck_review, ic_sim, market_sizing};

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { 1 } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    });
    support::init_logging(&cli.log_level);

    match cli.command {
        Commands::DeckReview(args) => commands::compose::run(&deck_review::PIPELINE, args),

        Commands::IcSim(args) => commands::compose::run(&ic_sim::PIPELINE, args),

        Commands::MarketSizing(args) => commands::compose::run(&market_sizing::PIPELINE, args),

        Commands::Rules { pipeline, json } => match pipeline {
            PipelineName::DeckReview => commands::rules::run(&deck_review::PIPELINE, json),
            PipelineName::IcSim => commands::rules::run(&ic_sim::PIPELINE, json),
            PipelineName::MarketSizing => commands::rules::run(&market_sizing::PIPELINE, json),
        },
    }
}
