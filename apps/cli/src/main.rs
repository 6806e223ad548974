//! Scholarbot CLI: answer questions about papers using only their relevant sections.
//!
//! Papers are segmented into sections, each section is screened against the
//! question, and only the relevant summaries reach the final answer prompt.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
