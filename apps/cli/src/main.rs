//! SiteBrief CLI: crawl a website and synthesize a structured brief.
//!
//! Prints JSON responses on stdout; logs and progress go to stderr.

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
