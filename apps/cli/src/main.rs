//! BankChat CLI: ask the banking assistant from the shell.
//!
//! Runs single question turns through the same retrieval pipeline as the
//! TUI, and inspects the vector store and configuration.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
