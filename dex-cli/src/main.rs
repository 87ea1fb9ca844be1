//! dex entry point.

use std::process::ExitCode;

use clap::Parser;
use dex_cli::{init_tracing, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "dex failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
