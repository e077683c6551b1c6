use clap::Parser;
use mprobe_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging before any command runs; falls back to stderr.
    logging::init(cli.stderr);

    if let Err(err) = cli.run().await {
        eprintln!("mprobe error: {:#}", err);
        std::process::exit(1);
    }
}
