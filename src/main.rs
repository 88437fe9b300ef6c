//! scorecast entry point

use clap::Parser;
use scorecast::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(Cli::parse()).await
}
