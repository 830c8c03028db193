#![allow(clippy::cargo_common_metadata)]
use anyhow::Result;
use tracing::warn;
use ultrabundle::{cli, setup_logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let (args, warnings) = cli::parse_args(std::env::args());

    // Setup logging based on debug flag
    setup_logging(args.debug)?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    cli::execute(&args).await
}
