//! Command implementations for the CLI

use crate::{
    cli::Args,
    config::{load_package_metadata, load_targets, validate_targets},
    core::{BuildOrchestrator, ConsoleReporter, RunOutcome, TargetDescriptor, WatchSession},
    engine::RollupEngine,
};
use anyhow::{Context, bail};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Load the configuration and run every target
#[instrument(skip(args))]
pub async fn execute(args: &Args) -> anyhow::Result<()> {
    let flags = Arc::new(args.run_flags());

    let configs = load_targets(&flags.config).context("Failed to load target configs")?;
    validate_targets(&configs).context("Invalid target config")?;
    let package = Arc::new(
        load_package_metadata(&flags.package_json).context("Failed to load package metadata")?,
    );
    debug!("Package name: {:?}", package.name());

    let targets = configs
        .into_iter()
        .enumerate()
        .map(|(index, config)| {
            TargetDescriptor::new(index, Arc::clone(&flags), config, Arc::clone(&package))
        })
        .collect();

    let engine = RollupEngine::locate(args.debug).await;
    let orchestrator = BuildOrchestrator::new(
        flags,
        targets,
        Arc::new(engine),
        Arc::new(ConsoleReporter),
    )
    .with_policy(args.on_error.into());

    let outcome = orchestrator.run().await?;
    let failures = outcome.failures();
    match outcome {
        RunOutcome::Built(results) => {
            if failures > 0 {
                bail!("{} of {} target(s) failed", failures, results.len());
            }
            info!("Built {} target(s)", results.len());
            Ok(())
        }
        RunOutcome::Watching(session) => wait_for_exit(session).await,
    }
}

/// Hold the watches until interrupted or until every watch has closed
async fn wait_for_exit(session: WatchSession) -> anyhow::Result<()> {
    let count = session.len();

    // The session lives inside the `closed` future; dropping that future on
    // interrupt releases every watch still open.
    tokio::select! {
        () = session.closed() => {
            info!("All {} watch(es) closed", count);
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for interrupt")?;
            info!("Interrupted, released {} watch(es)", count);
        }
    }
    Ok(())
}
