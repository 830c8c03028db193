//! One-shot builds
//!
//! Drives a single target through the engine exactly once: build phase,
//! write phase, status report.

use crate::core::events::{BuildEvent, StatusReporter};
use crate::core::output::resolve_output;
use crate::core::target::TargetDescriptor;
use crate::engine::{Engine, InputOptions};
use crate::error::Result;
use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, instrument};

/// Outcome of one successful target build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Position of the target in the config array
    pub index: usize,
    pub output: PathBuf,
    /// Wall-clock time from build start to end of the write phase
    pub duration: Duration,
    /// Every file or directory the engine wrote
    pub artifacts: Vec<PathBuf>,
}

/// Builds targets once through the engine
#[derive(Clone)]
pub struct BuildRunner {
    engine: Arc<dyn Engine>,
    reporter: Arc<dyn StatusReporter>,
}

impl BuildRunner {
    pub fn new(engine: Arc<dyn Engine>, reporter: Arc<dyn StatusReporter>) -> Self {
        Self { engine, reporter }
    }

    /// Build and write one target. Engine failures are returned as they are,
    /// without retry or cleanup of partial output.
    #[instrument(skip(self, target), fields(target = target.index()))]
    pub async fn run_once(&self, target: &TargetDescriptor) -> Result<TargetReport> {
        let input = InputOptions::for_target(target);
        let output = resolve_output(target);
        debug!("Pipeline: {:?}", input.pipeline.tags());

        self.reporter.report(&BuildEvent::Started {
            target: target.index(),
            input: target.config().input.clone(),
        });
        let begin = Instant::now();

        let bundle = self.engine.build(&input).await?;
        let artifacts = bundle.write(&output).await?;

        let duration = begin.elapsed();
        self.reporter.report(&BuildEvent::Finished {
            target: target.index(),
            output: target.config().output.clone(),
            duration,
        });

        Ok(TargetReport {
            index: target.index(),
            output: output.file,
            duration,
            artifacts,
        })
    }
}
