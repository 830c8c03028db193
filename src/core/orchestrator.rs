//! Runs every configured target, once or in watch mode

use crate::core::events::StatusReporter;
use crate::core::runner::{BuildRunner, TargetReport};
use crate::core::target::{RunFlags, TargetDescriptor};
use crate::core::watch::{WatchController, WatchSession};
use crate::engine::Engine;
use crate::error::Result;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// What happens to the remaining targets once one fails in one-shot mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failure; later targets are never attempted
    #[default]
    FailFast,
    /// Build every target and report each result
    CollectResults,
}

/// Result of one target in one-shot mode
#[derive(Debug)]
pub struct TargetResult {
    pub index: usize,
    pub result: Result<TargetReport>,
}

impl TargetResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// What a run produced
#[derive(Debug)]
pub enum RunOutcome {
    /// One-shot mode: per-target results, in config order
    Built(Vec<TargetResult>),
    /// Watch mode: the live watches, to be held and released by the caller
    Watching(WatchSession),
}

impl RunOutcome {
    /// Number of targets whose one-shot build failed
    pub fn failures(&self) -> usize {
        match self {
            Self::Built(results) => results.iter().filter(|r| !r.is_ok()).count(),
            Self::Watching(_) => 0,
        }
    }
}

/// Owns the ordered targets of one invocation
pub struct BuildOrchestrator {
    flags: Arc<RunFlags>,
    targets: Vec<TargetDescriptor>,
    runner: BuildRunner,
    watcher: WatchController,
    policy: FailurePolicy,
}

impl BuildOrchestrator {
    pub fn new(
        flags: Arc<RunFlags>,
        targets: Vec<TargetDescriptor>,
        engine: Arc<dyn Engine>,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            flags,
            targets,
            runner: BuildRunner::new(Arc::clone(&engine), Arc::clone(&reporter)),
            watcher: WatchController::new(engine, reporter),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn targets(&self) -> &[TargetDescriptor] {
        &self.targets
    }

    #[instrument(skip(self), fields(targets = self.targets.len(), watch = self.flags.watch))]
    pub async fn run(&self) -> Result<RunOutcome> {
        if self.flags.watch {
            self.start_watching().map(RunOutcome::Watching)
        } else {
            self.build_all().await.map(RunOutcome::Built)
        }
    }

    /// Strictly sequential: a target starts only after the previous one's
    /// write phase has settled.
    async fn build_all(&self) -> Result<Vec<TargetResult>> {
        let mut results = Vec::with_capacity(self.targets.len());

        for target in &self.targets {
            match self.runner.run_once(target).await {
                Err(e) if self.policy == FailurePolicy::FailFast => {
                    error!("Target #{} failed, skipping the rest", target.index());
                    return Err(e);
                }
                result => {
                    if let Err(e) = &result {
                        warn!("Target #{} failed: {}", target.index(), e);
                    }
                    results.push(TargetResult {
                        index: target.index(),
                        result,
                    });
                }
            }
        }

        Ok(results)
    }

    fn start_watching(&self) -> Result<WatchSession> {
        let mut session = WatchSession::default();

        for target in &self.targets {
            match self.watcher.start_watch(target) {
                Ok(handle) => session.push(handle),
                Err(e) => {
                    error!("Could not watch target #{}: {}", target.index(), e);
                    session.release();
                    return Err(e);
                }
            }
        }

        info!("Watching {} target(s)", session.len());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PackageMetadata, TargetConfig};
    use crate::core::events::{BuildEvent, RecordingReporter};
    use crate::engine::{EngineCall, MockEngine};
    use crate::error::BundlerError;
    use std::{path::PathBuf, time::Duration};

    fn orchestrator(
        engine: &MockEngine,
        reporter: Arc<RecordingReporter>,
        watch: bool,
        paths: &[(&str, &str)],
    ) -> BuildOrchestrator {
        let flags = Arc::new(RunFlags {
            watch,
            ..RunFlags::default()
        });
        let package = Arc::new(PackageMetadata::default());
        let targets = paths
            .iter()
            .enumerate()
            .map(|(index, (input, output))| {
                let config = TargetConfig {
                    input: input.to_string(),
                    output: output.to_string(),
                    ..TargetConfig::default()
                };
                TargetDescriptor::new(index, Arc::clone(&flags), config, Arc::clone(&package))
            })
            .collect();
        BuildOrchestrator::new(flags, targets, Arc::new(engine.clone()), reporter)
    }

    #[tokio::test]
    async fn test_fail_fast_skips_later_targets() {
        let engine = MockEngine::new();
        engine.fail_on("src/a.js");
        let reporter = Arc::new(RecordingReporter::new());
        let orch = orchestrator(
            &engine,
            reporter.clone(),
            false,
            &[("src/a.js", "dist/a.js"), ("src/b.js", "dist/b.js")],
        );

        let result = orch.run().await;

        assert!(matches!(result, Err(BundlerError::Pipeline { .. })));
        assert_eq!(engine.build_count(), 1);
        assert!(!engine.calls().contains(&EngineCall::Build {
            input: PathBuf::from("src/b.js")
        }));
    }

    #[tokio::test]
    async fn test_targets_build_sequentially() {
        let engine = MockEngine::new();
        engine.delay_write("dist/a.js", Duration::from_millis(30));
        let reporter = Arc::new(RecordingReporter::new());
        let orch = orchestrator(
            &engine,
            reporter.clone(),
            false,
            &[("src/a.js", "dist/a.js"), ("src/b.js", "dist/b.js")],
        );

        let outcome = orch.run().await.unwrap();
        assert_eq!(outcome.failures(), 0);

        let calls = engine.calls();
        let a_done = calls
            .iter()
            .position(|c| {
                *c == EngineCall::WriteFinished {
                    file: PathBuf::from("dist/a.js"),
                }
            })
            .unwrap();
        let b_build = calls
            .iter()
            .position(|c| {
                *c == EngineCall::Build {
                    input: PathBuf::from("src/b.js"),
                }
            })
            .unwrap();
        assert!(a_done < b_build);

        let targets: Vec<usize> = reporter.events().iter().map(BuildEvent::target).collect();
        assert_eq!(targets, vec![0, 0, 1, 1]);
    }

    #[tokio::test]
    async fn test_collect_results_runs_every_target() {
        let engine = MockEngine::new();
        engine.fail_on("src/a.js");
        let reporter = Arc::new(RecordingReporter::new());
        let orch = orchestrator(
            &engine,
            reporter.clone(),
            false,
            &[("src/a.js", "dist/a.js"), ("src/b.js", "dist/b.js")],
        )
        .with_policy(FailurePolicy::CollectResults);

        let outcome = orch.run().await.unwrap();

        assert_eq!(outcome.failures(), 1);
        let RunOutcome::Built(results) = outcome else {
            panic!("expected one-shot results");
        };
        assert_eq!(results.len(), 2);
        assert!(!results[0].is_ok());
        assert_eq!(results[1].index, 1);
        assert_eq!(
            results[1].result.as_ref().unwrap().output,
            PathBuf::from("dist/b.js")
        );
        assert_eq!(engine.build_count(), 2);
    }

    #[tokio::test]
    async fn test_watch_registers_targets_in_order() {
        let engine = MockEngine::new();
        let reporter = Arc::new(RecordingReporter::new());
        let orch = orchestrator(
            &engine,
            reporter.clone(),
            true,
            &[("src/a.js", "dist/a.js"), ("src/b.js", "dist/b.js")],
        );

        let outcome = orch.run().await.unwrap();
        let RunOutcome::Watching(session) = outcome else {
            panic!("expected a watch session");
        };

        assert_eq!(session.len(), 2);
        assert_eq!(engine.build_count(), 0);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Watch {
                    input: PathBuf::from("src/a.js")
                },
                EngineCall::Watch {
                    input: PathBuf::from("src/b.js")
                },
            ]
        );
        session.release();
    }

    #[tokio::test]
    async fn test_empty_target_list() {
        let engine = MockEngine::new();
        let orch = orchestrator(&engine, Arc::new(RecordingReporter::new()), false, &[]);

        assert!(orch.targets().is_empty());
        let outcome = orch.run().await.unwrap();
        assert!(matches!(outcome, RunOutcome::Built(ref results) if results.is_empty()));
    }
}
