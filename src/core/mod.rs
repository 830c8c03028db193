//! Orchestration core
//!
//! Turns target configs into build jobs, derives each job's pipeline and
//! output plan, and runs the jobs through an [`Engine`](crate::engine::Engine)
//! once or in watch mode.

pub mod events;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod runner;
pub mod target;
pub mod watch;

pub use events::{BuildEvent, ConsoleReporter, NoOpReporter, RecordingReporter, StatusReporter};
pub use orchestrator::{BuildOrchestrator, FailurePolicy, RunOutcome, TargetResult};
pub use output::{OutputOptions, resolve_output};
pub use pipeline::{Pipeline, PipelineBuilder, Stage, StageTag};
pub use runner::{BuildRunner, TargetReport};
pub use target::{RunFlags, TargetDescriptor};
pub use watch::{WatchController, WatchHandle, WatchSession, WatchState};
