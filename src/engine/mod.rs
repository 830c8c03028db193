//! External bundling engine abstraction
//!
//! The orchestration core never bundles anything itself. It hands an
//! [`InputOptions`] to an [`Engine`] for the build phase, then an
//! [`OutputOptions`] to the resulting [`Bundle`] for the write phase. Watch
//! mode goes through the engine's incremental facility, which reports its
//! lifecycle as [`EngineEvent`]s.

mod mock;
mod rollup;
mod watch;

pub use mock::{EngineCall, MockEngine};
pub use rollup::{RollupEngine, canonical_format, input_args, output_args, plugin_arg};
pub use watch::spawn_watch;

use crate::core::output::OutputOptions;
use crate::core::pipeline::{DEPENDENCY_GLOB, Pipeline, PipelineBuilder, TreeShake};
use crate::core::target::TargetDescriptor;
use crate::error::Result;
use async_trait::async_trait;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};

/// Build-phase options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputOptions {
    /// Entry module
    pub input: PathBuf,
    /// Module ids left out of the bundle
    pub external: Vec<String>,
    pub pipeline: Pipeline,
}

impl InputOptions {
    pub fn for_target(target: &TargetDescriptor) -> Self {
        let config = target.config();
        Self {
            input: PathBuf::from(&config.input),
            external: config.external.clone(),
            pipeline: PipelineBuilder::for_target(target),
        }
    }

    pub fn tree_shake(&self) -> TreeShake {
        self.pipeline.tree_shake()
    }
}

/// How the engine watches the file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Project root, watched recursively so any module of the input graph
    /// can trigger a rebuild. Relative roots resolve against the working
    /// directory.
    pub root: PathBuf,
    /// Clear the terminal before every rebuild
    pub clear_screen: bool,
    /// Globs, relative to `root`, whose changes are ignored
    pub exclude: Vec<String>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            clear_screen: false,
            exclude: vec![DEPENDENCY_GLOB.to_string()],
        }
    }
}

/// Full plan registered with the engine's watch facility
#[derive(Debug, Clone)]
pub struct WatchRequest {
    pub input: InputOptions,
    pub output: OutputOptions,
    pub settings: WatchSettings,
}

/// Lifecycle of one watched rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    BundleStart,
    BundleEnd { duration: Duration },
    Error { message: String },
}

/// A live engine watch: its event stream and the task producing it
#[derive(Debug)]
pub struct EngineWatch {
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    pub task: JoinHandle<()>,
}

/// Result of the build phase, ready to be written
#[async_trait]
pub trait Bundle: Send + Sync {
    /// Write the artifacts and return every file or directory produced
    async fn write(&self, output: &OutputOptions) -> Result<Vec<PathBuf>>;
}

/// The external module-transformation engine
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Build phase
    async fn build(&self, options: &InputOptions) -> Result<Box<dyn Bundle>>;

    /// Register a plan with the incremental-watch facility. Returns as soon
    /// as the subscription exists, without waiting for a first build.
    fn watch(self: Arc<Self>, request: WatchRequest) -> Result<EngineWatch>;
}
