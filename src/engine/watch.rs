//! File-system watch loop backing an engine's incremental-watch facility
//!
//! One task per watched plan. It builds once up front, then rebuilds after
//! every debounced batch of changes under the project root that touches
//! something other than the engine's own output. Cycles never overlap: the
//! next batch is only awaited once the current build has ended.

use super::{Engine, EngineEvent, EngineWatch, WatchRequest};
use crate::core::pipeline::Stage;
use crate::error::{BundlerError, Result};
use crate::utils::FileSystemUtils;
use glob::Pattern;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Quiet period that collapses bursts of changes into one rebuild
const DEBOUNCE: Duration = Duration::from_millis(50);

/// Files the engine may write next to an output file
const OUTPUT_SIDECARS: [&str; 2] = [".map", ".gz"];

/// Decides which changed paths trigger a rebuild
#[derive(Debug, Clone)]
pub(crate) struct ChangeFilter {
    base: PathBuf,
    exclude: Vec<Pattern>,
    /// Files written by the engine
    files: Vec<PathBuf>,
    /// Directories written by the engine
    dirs: Vec<PathBuf>,
}

impl ChangeFilter {
    /// `base` is the absolute watch root. Relative output paths resolve
    /// against `cwd`.
    pub(crate) fn new(base: PathBuf, cwd: &Path, request: &WatchRequest) -> Result<Self> {
        let exclude = request
            .settings
            .exclude
            .iter()
            .map(|glob| {
                Pattern::new(glob)
                    .map_err(|e| BundlerError::watch(format!("invalid exclude glob {glob}"), e))
            })
            .collect::<Result<Vec<_>>>()?;

        let fs_utils = FileSystemUtils::new();
        let output = cwd.join(&request.output.file);
        let mut files: Vec<PathBuf> = OUTPUT_SIDECARS
            .iter()
            .map(|suffix| fs_utils.sibling_with_suffix(&output, suffix))
            .collect();
        files.push(output);

        let dirs = request
            .input
            .pipeline
            .stages()
            .iter()
            .filter_map(|stage| match stage {
                Stage::Transpile(options) => Some(cwd.join(&options.declaration_dir)),
                _ => None,
            })
            .collect();

        Ok(Self {
            base,
            exclude,
            files,
            dirs,
        })
    }

    pub(crate) fn is_relevant(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.base).unwrap_or(path);
        if self.exclude.iter().any(|glob| glob.matches_path(relative)) {
            return false;
        }

        // The engine's own output must never trigger another cycle.
        let written = self.files.iter().any(|file| file == path)
            || self.dirs.iter().any(|dir| path.starts_with(dir));
        !written
    }
}

/// Start watching `request` and rebuilding it through `engine`
#[instrument(skip(engine, request), fields(input = %request.input.input.display()))]
pub fn spawn_watch(engine: Arc<dyn Engine>, request: WatchRequest) -> Result<EngineWatch> {
    let cwd = std::env::current_dir()
        .map_err(|e| BundlerError::file_system("current_dir", ".", e))?;
    let root = cwd.join(&request.settings.root);
    let filter = ChangeFilter::new(root.clone(), &cwd, &request)?;

    let (change_tx, changes) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let paths: Vec<PathBuf> = events.into_iter().map(|event| event.path).collect();
            let _ = change_tx.send(paths);
        }
        Err(error) => warn!("File watcher error: {:?}", error),
    })
    .map_err(|e| BundlerError::watch("failed to initialize file watcher", e))?;

    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| BundlerError::watch(format!("failed to watch {}", root.display()), e))?;
    debug!("Watching {} for changes", root.display());

    let (events_tx, events) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_cycles(engine, request, debouncer, changes, filter, events_tx));

    Ok(EngineWatch { events, task })
}

async fn run_cycles(
    engine: Arc<dyn Engine>,
    request: WatchRequest,
    _debouncer: Debouncer<RecommendedWatcher>,
    mut changes: mpsc::UnboundedReceiver<Vec<PathBuf>>,
    filter: ChangeFilter,
    events: mpsc::UnboundedSender<EngineEvent>,
) {
    loop {
        if events.send(EngineEvent::BundleStart).is_err() {
            break;
        }
        if request.settings.clear_screen {
            print!("\x1B[2J\x1B[1;1H");
        }

        let begin = Instant::now();
        let result = match engine.build(&request.input).await {
            Ok(bundle) => bundle.write(&request.output).await,
            Err(e) => Err(e),
        };
        let event = match result {
            Ok(_) => EngineEvent::BundleEnd {
                duration: begin.elapsed(),
            },
            Err(e) => EngineEvent::Error {
                message: e.to_string(),
            },
        };
        if events.send(event).is_err() {
            break;
        }

        if !next_change(&mut changes, &filter).await {
            break;
        }
    }
    debug!("Watch cycle for {} ended", request.input.input.display());
}

/// Wait for a debounced batch with at least one relevant path.
/// Returns false once the file watcher is gone.
async fn next_change(
    changes: &mut mpsc::UnboundedReceiver<Vec<PathBuf>>,
    filter: &ChangeFilter,
) -> bool {
    while let Some(batch) = changes.recv().await {
        if let Some(path) = batch.iter().find(|path| filter.is_relevant(path)) {
            debug!("Changed: {}", path.display());
            return true;
        }
    }
    false
}
