//! Watch mode
//!
//! Registers a target with the engine's incremental-watch facility and relays
//! its lifecycle events to the status reporter. Each target gets its own
//! relay task, so status lines of one target always arrive start-then-end.

use crate::core::events::{BuildEvent, StatusReporter};
use crate::core::output::resolve_output;
use crate::core::target::TargetDescriptor;
use crate::engine::{Engine, EngineEvent, EngineWatch, InputOptions, WatchRequest, WatchSettings};
use crate::error::Result;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

/// Where a watched target is in its rebuild cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for changes
    Watching,
    /// A rebuild is in flight
    Rebuilding,
}

impl WatchState {
    pub fn next(self, event: &EngineEvent) -> Self {
        match event {
            EngineEvent::BundleStart => Self::Rebuilding,
            EngineEvent::BundleEnd { .. } | EngineEvent::Error { .. } => Self::Watching,
        }
    }
}

/// Status event for an engine lifecycle event of `target`
pub fn translate(event: &EngineEvent, target: &TargetDescriptor) -> BuildEvent {
    match event {
        EngineEvent::BundleStart => BuildEvent::Started {
            target: target.index(),
            input: target.config().input.clone(),
        },
        EngineEvent::BundleEnd { duration } => BuildEvent::Finished {
            target: target.index(),
            output: target.config().output.clone(),
            duration: *duration,
        },
        EngineEvent::Error { message } => BuildEvent::Failed {
            target: target.index(),
            message: message.clone(),
        },
    }
}

/// A live watch over one target.
///
/// Dropping or releasing the handle stops file-system monitoring for it.
#[derive(Debug)]
pub struct WatchHandle {
    target: usize,
    state: watch::Receiver<WatchState>,
    engine: JoinHandle<()>,
    relay: JoinHandle<()>,
}

impl WatchHandle {
    pub fn target(&self) -> usize {
        self.target
    }

    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Stop watching
    pub fn release(self) {
        debug!("Releasing watch for target #{}", self.target);
        drop(self);
    }

    /// Resolves once the engine stops delivering events for this target
    pub async fn closed(mut self) {
        let _ = (&mut self.relay).await;
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.engine.abort();
        self.relay.abort();
    }
}

/// Every watch started by one run, in registration order
#[derive(Debug, Default)]
pub struct WatchSession {
    handles: Vec<WatchHandle>,
}

impl WatchSession {
    pub fn push(&mut self, handle: WatchHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[WatchHandle] {
        &self.handles
    }

    /// Stop every watch in the session
    pub fn release(self) {
        for handle in self.handles {
            handle.release();
        }
    }

    /// Resolves once every watch has closed. Dropping the future early
    /// releases the watches not yet closed.
    pub async fn closed(self) {
        for handle in self.handles {
            handle.closed().await;
        }
    }
}

/// Starts watches and relays their events
#[derive(Clone)]
pub struct WatchController {
    engine: Arc<dyn Engine>,
    reporter: Arc<dyn StatusReporter>,
}

impl WatchController {
    pub fn new(engine: Arc<dyn Engine>, reporter: Arc<dyn StatusReporter>) -> Self {
        Self { engine, reporter }
    }

    /// Register `target` with the engine. Returns as soon as the
    /// subscription exists; the first build happens in the background.
    #[instrument(skip(self, target), fields(target = target.index()))]
    pub fn start_watch(&self, target: &TargetDescriptor) -> Result<WatchHandle> {
        let request = WatchRequest {
            input: InputOptions::for_target(target),
            output: resolve_output(target),
            settings: WatchSettings::default(),
        };
        let EngineWatch { mut events, task } = Arc::clone(&self.engine).watch(request)?;
        info!("Watching {}", target.config().input);

        let (state_tx, state) = watch::channel(WatchState::Watching);
        let reporter = Arc::clone(&self.reporter);
        let descriptor = target.clone();

        let relay = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                state_tx.send_modify(|state| *state = state.next(&event));
                if let EngineEvent::Error { message } = &event {
                    warn!("Rebuild of {} failed: {}", descriptor.config().input, message);
                }
                reporter.report(&translate(&event, &descriptor));
            }
            debug!("Watch for target #{} closed", descriptor.index());
        });

        Ok(WatchHandle {
            target: target.index(),
            state,
            engine: task,
            relay,
        })
    }
}
