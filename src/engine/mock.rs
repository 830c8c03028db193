//! In-memory engine for exercising the orchestration core

use super::{Bundle, Engine, EngineEvent, EngineWatch, InputOptions, WatchRequest};
use crate::core::output::OutputOptions;
use crate::error::{BundlerError, Result};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::mpsc;

/// Calls observed by a [`MockEngine`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Build { input: PathBuf },
    WriteStarted { file: PathBuf },
    WriteFinished { file: PathBuf },
    Watch { input: PathBuf },
}

#[derive(Default)]
struct MockState {
    calls: Vec<EngineCall>,
    failing_inputs: HashSet<PathBuf>,
    write_delays: HashMap<PathBuf, Duration>,
    watchers: Vec<mpsc::UnboundedSender<EngineEvent>>,
}

/// Engine that records calls instead of bundling
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the build phase of `input` fail
    pub fn fail_on(&self, input: impl Into<PathBuf>) {
        self.lock().failing_inputs.insert(input.into());
    }

    /// Delay the write phase of `file`
    pub fn delay_write(&self, file: impl Into<PathBuf>, delay: Duration) {
        self.lock().write_delays.insert(file.into(), delay);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn build_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, EngineCall::Build { .. }))
            .count()
    }

    /// Push a lifecycle event into the `n`th registered watch.
    /// Returns false when no such watch is listening.
    pub fn emit(&self, n: usize, event: EngineEvent) -> bool {
        self.lock()
            .watchers
            .get(n)
            .is_some_and(|sender| sender.send(event).is_ok())
    }

    /// Close every registered watch's event stream
    pub fn close_watches(&self) {
        self.lock().watchers.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: EngineCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn build(&self, options: &InputOptions) -> Result<Box<dyn Bundle>> {
        self.record(EngineCall::Build {
            input: options.input.clone(),
        });
        if self.lock().failing_inputs.contains(&options.input) {
            return Err(BundlerError::pipeline(format!(
                "could not resolve entry module {}",
                options.input.display()
            )));
        }
        Ok(Box::new(MockBundle {
            engine: self.clone(),
        }))
    }

    fn watch(self: Arc<Self>, request: WatchRequest) -> Result<EngineWatch> {
        let (sender, events) = mpsc::unbounded_channel();
        self.record(EngineCall::Watch {
            input: request.input.input.clone(),
        });
        self.lock().watchers.push(sender);
        let task = tokio::spawn(std::future::pending::<()>());
        Ok(EngineWatch { events, task })
    }
}

struct MockBundle {
    engine: MockEngine,
}

#[async_trait]
impl Bundle for MockBundle {
    async fn write(&self, output: &OutputOptions) -> Result<Vec<PathBuf>> {
        self.engine.record(EngineCall::WriteStarted {
            file: output.file.clone(),
        });
        let delay = self.engine.lock().write_delays.get(&output.file).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.engine.record(EngineCall::WriteFinished {
            file: output.file.clone(),
        });
        Ok(vec![output.file.clone()])
    }
}
