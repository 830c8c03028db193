//! Build status events and their reporters

use ansi_term::Colour;
use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

/// Events emitted while targets build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A build of the target started
    Started { target: usize, input: String },

    /// The target's artifacts were written
    Finished {
        target: usize,
        output: String,
        duration: Duration,
    },

    /// A watched rebuild failed; watching goes on
    Failed { target: usize, message: String },
}

impl BuildEvent {
    /// Index of the target the event belongs to
    pub fn target(&self) -> usize {
        match self {
            Self::Started { target, .. }
            | Self::Finished { target, .. }
            | Self::Failed { target, .. } => *target,
        }
    }

    /// Uncoloured status line
    pub fn status_line(&self) -> String {
        match self {
            Self::Started { input, .. } => format!("~> Bundling {input}"),
            Self::Finished {
                output, duration, ..
            } => format!("~> Created {output} [{} ms]", duration.as_millis()),
            Self::Failed { message, .. } => format!("~> Failed: {message}"),
        }
    }
}

/// Consumes build events
pub trait StatusReporter: Send + Sync {
    fn report(&self, event: &BuildEvent);
}

/// Prints coloured status lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn report(&self, event: &BuildEvent) {
        let colour = match event {
            BuildEvent::Started { .. } => Colour::Yellow,
            BuildEvent::Finished { .. } => Colour::Green,
            BuildEvent::Failed { .. } => Colour::Red,
        };
        println!("{}", colour.paint(event.status_line()));
    }
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpReporter;

impl StatusReporter for NoOpReporter {
    fn report(&self, _event: &BuildEvent) {}
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<BuildEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, event: &BuildEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
