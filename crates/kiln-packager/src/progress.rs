//! Loading-screen updates emitted while dependencies are fetched

use std::fmt;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Downloading,
    Resolving,
    Transpiling,
}

impl Phase {
    pub fn message(self) -> &'static str {
        match self {
            Phase::Downloading => "Downloading Dependencies...",
            Phase::Resolving => "Resolving Dependencies...",
            Phase::Transpiling => "Transpiling Modules...",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub message: &'static str,
    pub full_screen: bool,
}

impl ProgressEvent {
    pub fn new(phase: Phase, full_screen: bool) -> Self {
        Self {
            phase,
            message: phase.message(),
            full_screen,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Logs progress at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        info!(full_screen = event.full_screen, "{}", event.message);
    }
}
