use crate::capture::ImageCapture;
use crate::rate::RateConfig;
use std::sync::{Arc, Mutex};

/// Flags and counters shared by the controller and the capture worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionState {
    pub(crate) running: bool,
    pub(crate) cancelled: bool,
    pub(crate) captured_count: u64,
    pub(crate) rate: RateConfig,
}

impl SessionState {
    pub(crate) fn new(rate: RateConfig) -> Self {
        Self {
            running: false,
            cancelled: false,
            captured_count: 0,
            rate,
        }
    }

    /// Captures only count while the session is running and not being torn down.
    pub(crate) fn accepts_captures(&self) -> bool {
        self.running && !self.cancelled
    }
}

pub(crate) type SharedState = Arc<Mutex<SessionState>>;

/// Capture device shared across sessions; only the active worker uses it.
pub type SharedCamera = Arc<Mutex<dyn ImageCapture + Send>>;

/// Wrap a concrete device for use by [`SessionController`](super::SessionController).
pub fn shared_camera<C>(camera: C) -> SharedCamera
where
    C: ImageCapture + Send + 'static,
{
    Arc::new(Mutex::new(camera))
}

/// Observable worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    Running,
    Paused,
    Terminated,
}

impl WorkerPhase {
    pub fn label(self) -> &'static str {
        match self {
            WorkerPhase::Idle => "idle",
            WorkerPhase::Running => "running",
            WorkerPhase::Paused => "paused",
            WorkerPhase::Terminated => "terminated",
        }
    }

    /// Worker exists and has not been cancelled.
    pub fn is_armed(self) -> bool {
        matches!(self, WorkerPhase::Running | WorkerPhase::Paused)
    }
}
