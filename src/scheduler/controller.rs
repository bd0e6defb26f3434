use super::events::{EventSink, SessionEventKind};
use super::state::{SessionState, SharedCamera, SharedState, WorkerPhase};
use super::worker::{CaptureWorker, WorkerContext};
use crate::export::{count_sequential_captures, ExportRequest, Exporter};
use crate::rate::{parse_frames_per_minute, validate_frames_per_minute, RateConfig};
use crate::{lock_or_recover, log_debug};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default polling granularity of the capture worker.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Static settings for a controller instance.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Directory receiving `0.jpg`, `1.jpg`, ...; must already exist.
    pub output_dir: PathBuf,
    /// Where `generate_export` writes the video.
    pub export_artifact: PathBuf,
    pub rate: RateConfig,
    pub tick: Duration,
}

impl SchedulerSettings {
    pub fn new(output_dir: impl Into<PathBuf>, export_artifact: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            export_artifact: export_artifact.into(),
            rate: RateConfig::default(),
            tick: DEFAULT_TICK,
        }
    }
}

/// What `start()` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    Resumed,
    AlreadyRunning,
    /// `resume()` without a session.
    NotStarted,
}

/// Command surface for a capture session. Owns the worker's lifecycle.
pub struct SessionController {
    settings: SchedulerSettings,
    state: SharedState,
    camera: SharedCamera,
    exporter: Box<dyn Exporter + Send>,
    events: EventSink,
    worker: Option<CaptureWorker>,
}

impl SessionController {
    pub fn new(
        settings: SchedulerSettings,
        camera: SharedCamera,
        exporter: Box<dyn Exporter + Send>,
        events: EventSink,
    ) -> Self {
        let state = Arc::new(Mutex::new(SessionState::new(settings.rate)));
        Self {
            settings,
            state,
            camera,
            exporter,
            events,
            worker: None,
        }
    }

    /// Begin a session, or resume the current one. Never spawns a second worker.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if let Some(worker) = self.worker.as_ref() {
            if !worker.is_finished() {
                return Ok(self.resume());
            }
            // A dead worker cannot be restarted; reap it and start fresh.
            log_debug("capture worker found terminated; replacing it");
            if let Some(worker) = self.worker.take() {
                worker.join();
            }
            let mut state = lock_or_recover(&self.state, "start reset");
            state.cancelled = false;
            state.captured_count = 0;
        }

        {
            let mut state = lock_or_recover(&self.state, "start");
            state.running = true;
            state.cancelled = false;
        }
        let ctx = WorkerContext {
            state: self.state.clone(),
            camera: self.camera.clone(),
            output_dir: self.settings.output_dir.clone(),
            tick: self.settings.tick,
            events: self.events.clone(),
        };
        match CaptureWorker::spawn(ctx) {
            Ok(worker) => self.worker = Some(worker),
            Err(err) => {
                lock_or_recover(&self.state, "start rollback").running = false;
                return Err(err);
            }
        }
        self.events.emit(SessionEventKind::SessionStarted);
        Ok(StartOutcome::Started)
    }

    /// Continue a paused session. Without a worker this does nothing.
    pub fn resume(&mut self) -> StartOutcome {
        if self.worker.is_none() {
            return StartOutcome::NotStarted;
        }
        let was_running = {
            let mut state = lock_or_recover(&self.state, "resume");
            std::mem::replace(&mut state.running, true)
        };
        if was_running {
            StartOutcome::AlreadyRunning
        } else {
            self.events.emit(SessionEventKind::SessionResumed);
            StartOutcome::Resumed
        }
    }

    /// Pause capturing; the count is kept. Returns false when there is nothing to pause.
    pub fn pause(&mut self) -> bool {
        if self.worker.is_none() {
            return false;
        }
        let was_running = {
            let mut state = lock_or_recover(&self.state, "pause");
            std::mem::replace(&mut state.running, false)
        };
        if was_running {
            self.events.emit(SessionEventKind::SessionPaused);
        }
        was_running
    }

    /// End the session: cancel and join the worker, then reset the count.
    ///
    /// Returns the final capture count, or `None` when no session was active.
    pub fn stop(&mut self) -> Option<u64> {
        let worker = self.worker.take()?;
        {
            let mut state = lock_or_recover(&self.state, "stop");
            state.running = false;
            state.cancelled = true;
        }
        worker.wake();
        worker.join();
        let captured = {
            let mut state = lock_or_recover(&self.state, "stop reset");
            let captured = state.captured_count;
            state.captured_count = 0;
            state.cancelled = false;
            captured
        };
        self.events.emit(SessionEventKind::SessionStopped {
            captured,
            output_dir: self.settings.output_dir.clone(),
        });
        Some(captured)
    }

    /// Apply a textual rate; invalid text becomes the default rate.
    pub fn set_rate_text(&mut self, text: &str) -> u32 {
        self.apply_rate(parse_frames_per_minute(text))
    }

    /// Apply a numeric rate; non-positive values become the default rate.
    pub fn set_rate(&mut self, frames_per_minute: i64) -> u32 {
        self.apply_rate(validate_frames_per_minute(frames_per_minute))
    }

    fn apply_rate(&mut self, effective: u32) -> u32 {
        let previous = {
            let mut state = lock_or_recover(&self.state, "set rate");
            std::mem::replace(&mut state.rate.frames_per_minute, effective)
        };
        if previous != effective {
            self.events.emit(SessionEventKind::RateChanged {
                from: previous,
                to: effective,
            });
        }
        effective
    }

    /// Encode the captured sequence into the export artifact. Blocks until done.
    pub fn generate_export(&mut self) -> Result<PathBuf> {
        if self.worker.is_some() {
            let error = "stop the timelapse before generating a video".to_string();
            self.events.emit(SessionEventKind::ExportFailed {
                error: error.clone(),
            });
            bail!(error);
        }
        let request = ExportRequest {
            input_dir: self.settings.output_dir.clone(),
            frame_rate: self.export_frame_rate(),
            artifact: self.settings.export_artifact.clone(),
        };
        self.events.emit(SessionEventKind::ExportStarted {
            frames: count_sequential_captures(&request.input_dir),
            artifact: request.artifact.clone(),
        });
        match self.exporter.export(&request) {
            Ok(()) => {
                self.events.emit(SessionEventKind::ExportCompleted {
                    artifact: request.artifact.clone(),
                });
                Ok(request.artifact)
            }
            Err(err) => {
                self.events.emit(SessionEventKind::ExportFailed {
                    error: format!("{err:#}"),
                });
                Err(err)
            }
        }
    }

    pub fn captured_count(&self) -> u64 {
        lock_or_recover(&self.state, "captured count").captured_count
    }

    pub fn frames_per_minute(&self) -> u32 {
        lock_or_recover(&self.state, "frames per minute")
            .rate
            .frames_per_minute
    }

    pub fn export_frame_rate(&self) -> u32 {
        lock_or_recover(&self.state, "export frame rate")
            .rate
            .export_frame_rate
    }

    pub fn interval_secs(&self) -> u64 {
        lock_or_recover(&self.state, "interval").rate.interval_secs()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some() && lock_or_recover(&self.state, "is running").running
    }

    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    pub fn phase(&self) -> WorkerPhase {
        match &self.worker {
            None => WorkerPhase::Idle,
            Some(worker) if worker.is_finished() => WorkerPhase::Terminated,
            Some(_) => {
                let state = lock_or_recover(&self.state, "phase");
                if state.cancelled {
                    WorkerPhase::Terminated
                } else if state.running {
                    WorkerPhase::Running
                } else {
                    WorkerPhase::Paused
                }
            }
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    pub fn export_artifact(&self) -> &Path {
        &self.settings.export_artifact
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.worker.is_some() {
            log_debug("session controller dropped with an active worker; stopping");
            self.stop();
        }
    }
}
