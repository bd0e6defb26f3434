use crossbeam_channel::{Receiver, TryRecvError};

use crate::log_debug;
use crate::scheduler::{SessionController, SessionEvent, StartOutcome, WorkerPhase};

/// Maximum number of lines to retain in the event log pane.
pub(super) const LOG_MAX_LINES: usize = 500;
/// The rate field accepts at most this many digits.
pub(super) const RATE_INPUT_MAX_CHARS: usize = 4;

macro_rules! state_change {
    ($self:expr, $field:ident, $value:expr) => {{
        $self.$field = $value;
        $self.request_redraw();
    }};
    ($self:expr, $body:block) => {{
        $body
        $self.request_redraw();
    }};
}

/// Which buttons are clickable and what the start button says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStates {
    pub start_label: &'static str,
    pub start_enabled: bool,
    pub pause_enabled: bool,
    pub stop_enabled: bool,
    pub generate_enabled: bool,
}

/// Front-end state: the session controller, the rate field, and the event log.
pub struct TimelapseApp {
    controller: SessionController,
    events: Receiver<SessionEvent>,
    log: Vec<String>,
    rate_input: String,
    status: String,
    /// Lines scrolled up from the newest entry; 0 follows the tail.
    scroll_back: u16,
    needs_redraw: bool,
    stopped_once: bool,
    pending_export: bool,
}

impl TimelapseApp {
    pub fn new(controller: SessionController, events: Receiver<SessionEvent>) -> Self {
        let rate_input = controller.frames_per_minute().to_string();
        Self {
            controller,
            events,
            log: Vec::new(),
            rate_input,
            status: "Ready. Press s to start capturing.".into(),
            scroll_back: 0,
            needs_redraw: true,
            stopped_once: false,
            pending_export: false,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn buttons(&self) -> ButtonStates {
        let phase = self.controller.phase();
        let has_worker = self.controller.has_worker();
        ButtonStates {
            start_label: if has_worker { "Resume" } else { "Start" },
            start_enabled: phase != WorkerPhase::Running,
            pause_enabled: phase == WorkerPhase::Running,
            stop_enabled: has_worker,
            generate_enabled: !has_worker && self.stopped_once && !self.pending_export,
        }
    }

    pub(crate) fn start(&mut self) {
        if !self.buttons().start_enabled {
            return;
        }
        match self.controller.start() {
            Ok(StartOutcome::Started) => {
                self.status = format!(
                    "Capturing one image every {}s into {}",
                    self.controller.interval_secs(),
                    self.controller.output_dir().display()
                );
            }
            Ok(StartOutcome::Resumed) => self.status = "Capture resumed.".into(),
            Ok(StartOutcome::AlreadyRunning | StartOutcome::NotStarted) => {}
            Err(err) => {
                log_debug(&format!("failed to start capture worker: {err:#}"));
                self.status = format!("Failed to start: {err:#}");
            }
        }
        self.drain_events();
        self.request_redraw();
    }

    pub(crate) fn pause(&mut self) {
        if self.controller.pause() {
            state_change!(self, status, "Paused. Press s to resume.".into());
        }
        self.drain_events();
    }

    pub(crate) fn stop(&mut self) {
        if let Some(captured) = self.controller.stop() {
            self.stopped_once = true;
            state_change!(
                self,
                status,
                format!("Stopped after {captured} images. Press g to generate the video.")
            );
        }
        self.drain_events();
    }

    /// Queue an export so the UI can show progress before the encoder blocks.
    pub(crate) fn request_export(&mut self) -> bool {
        if !self.buttons().generate_enabled {
            if self.controller.has_worker() {
                state_change!(self, status, "Stop the timelapse before generating.".into());
            }
            return false;
        }
        state_change!(self, {
            self.pending_export = true;
            self.status = "Generating timelapse...".into();
        });
        true
    }

    pub(crate) fn take_pending_export(&mut self) -> bool {
        std::mem::take(&mut self.pending_export)
    }

    /// Run the encoder on the calling thread; the outcome also arrives as log events.
    pub(crate) fn run_export(&mut self) {
        let status = match self.controller.generate_export() {
            Ok(artifact) => format!("Video written to {}", artifact.display()),
            Err(err) => format!("Generation failed: {err:#}"),
        };
        state_change!(self, status, status);
        self.drain_events();
    }

    pub(crate) fn push_rate_char(&mut self, ch: char) {
        if !ch.is_ascii_digit() || self.rate_input.len() >= RATE_INPUT_MAX_CHARS {
            return;
        }
        state_change!(self, {
            self.rate_input.push(ch);
        });
        self.apply_rate_input();
    }

    pub(crate) fn backspace_rate(&mut self) {
        if self.rate_input.pop().is_some() {
            self.request_redraw();
            self.apply_rate_input();
        }
    }

    fn apply_rate_input(&mut self) {
        let effective = self.controller.set_rate_text(&self.rate_input);
        log_debug(&format!(
            "rate input '{}' -> {effective} fpm",
            self.rate_input
        ));
        self.drain_events();
    }

    /// Move pending session events into the log pane. Returns true when anything arrived.
    pub(crate) fn drain_events(&mut self) -> bool {
        let mut lines = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => lines.extend(event.log_lines()),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log_debug("session event channel closed");
                    break;
                }
            }
        }
        if lines.is_empty() {
            return false;
        }
        self.append_log(lines);
        true
    }

    pub(super) fn append_log(&mut self, lines: Vec<String>) {
        self.log.extend(lines);
        if self.log.len() > LOG_MAX_LINES {
            let excess = self.log.len().saturating_sub(LOG_MAX_LINES);
            self.log.drain(0..excess);
        }
        self.request_redraw();
    }

    pub(crate) fn scroll_up(&mut self) {
        let limit = self.log.len().min(u16::MAX as usize) as u16;
        if self.scroll_back < limit {
            state_change!(self, scroll_back, self.scroll_back.saturating_add(1));
        }
    }

    pub(crate) fn scroll_down(&mut self) {
        if self.scroll_back > 0 {
            state_change!(self, scroll_back, self.scroll_back - 1);
        }
    }

    pub(crate) fn scroll_to_bottom(&mut self) {
        state_change!(self, scroll_back, 0);
    }

    /// Stop any active session before the process exits.
    pub fn shutdown(&mut self) {
        if self.controller.stop().is_some() {
            log_debug("session stopped on exit");
        }
        self.drain_events();
    }

    /// One-line summary of phase, count, rate and interval.
    pub(crate) fn session_summary(&self) -> String {
        format!(
            "{} | captured {} | {} fpm | every {}s",
            self.controller.phase().label(),
            self.controller.captured_count(),
            self.controller.frames_per_minute(),
            self.controller.interval_secs()
        )
    }

    pub(crate) fn status_text(&self) -> &str {
        &self.status
    }

    pub(crate) fn rate_input(&self) -> &str {
        &self.rate_input
    }

    pub(crate) fn log_lines(&self) -> &[String] {
        &self.log
    }

    pub(crate) fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    pub(crate) fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub(crate) fn take_redraw_request(&mut self) -> bool {
        let requested = self.needs_redraw;
        self.needs_redraw = false;
        requested
    }
}
