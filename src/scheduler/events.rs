use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::PathBuf;

/// Lifecycle and capture events reported by the controller and the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    RateChanged { from: u32, to: u32 },
    SessionStarted,
    SessionResumed,
    SessionPaused,
    SessionStopped { captured: u64, output_dir: PathBuf },
    CapturePerformed { index: u64, path: PathBuf },
    CaptureFailed { index: u64, error: String },
    ExportStarted { frames: u64, artifact: PathBuf },
    ExportCompleted { artifact: PathBuf },
    ExportFailed { error: String },
}

impl SessionEventKind {
    /// Human-readable lines for the log pane, without timestamps.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SessionEventKind::RateChanged { from, to } => {
                vec![format!("FPM updated from {from} to {to}")]
            }
            SessionEventKind::SessionStarted => vec!["Timelapse started".into()],
            SessionEventKind::SessionResumed => vec!["Timelapse resumed".into()],
            SessionEventKind::SessionPaused => vec!["Timelapse paused".into()],
            SessionEventKind::SessionStopped {
                captured,
                output_dir,
            } => vec![
                "Timelapse stopped".into(),
                format!("Total images captured: {captured}"),
                format!("Images saved in {}", output_dir.display()),
                "WARNING: starting a new timelapse overwrites the previous images".into(),
            ],
            SessionEventKind::CapturePerformed { index, .. } => {
                vec![format!("Captured image {index}")]
            }
            SessionEventKind::CaptureFailed { index, error } => {
                vec![format!("Capture of image {index} failed: {error}")]
            }
            SessionEventKind::ExportStarted { frames, .. } => {
                vec![format!("Starting timelapse generation ({frames} frames)")]
            }
            SessionEventKind::ExportCompleted { artifact } => vec![format!(
                "Timelapse generation completed: {}",
                artifact.display()
            )],
            SessionEventKind::ExportFailed { error } => {
                vec![format!("Timelapse generation failed: {error}")]
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SessionEventKind::RateChanged { .. } => "rate_changed",
            SessionEventKind::SessionStarted => "session_started",
            SessionEventKind::SessionResumed => "session_resumed",
            SessionEventKind::SessionPaused => "session_paused",
            SessionEventKind::SessionStopped { .. } => "session_stopped",
            SessionEventKind::CapturePerformed { .. } => "capture_performed",
            SessionEventKind::CaptureFailed { .. } => "capture_failed",
            SessionEventKind::ExportStarted { .. } => "export_started",
            SessionEventKind::ExportCompleted { .. } => "export_completed",
            SessionEventKind::ExportFailed { .. } => "export_failed",
        }
    }
}

/// A timestamped event.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub at: DateTime<Local>,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn now(kind: SessionEventKind) -> Self {
        Self {
            at: Local::now(),
            kind,
        }
    }

    /// `HH:MM:SS - message` lines, one per message.
    pub fn log_lines(&self) -> Vec<String> {
        let stamp = self.at.format("%H:%M:%S");
        self.kind
            .messages()
            .into_iter()
            .map(|message| format!("{stamp} - {message}"))
            .collect()
    }
}

/// Sending half of the log sink. Cloned into the worker thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<SessionEvent>>,
}

impl EventSink {
    /// Create a sink plus the receiver the front-end drains.
    pub fn channel() -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that only traces.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, kind: SessionEventKind) {
        match &kind {
            SessionEventKind::CaptureFailed { .. } | SessionEventKind::ExportFailed { .. } => {
                tracing::warn!(event = kind.label(), detail = ?kind, "session event");
            }
            _ => tracing::info!(event = kind.label(), detail = ?kind, "session event"),
        }
        crate::log_debug(&format!("event|{}", kind.messages().join(" | ")));
        if let Some(tx) = &self.tx {
            // A closed receiver means the front-end is gone; keep running regardless.
            let _ = tx.send(SessionEvent::now(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_lines_are_timestamped() {
        let at = Local
            .with_ymd_and_hms(2024, 5, 1, 9, 4, 7)
            .single()
            .expect("valid local time");
        let event = SessionEvent {
            at,
            kind: SessionEventKind::RateChanged { from: 2, to: 60 },
        };
        assert_eq!(event.log_lines(), vec!["09:04:07 - FPM updated from 2 to 60"]);
    }

    #[test]
    fn stop_event_reports_count_and_location() {
        let kind = SessionEventKind::SessionStopped {
            captured: 5,
            output_dir: PathBuf::from("/home/pi/Photos"),
        };
        let lines = kind.messages();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains('5'));
        assert!(lines[2].contains("/home/pi/Photos"));
        assert!(lines[3].starts_with("WARNING"));
    }

    #[test]
    fn sink_delivers_in_order_and_survives_closed_receiver() {
        let (sink, rx) = EventSink::channel();
        sink.emit(SessionEventKind::SessionStarted);
        sink.emit(SessionEventKind::SessionPaused);
        let kinds: Vec<_> = rx.try_iter().map(|event| event.kind).collect();
        assert_eq!(
            kinds,
            vec![SessionEventKind::SessionStarted, SessionEventKind::SessionPaused]
        );
        drop(rx);
        sink.emit(SessionEventKind::SessionResumed);
        EventSink::disabled().emit(SessionEventKind::SessionStarted);
    }
}
