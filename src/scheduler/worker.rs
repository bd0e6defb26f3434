//! Background capture loop.
//!
//! The worker wakes once per tick, re-reads the shared session state, and takes
//! a still whenever enough running ticks have accumulated for the current rate.
//! Waiting happens on a wake channel so `stop()` interrupts the tick instead of
//! sleeping it out.

use super::events::{EventSink, SessionEventKind};
use super::state::{SharedCamera, SharedState};
use crate::capture::capture_path;
use crate::{lock_or_recover, log_debug};
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Everything the worker thread owns for one session.
pub(crate) struct WorkerContext {
    pub(crate) state: SharedState,
    pub(crate) camera: SharedCamera,
    pub(crate) output_dir: PathBuf,
    pub(crate) tick: Duration,
    pub(crate) events: EventSink,
}

/// Handle to the running capture thread.
pub(crate) struct CaptureWorker {
    handle: Option<thread::JoinHandle<()>>,
    wake_tx: Sender<()>,
}

impl CaptureWorker {
    pub(crate) fn spawn(ctx: WorkerContext) -> Result<Self> {
        let (wake_tx, wake_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("lapseterm-capture".into())
            .spawn(move || run_capture_loop(ctx, wake_rx))
            .context("failed to spawn capture worker thread")?;
        Ok(Self {
            handle: Some(handle),
            wake_tx,
        })
    }

    /// Cut the current tick short so the worker re-reads the state right away.
    pub(crate) fn wake(&self) {
        // A full channel already holds a pending wake.
        let _ = self.wake_tx.try_send(());
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the thread to exit. The caller must have set `cancelled` first.
    pub(crate) fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log_debug("capture worker panicked before exit");
            }
        }
    }
}

enum TickPlan {
    Exit,
    Paused,
    Wait,
    Capture(u64),
}

enum TickOutcome {
    Elapsed,
    Woken,
    Disconnected,
}

fn plan_tick(state: &SharedState, elapsed_ticks: u64) -> TickPlan {
    let state = lock_or_recover(state, "capture worker tick");
    if state.cancelled {
        return TickPlan::Exit;
    }
    if !state.running {
        return TickPlan::Paused;
    }
    // Re-read every tick so rate changes apply at the next boundary.
    if elapsed_ticks >= state.rate.interval_secs() {
        TickPlan::Capture(state.captured_count)
    } else {
        TickPlan::Wait
    }
}

fn wait_tick(wake_rx: &Receiver<()>, tick: Duration) -> TickOutcome {
    match wake_rx.recv_timeout(tick) {
        Err(RecvTimeoutError::Timeout) => TickOutcome::Elapsed,
        Ok(()) => TickOutcome::Woken,
        Err(RecvTimeoutError::Disconnected) => TickOutcome::Disconnected,
    }
}

fn run_capture_loop(ctx: WorkerContext, wake_rx: Receiver<()>) {
    let camera_name = lock_or_recover(&ctx.camera, "camera name")
        .name()
        .to_string();
    log_debug(&format!(
        "capture worker started (camera={camera_name}, tick={}ms, dir={})",
        ctx.tick.as_millis(),
        ctx.output_dir.display()
    ));
    let mut elapsed_ticks: u64 = 0;
    loop {
        let plan = plan_tick(&ctx.state, elapsed_ticks);
        let running = match plan {
            TickPlan::Exit => break,
            TickPlan::Paused => false,
            TickPlan::Wait => true,
            TickPlan::Capture(index) => {
                capture_one(&ctx, index);
                // Failed shots also wait a full interval before the retry.
                elapsed_ticks = 0;
                true
            }
        };
        match wait_tick(&wake_rx, ctx.tick) {
            TickOutcome::Elapsed => {
                if running {
                    elapsed_ticks += 1;
                }
            }
            TickOutcome::Woken => {}
            TickOutcome::Disconnected => {
                log_debug("capture worker lost its controller; exiting");
                break;
            }
        }
    }
    log_debug("capture worker exited");
}

fn capture_one(ctx: &WorkerContext, index: u64) {
    let path = capture_path(&ctx.output_dir, index);
    let result = {
        let mut camera = lock_or_recover(&ctx.camera, "capture device");
        camera.capture_file(&path)
    };
    match result {
        Ok(()) => {
            let committed = {
                let mut state = lock_or_recover(&ctx.state, "capture commit");
                // The shot may have finished after a pause or stop was requested.
                if state.accepts_captures() && state.captured_count == index {
                    state.captured_count += 1;
                    true
                } else {
                    false
                }
            };
            if committed {
                ctx.events
                    .emit(SessionEventKind::CapturePerformed { index, path });
            } else {
                // Keep the files on disk equal to the reported count.
                let removed = fs::remove_file(&path);
                log_debug(&format!(
                    "capture {index} finished after pause/stop; not counted, removed '{}': {removed:?}",
                    path.display()
                ));
            }
        }
        Err(err) => ctx.events.emit(SessionEventKind::CaptureFailed {
            index,
            error: format!("{err:#}"),
        }),
    }
}
