use super::*;
use crate::capture::ImageCapture;
use crate::export::{count_sequential_captures, ExportRequest, Exporter};
use crate::rate::{RateConfig, DEFAULT_FRAMES_PER_MINUTE};
use anyhow::{bail, Result};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const TICK: Duration = Duration::from_millis(20);
const WAIT_LIMIT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct CameraLog {
    calls: Arc<AtomicUsize>,
    threads: Arc<Mutex<HashSet<ThreadId>>>,
    fail_calls: Arc<Mutex<HashSet<usize>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl CameraLog {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn thread_count(&self) -> usize {
        self.threads.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn fail_call(&self, call: usize) {
        self.fail_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(call);
    }

    fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }
}

struct FakeCamera {
    log: CameraLog,
}

impl ImageCapture for FakeCamera {
    fn capture_file(&mut self, path: &Path) -> Result<()> {
        let call = self.log.calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(thread::current().id());
        let delay = *self.log.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self
            .log
            .fail_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&call)
        {
            bail!("simulated device error on call {call}");
        }
        fs::write(path, format!("frame {call}"))?;
        Ok(())
    }
}

#[derive(Clone, Default)]
struct ExportLog {
    requests: Arc<Mutex<Vec<ExportRequest>>>,
    failures_left: Arc<AtomicUsize>,
}

impl ExportLog {
    fn requests(&self) -> Vec<ExportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

struct FakeExporter {
    log: ExportLog,
}

impl Exporter for FakeExporter {
    fn export(&self, request: &ExportRequest) -> Result<()> {
        self.log
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        let failing = self
            .log
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if failing {
            bail!("encoder exited with status 1");
        }
        Ok(())
    }
}

struct Harness {
    controller: SessionController,
    events: Receiver<SessionEvent>,
    camera: CameraLog,
    exports: ExportLog,
    dir: PathBuf,
}

impl Harness {
    fn new(frames_per_minute: u32) -> Self {
        Self::with_tick(frames_per_minute, TICK)
    }

    fn with_tick(frames_per_minute: u32, tick: Duration) -> Self {
        let dir = unique_temp_dir("scheduler");
        let camera = CameraLog::default();
        let exports = ExportLog::default();
        let (sink, events) = EventSink::channel();
        let mut settings = SchedulerSettings::new(dir.join("Photos"), dir.join("output.mp4"));
        settings.rate = RateConfig::new(frames_per_minute, 24);
        settings.tick = tick;
        fs::create_dir_all(&settings.output_dir).expect("create output dir");
        let controller = SessionController::new(
            settings,
            shared_camera(FakeCamera {
                log: camera.clone(),
            }),
            Box::new(FakeExporter {
                log: exports.clone(),
            }),
            sink,
        );
        Self {
            controller,
            events,
            camera,
            exports,
            dir,
        }
    }

    fn photos(&self) -> PathBuf {
        self.dir.join("Photos")
    }

    fn event_kinds(&self) -> Vec<SessionEventKind> {
        self.events.try_iter().map(|event| event.kind).collect()
    }

    fn wait_for_count(&self, target: u64) -> bool {
        wait_for(|| self.controller.captured_count() >= target)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.controller.stop();
        let _ = fs::remove_dir_all(&self.dir);
    }
}

fn unique_temp_dir(label: &str) -> PathBuf {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = env::temp_dir().join(format!(
        "lapseterm-{label}-{}-{nanos}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_LIMIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn ticks(count: u32) -> Duration {
    TICK * count
}

#[test]
fn start_twice_keeps_a_single_worker() {
    let mut h = Harness::new(60);
    let started_at = Instant::now();
    assert_eq!(h.controller.start().expect("start"), StartOutcome::Started);
    assert_eq!(
        h.controller.start().expect("second start"),
        StartOutcome::AlreadyRunning
    );
    assert!(h.wait_for_count(3));
    let captured = h.controller.stop().expect("session was active");
    let elapsed_ticks = (started_at.elapsed().as_millis() / TICK.as_millis()) as u64;

    assert_eq!(h.camera.thread_count(), 1);
    assert!(
        captured <= elapsed_ticks + 1,
        "captured {captured} in {elapsed_ticks} ticks; cadence doubled"
    );
    let starts = h
        .event_kinds()
        .into_iter()
        .filter(|kind| *kind == SessionEventKind::SessionStarted)
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn pause_freezes_the_count() {
    let mut h = Harness::new(60);
    h.controller.start().expect("start");
    assert!(h.wait_for_count(2));
    assert!(h.controller.pause());
    assert_eq!(h.controller.phase(), WorkerPhase::Paused);
    let frozen = h.controller.captured_count();
    for _ in 0..5 {
        thread::sleep(ticks(2));
        assert_eq!(h.controller.captured_count(), frozen);
    }
    assert!(!h.controller.pause(), "second pause is a no-op");

    assert_eq!(h.controller.start().expect("resume"), StartOutcome::Resumed);
    assert!(h.wait_for_count(frozen + 1));
}

#[test]
fn stop_resets_count_and_next_start_counts_from_zero() {
    let mut h = Harness::new(60);
    h.controller.start().expect("start");
    assert!(h.wait_for_count(2));
    let final_count = h.controller.stop().expect("active session");
    assert!(final_count >= 2);
    assert_eq!(h.controller.captured_count(), 0);
    assert!(!h.controller.has_worker());
    assert_eq!(h.controller.phase(), WorkerPhase::Idle);
    assert_eq!(h.controller.stop(), None, "stop without a worker is a no-op");

    let stopped = h
        .event_kinds()
        .into_iter()
        .filter_map(|kind| match kind {
            SessionEventKind::SessionStopped { captured, .. } => Some(captured),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(stopped, vec![final_count]);

    let calls_before_restart = h.camera.calls();
    assert_eq!(h.controller.start().expect("restart"), StartOutcome::Started);
    assert!(h.wait_for_count(1));
    let first = fs::read_to_string(h.photos().join("0.jpg")).expect("0.jpg rewritten");
    let call: usize = first
        .trim_start_matches("frame ")
        .parse()
        .expect("frame marker");
    assert!(call >= calls_before_restart, "0.jpg should be overwritten");
}

#[test]
fn commands_without_a_session_are_noops() {
    let mut h = Harness::new(60);
    assert!(!h.controller.pause());
    assert_eq!(h.controller.stop(), None);
    assert_eq!(h.controller.resume(), StartOutcome::NotStarted);
    assert_eq!(h.controller.phase(), WorkerPhase::Idle);
    assert!(!h.controller.is_running());
    assert!(h.event_kinds().is_empty());
}

#[test]
fn rate_change_applies_on_the_next_tick() {
    let mut h = Harness::new(2);
    assert_eq!(h.controller.interval_secs(), 30);
    h.controller.start().expect("start");
    thread::sleep(ticks(3));
    assert_eq!(h.controller.captured_count(), 0);

    let changed_at = Instant::now();
    assert_eq!(h.controller.set_rate(60), 60);
    assert!(h.wait_for_count(1));
    assert!(
        changed_at.elapsed() < ticks(15),
        "capture took {:?}; old 30-tick interval still in effect",
        changed_at.elapsed()
    );
}

#[test]
fn sixty_per_minute_captures_once_per_tick() {
    let tick = Duration::from_millis(50);
    let mut h = Harness::with_tick(60, tick);
    h.controller.start().expect("start");
    thread::sleep(tick * 10);
    h.controller.pause();
    let captured = h.controller.captured_count();
    assert!(
        (6..=11).contains(&captured),
        "expected about 10 captures in 10 ticks, got {captured}"
    );
}

#[test]
fn capture_failure_is_reported_and_loop_continues() {
    let mut h = Harness::new(60);
    h.camera.fail_call(0);
    h.controller.start().expect("start");
    assert!(h.wait_for_count(2));
    h.controller.stop();

    let kinds = h.event_kinds();
    let failed_at = kinds
        .iter()
        .position(|kind| matches!(kind, SessionEventKind::CaptureFailed { index: 0, .. }))
        .expect("failure event");
    let first_capture = kinds
        .iter()
        .position(|kind| matches!(kind, SessionEventKind::CapturePerformed { index: 0, .. }))
        .expect("retry succeeded");
    assert!(failed_at < first_capture);
    assert!(h.photos().join("0.jpg").exists());
    assert!(h.photos().join("1.jpg").exists());
}

#[test]
fn capture_finishing_after_pause_is_not_counted() {
    let mut h = Harness::new(60);
    h.camera.set_delay(Some(ticks(5)));
    h.controller.start().expect("start");
    assert!(wait_for(|| h.camera.calls() >= 1));
    h.controller.pause();
    thread::sleep(ticks(8));
    assert_eq!(h.controller.captured_count(), 0);
    assert_eq!(count_sequential_captures(&h.photos()), 0);
    assert!(h
        .event_kinds()
        .iter()
        .all(|kind| !matches!(kind, SessionEventKind::CapturePerformed { .. })));
}

#[test]
fn capture_finishing_after_stop_leaves_no_extra_frame() {
    let mut h = Harness::new(60);
    h.camera.set_delay(Some(ticks(5)));
    h.controller.start().expect("start");
    assert!(wait_for(|| h.camera.calls() >= 1));
    // Stop joins the worker, so the slow shot has finished by the time it returns.
    assert_eq!(h.controller.stop(), Some(0));
    assert_eq!(count_sequential_captures(&h.photos()), 0);
    assert!(!h.photos().join("0.jpg").exists());

    h.camera.set_delay(None);
    h.controller.generate_export().expect("export");
    let frames = h.event_kinds().into_iter().find_map(|kind| match kind {
        SessionEventKind::ExportStarted { frames, .. } => Some(frames),
        _ => None,
    });
    assert_eq!(frames, Some(0));
}

#[test]
fn stop_interrupts_the_current_tick() {
    let mut h = Harness::with_tick(DEFAULT_FRAMES_PER_MINUTE, Duration::from_secs(1));
    h.controller.start().expect("start");
    thread::sleep(Duration::from_millis(50));
    let stopping = Instant::now();
    assert_eq!(h.controller.stop(), Some(0));
    assert!(
        stopping.elapsed() < Duration::from_millis(500),
        "stop waited {:?}",
        stopping.elapsed()
    );
}

#[test]
fn rate_input_falls_back_and_reports_only_changes() {
    let mut h = Harness::new(DEFAULT_FRAMES_PER_MINUTE);
    assert_eq!(h.controller.set_rate_text("abc"), 2);
    assert_eq!(h.controller.set_rate_text("10"), 10);
    assert_eq!(h.controller.frames_per_minute(), 10);
    assert_eq!(h.controller.set_rate_text(""), 2);
    assert_eq!(h.controller.set_rate(-3), 2);
    assert_eq!(h.controller.set_rate_text("0"), 2);
    assert_eq!(h.controller.interval_secs(), 30);
    assert_eq!(
        h.event_kinds(),
        vec![
            SessionEventKind::RateChanged { from: 2, to: 10 },
            SessionEventKind::RateChanged { from: 10, to: 2 },
        ]
    );
}

#[test]
fn export_waits_for_stop_and_reports_outcome() {
    let mut h = Harness::new(60);
    h.controller.start().expect("start");
    assert!(h.wait_for_count(1));
    assert!(h.controller.generate_export().is_err());
    assert!(h.exports.requests().is_empty());
    h.controller.stop();
    let _ = h.event_kinds();

    h.exports.failures_left.store(1, Ordering::SeqCst);
    assert!(h.controller.generate_export().is_err());
    let artifact = h.controller.generate_export().expect("retry succeeds");
    assert_eq!(artifact, h.dir.join("output.mp4"));

    let requests = h.exports.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].input_dir, h.photos());
    assert_eq!(requests[1].frame_rate, 24);

    let kinds = h.event_kinds();
    assert!(matches!(kinds[0], SessionEventKind::ExportStarted { .. }));
    assert!(matches!(kinds[1], SessionEventKind::ExportFailed { .. }));
    assert!(matches!(kinds[2], SessionEventKind::ExportStarted { .. }));
    assert_eq!(
        kinds[3],
        SessionEventKind::ExportCompleted {
            artifact: h.dir.join("output.mp4")
        }
    );
}

#[test]
fn dropping_the_controller_stops_the_worker() {
    let camera_log = CameraLog::default();
    let (sink, _events) = EventSink::channel();
    let photos = unique_temp_dir("drop");
    let mut settings = SchedulerSettings::new(&photos, photos.join("out.mp4"));
    settings.rate = RateConfig::new(60, 24);
    settings.tick = TICK;
    let mut controller = SessionController::new(
        settings,
        shared_camera(FakeCamera {
            log: camera_log.clone(),
        }),
        Box::new(FakeExporter {
            log: ExportLog::default(),
        }),
        sink,
    );
    controller.start().expect("start");
    assert!(wait_for(|| camera_log.calls() >= 1));
    drop(controller);
    let after_drop = camera_log.calls();
    thread::sleep(ticks(5));
    assert_eq!(camera_log.calls(), after_drop);
    let _ = fs::remove_dir_all(photos);
}

#[test]
fn phases_follow_the_session_lifecycle() {
    let mut h = Harness::new(DEFAULT_FRAMES_PER_MINUTE);
    assert_eq!(h.controller.phase(), WorkerPhase::Idle);
    h.controller.start().expect("start");
    assert_eq!(h.controller.phase(), WorkerPhase::Running);
    assert!(h.controller.phase().is_armed());
    h.controller.pause();
    assert_eq!(h.controller.phase(), WorkerPhase::Paused);
    h.controller.resume();
    assert_eq!(h.controller.phase(), WorkerPhase::Running);
    h.controller.stop();
    assert_eq!(h.controller.phase(), WorkerPhase::Idle);
    assert!(!h.controller.phase().is_armed());
}

#[test]
fn full_session_start_pause_resume_stop_export() {
    let mut h = Harness::new(DEFAULT_FRAMES_PER_MINUTE);
    h.controller.set_rate(60);
    h.controller.start().expect("start");
    assert!(h.wait_for_count(3));
    h.controller.pause();
    let after_first_run = h.controller.captured_count();
    assert!(after_first_run >= 3);
    for index in 0..3 {
        assert!(h.photos().join(format!("{index}.jpg")).exists());
    }

    thread::sleep(ticks(3));
    assert_eq!(h.controller.captured_count(), after_first_run);

    assert_eq!(h.controller.start().expect("resume"), StartOutcome::Resumed);
    assert!(h.wait_for_count(after_first_run + 2));
    let total = h.controller.stop().expect("active session");
    assert!(total >= 5);
    assert_eq!(h.controller.captured_count(), 0);
    assert!(!h.controller.has_worker());

    let artifact = h.controller.generate_export().expect("export");
    let requests = h.exports.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].artifact, artifact);
    assert_eq!(count_sequential_captures(&h.photos()), total);

    let kinds = h.event_kinds();
    let order: Vec<&str> = kinds
        .iter()
        .filter_map(|kind| match kind {
            SessionEventKind::RateChanged { .. } => Some("rate"),
            SessionEventKind::SessionStarted => Some("start"),
            SessionEventKind::SessionPaused => Some("pause"),
            SessionEventKind::SessionResumed => Some("resume"),
            SessionEventKind::SessionStopped { .. } => Some("stop"),
            SessionEventKind::ExportStarted { .. } => Some("export"),
            SessionEventKind::ExportCompleted { .. } => Some("done"),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        vec!["rate", "start", "pause", "resume", "stop", "export", "done"]
    );
    match kinds.iter().find(|k| matches!(k, SessionEventKind::ExportStarted { .. })) {
        Some(SessionEventKind::ExportStarted { frames, .. }) => assert!(*frames >= total),
        other => panic!("expected export start, got {other:?}"),
    }
}
