//! Capture scheduling: the session controller, its shared state, and the
//! background worker that turns the live rate into timed captures.

mod controller;
mod events;
mod state;
#[cfg(test)]
mod tests;
mod worker;

pub use controller::{SchedulerSettings, SessionController, StartOutcome, DEFAULT_TICK};
pub use events::{EventSink, SessionEvent, SessionEventKind};
pub use state::{shared_camera, SharedCamera, WorkerPhase};
