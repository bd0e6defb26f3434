//! Front-end state for the timelapse TUI.
//!
//! Maps the Start/Resume, Pause, Stop and Generate buttons onto the session
//! controller and keeps the scrolling event log the renderer draws.

mod logging;
mod state;

#[cfg(test)]
pub(crate) use logging::set_logging_for_tests;
pub use logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use state::{ButtonStates, TimelapseApp};
