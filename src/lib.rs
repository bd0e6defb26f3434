pub mod app;
pub mod capture;
pub mod config;
pub mod export;
mod lock;
pub mod rate;
pub mod scheduler;
pub mod telemetry;
pub mod terminal;
pub mod ui;

pub(crate) use lock::lock_or_recover;
pub use app::{
    crash_log_path, init_logging, log_debug, log_file_path, log_panic, ButtonStates, TimelapseApp,
};
