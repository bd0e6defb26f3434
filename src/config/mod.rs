//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

use crate::capture::DEFAULT_CAPTURE_COMMAND;
use crate::export::{DEFAULT_EXPORT_CRF, DEFAULT_EXPORT_FILE};
use crate::rate::{DEFAULT_EXPORT_FRAME_RATE, DEFAULT_FRAMES_PER_MINUTE};
pub use defaults::{
    DEFAULT_OUTPUT_DIR, DEFAULT_TICK_MS, MAX_EXPORT_CRF, MAX_EXPORT_FRAME_RATE, MAX_TICK_MS,
    MIN_TICK_MS,
};

/// CLI options for the LapseTerm TUI. Validated values keep spawned commands predictable.
#[derive(Debug, Parser, Clone)]
#[command(about = "LapseTerm timelapse capture TUI", author, version)]
pub struct AppConfig {
    /// Directory that receives the numbered captures (created on startup)
    #[arg(long = "output-dir", env = "LAPSETERM_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Initial capture rate in frames per minute
    #[arg(long = "fpm", default_value_t = DEFAULT_FRAMES_PER_MINUTE)]
    pub frames_per_minute: u32,

    /// Frame rate of the generated video
    #[arg(long = "export-fps", default_value_t = DEFAULT_EXPORT_FRAME_RATE)]
    pub export_fps: u32,

    /// x264 constant rate factor for the generated video
    #[arg(long = "export-crf", default_value_t = DEFAULT_EXPORT_CRF)]
    pub export_crf: u8,

    /// Path of the generated video
    #[arg(long = "export-path", default_value = DEFAULT_EXPORT_FILE)]
    pub export_path: PathBuf,

    /// Stills command; `{path}` is replaced with the destination file
    #[arg(
        long = "capture-cmd",
        env = "LAPSETERM_CAPTURE_CMD",
        default_value = DEFAULT_CAPTURE_COMMAND
    )]
    pub capture_cmd: String,

    /// FFmpeg binary location
    #[arg(long = "ffmpeg-cmd", default_value = "ffmpeg")]
    pub ffmpeg_cmd: String,

    /// Worker polling tick (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS, hide = true)]
    pub tick_ms: u64,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "LAPSETERM_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "LAPSETERM_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Print the resolved settings and exit
    #[arg(long = "print-config", default_value_t = false)]
    pub print_config: bool,
}
