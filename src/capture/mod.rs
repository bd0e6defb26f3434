//! Image capture collaborators.
//!
//! The scheduler only needs "write one still to this path"; everything about the
//! device lives behind [`ImageCapture`].

mod command;

pub use command::{CommandCapture, DEFAULT_CAPTURE_COMMAND, PATH_PLACEHOLDER};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// File extension used for every captured still.
pub const CAPTURE_EXTENSION: &str = "jpg";

/// A device that can write a single still image to disk.
pub trait ImageCapture {
    /// Capture one frame into `path`, overwriting any existing file.
    fn capture_file(&mut self, path: &Path) -> Result<()>;

    /// Short name shown in logs.
    fn name(&self) -> &str {
        "camera"
    }
}

/// Sequential, zero-based file name for capture number `index`.
pub fn capture_path(output_dir: &Path, index: u64) -> PathBuf {
    output_dir.join(format!("{index}.{CAPTURE_EXTENSION}"))
}

/// ffmpeg-style input pattern matching the names produced by [`capture_path`].
pub fn sequence_pattern(output_dir: &Path) -> PathBuf {
    output_dir.join(format!("%d.{CAPTURE_EXTENSION}"))
}
