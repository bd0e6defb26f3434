//! Video assembly over a directory of sequentially numbered captures.
//!
//! The encoder runs synchronously; callers block until it exits.

use crate::capture::sequence_pattern;
use crate::log_debug;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

pub const DEFAULT_EXPORT_CRF: u8 = 20;
pub const DEFAULT_EXPORT_FILE: &str = "output.mp4";

/// Everything the encoder needs for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub input_dir: PathBuf,
    pub frame_rate: u32,
    pub artifact: PathBuf,
}

/// Builds one video artifact from the capture directory.
pub trait Exporter {
    fn export(&self, request: &ExportRequest) -> Result<()>;
}

/// Runs ffmpeg with an H.264 high-profile encode.
#[derive(Debug, Clone)]
pub struct FfmpegExporter {
    ffmpeg_cmd: String,
    crf: u8,
}

impl FfmpegExporter {
    pub fn new(ffmpeg_cmd: impl Into<String>, crf: u8) -> Self {
        Self {
            ffmpeg_cmd: ffmpeg_cmd.into(),
            crf,
        }
    }

    pub fn command_args(&self, request: &ExportRequest) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            // Each export replaces the previous artifact.
            "-y".into(),
            "-framerate".into(),
            request.frame_rate.to_string(),
            "-i".into(),
            sequence_pattern(&request.input_dir)
                .to_string_lossy()
                .into_owned(),
            "-c:v".into(),
            "libx264".into(),
            "-profile:v".into(),
            "high".into(),
            "-crf".into(),
            self.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            request.artifact.to_string_lossy().into_owned(),
        ]
    }
}

impl Default for FfmpegExporter {
    fn default() -> Self {
        Self::new("ffmpeg", DEFAULT_EXPORT_CRF)
    }
}

impl Exporter for FfmpegExporter {
    fn export(&self, request: &ExportRequest) -> Result<()> {
        let args = self.command_args(request);
        log_debug(&format!("export: {} {}", self.ffmpeg_cmd, args.join(" ")));
        let started = Instant::now();
        let output = Command::new(&self.ffmpeg_cmd)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run '{}'", self.ffmpeg_cmd))?;
        let elapsed_ms = started.elapsed().as_millis();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = %output.status, elapsed_ms, "export failed");
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.ffmpeg_cmd,
                output.status,
                stderr.trim()
            ));
        }
        tracing::info!(
            artifact = %request.artifact.display(),
            frame_rate = request.frame_rate,
            elapsed_ms,
            "export finished"
        );
        Ok(())
    }
}

/// Number of leading sequential captures (`0.jpg`, `1.jpg`, ...) in `dir`.
pub fn count_sequential_captures(dir: &Path) -> u64 {
    let mut count = 0;
    while crate::capture::capture_path(dir, count).exists() {
        count += 1;
    }
    count
}
