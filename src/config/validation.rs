use super::defaults::{
    CAPTURE_BINARIES, FFMPEG_BINARIES, MAX_CAPTURE_COMMAND_BYTES, MAX_EXPORT_CRF,
    MAX_EXPORT_FRAME_RATE, MAX_TICK_MS, MIN_TICK_MS,
};
use super::AppConfig;
use crate::capture::CommandCapture;
use crate::export::FfmpegExporter;
use crate::rate::RateConfig;
use crate::scheduler::SchedulerSettings;
use anyhow::{anyhow, bail, Context, Result};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

impl AppConfig {
    /// Check CLI values and normalize paths.
    pub fn validate(&mut self) -> Result<()> {
        if self.frames_per_minute == 0 {
            bail!("--fpm must be a positive integer");
        }
        if !(1..=MAX_EXPORT_FRAME_RATE).contains(&self.export_fps) {
            bail!(
                "--export-fps must be between 1 and {MAX_EXPORT_FRAME_RATE}, got {}",
                self.export_fps
            );
        }
        if self.export_crf > MAX_EXPORT_CRF {
            bail!(
                "--export-crf must be between 0 and {MAX_EXPORT_CRF}, got {}",
                self.export_crf
            );
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }

        if self.capture_cmd.len() > MAX_CAPTURE_COMMAND_BYTES {
            bail!("--capture-cmd exceeds {MAX_CAPTURE_COMMAND_BYTES} bytes");
        }
        if self.capture_cmd.chars().any(|ch| matches!(ch, '\n' | '\r')) {
            bail!("--capture-cmd must be a single line");
        }
        let capture = CommandCapture::from_command_line(&self.capture_cmd)?;
        let program = sanitize_binary(capture.program(), "--capture-cmd", CAPTURE_BINARIES)?;
        self.capture_cmd = capture.with_program(program).to_command_line();
        self.ffmpeg_cmd = sanitize_binary(&self.ffmpeg_cmd, "--ffmpeg-cmd", FFMPEG_BINARIES)?;

        if self.output_dir.as_os_str().is_empty() {
            bail!("--output-dir must not be empty");
        }
        self.output_dir = absolutize(&self.output_dir)?;
        if self.output_dir.is_file() {
            bail!(
                "--output-dir '{}' is a file, expected a directory",
                self.output_dir.display()
            );
        }
        if self.export_path.as_os_str().is_empty() || self.export_path.is_dir() {
            bail!("--export-path must name a file");
        }
        self.export_path = absolutize(&self.export_path)?;

        Ok(())
    }

    pub fn rate_config(&self) -> RateConfig {
        RateConfig::new(self.frames_per_minute, self.export_fps)
    }

    /// Snapshot the scheduler-facing settings.
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        let mut settings = SchedulerSettings::new(&self.output_dir, &self.export_path);
        settings.rate = self.rate_config();
        settings.tick = Duration::from_millis(self.tick_ms);
        settings
    }

    pub fn capture_device(&self) -> Result<CommandCapture> {
        CommandCapture::from_command_line(&self.capture_cmd)
    }

    pub fn exporter(&self) -> FfmpegExporter {
        FfmpegExporter::new(self.ffmpeg_cmd.clone(), self.export_crf)
    }

    /// Human-readable settings dump for `--print-config`.
    pub fn render_summary(&self) -> String {
        let rate = self.rate_config();
        let rows = [
            ("output_dir", self.output_dir.display().to_string()),
            ("frames_per_minute", rate.frames_per_minute.to_string()),
            ("capture_interval_s", rate.interval_secs().to_string()),
            ("export_fps", rate.export_frame_rate.to_string()),
            ("export_crf", self.export_crf.to_string()),
            ("export_path", self.export_path.display().to_string()),
            ("capture_cmd", self.capture_cmd.clone()),
            ("ffmpeg_cmd", self.ffmpeg_cmd.clone()),
            ("tick_ms", self.tick_ms.to_string()),
            ("logs", (self.logs && !self.no_logs).to_string()),
        ];
        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
        let mut out = String::from("LapseTerm settings\n");
        for (key, value) in rows {
            out.push_str(&format!("  {key:<width$}  {value}\n"));
        }
        out
    }
}

/// Resolve a relative path against the current directory without requiring it to exist.
pub(super) fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("failed to read current directory")?;
    Ok(cwd.join(path))
}

/// Allow either a known binary name or an absolute path.
pub(super) fn sanitize_binary(value: &str, flag: &str, allowlist: &[&str]) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{flag} cannot be empty");
    }
    if let Some(allowed) = allowlist
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
    {
        return Ok((*allowed).to_string());
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.contains(std::path::MAIN_SEPARATOR) {
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to canonicalize {flag} '{trimmed}'"))?;
        let metadata = fs::metadata(&canonical)
            .with_context(|| format!("failed to inspect {flag} '{}'", canonical.display()))?;
        if !metadata.is_file() {
            bail!("{flag} '{}' is not a file", canonical.display());
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = metadata.permissions().mode();
            if mode & 0o111 == 0 {
                bail!(
                    "{flag} '{}' exists but is not executable (mode {:o})",
                    canonical.display(),
                    mode
                );
            }
        }
        return canonical
            .to_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("{flag} must be valid UTF-8"));
    }

    bail!("{flag} must start with one of {allowlist:?} or an existing binary path");
}
