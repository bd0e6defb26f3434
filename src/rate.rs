//! Capture rate handling: parsing the frames-per-minute input and turning it
//! into a whole-second capture interval.

use std::num::IntErrorKind;

/// Rate used whenever the input is missing or not a positive integer.
pub const DEFAULT_FRAMES_PER_MINUTE: u32 = 2;

/// Frame rate used when assembling the captured sequence into a video.
pub const DEFAULT_EXPORT_FRAME_RATE: u32 = 24;

const SECONDS_PER_MINUTE: u64 = 60;

/// Parse the textual rate input. Anything that is not a positive integer maps to
/// [`DEFAULT_FRAMES_PER_MINUTE`] instead of an error; huge positive values saturate.
pub fn parse_frames_per_minute(text: &str) -> u32 {
    match text.trim().parse::<i64>() {
        Ok(value) => validate_frames_per_minute(value),
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => u32::MAX,
        Err(_) => DEFAULT_FRAMES_PER_MINUTE,
    }
}

/// Clamp an already-numeric rate to the same rules as the text input.
pub fn validate_frames_per_minute(value: i64) -> u32 {
    if value <= 0 {
        return DEFAULT_FRAMES_PER_MINUTE;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Seconds between captures, rounded up so we never shoot faster than asked.
///
/// Rates above 60 per minute collapse to one capture per second because the
/// worker only wakes once per tick.
pub fn capture_interval_secs(frames_per_minute: u32) -> u64 {
    let fpm = u64::from(frames_per_minute.max(1));
    SECONDS_PER_MINUTE.div_ceil(fpm).max(1)
}

/// Rate settings shared between the controller and the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConfig {
    pub frames_per_minute: u32,
    pub export_frame_rate: u32,
}

impl RateConfig {
    pub fn new(frames_per_minute: u32, export_frame_rate: u32) -> Self {
        Self {
            frames_per_minute: validate_frames_per_minute(i64::from(frames_per_minute)),
            export_frame_rate: if export_frame_rate == 0 {
                DEFAULT_EXPORT_FRAME_RATE
            } else {
                export_frame_rate
            },
        }
    }

    pub fn interval_secs(&self) -> u64 {
        capture_interval_secs(self.frames_per_minute)
    }
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            frames_per_minute: DEFAULT_FRAMES_PER_MINUTE,
            export_frame_rate: DEFAULT_EXPORT_FRAME_RATE,
        }
    }
}
