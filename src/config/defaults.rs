pub const DEFAULT_OUTPUT_DIR: &str = "Photos";
pub const DEFAULT_TICK_MS: u64 = 1000;
pub const MIN_TICK_MS: u64 = 50;
pub const MAX_TICK_MS: u64 = 10_000;
pub const MAX_EXPORT_FRAME_RATE: u32 = 120;
pub const MAX_EXPORT_CRF: u8 = 51;

pub(super) const MAX_CAPTURE_COMMAND_BYTES: usize = 4 * 1024;
pub(super) const CAPTURE_BINARIES: &[&str] = &[
    "rpicam-still",
    "libcamera-still",
    "raspistill",
    "fswebcam",
    "imagesnap",
    "ffmpeg",
];
pub(super) const FFMPEG_BINARIES: &[&str] = &["ffmpeg"];
