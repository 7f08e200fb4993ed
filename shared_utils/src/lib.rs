//! Shared Utilities for the video compressor tools
//!
//! - Error taxonomy (`errors`)
//! - Logging setup and external tool call logging (`logging`)
//! - FFprobe wrapper (`ffprobe`)
//! - FFmpeg process handling: stderr draining, `-progress` parsing, error
//!   formatting (`ffmpeg_process`)
//! - ffmpeg / ffprobe discovery and encoder availability (`tools`)
//! - Progress bars (`progress`)

pub mod errors;
pub mod ffmpeg_process;
pub mod ffprobe;
pub mod logging;
pub mod progress;
pub mod tools;

pub use errors::{CompressError, Result};
pub use ffmpeg_process::{
    describe_ffmpeg_failure, format_ffmpeg_error, get_error_suggestion, FfmpegProcess,
    FfmpegProgressParser,
};
pub use ffprobe::{parse_frame_rate, parse_probe_json, probe_clip, ClipInfo};
pub use progress::{create_encode_progress_bar, create_spinner, set_fraction};
pub use tools::{encoder_available, find_tool, FFMPEG_NAME, FFPROBE_NAME};
