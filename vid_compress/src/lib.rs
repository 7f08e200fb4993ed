//! vid-compress - Size-targeted MP4 and GIF compression
//!
//! - MP4: bitrate chosen so the output lands near a target size in MB,
//!   re-encoded at 1280x720 / 30 fps with 128 kbps AAC audio
//! - GIF: 16:9 frame at a chosen height and frame rate, no audio
//!
//! ```rust,ignore
//! use vid_compress::{compress, AppConfig, EncodeRequest, Mp4Request, TrimWindow};
//! use std::path::Path;
//!
//! let backend = AppConfig::from_env().backend()?;
//! let request = EncodeRequest::Mp4(Mp4Request {
//!     target_size_mb: 10,
//!     codec: Default::default(),
//!     preset: Default::default(),
//!     trim: TrimWindow::new(0, 60),
//! });
//! compress(&backend, Path::new("holiday.mov"), &request)?;
//! ```

pub mod clip;
pub mod config;
pub mod conversion_api;
pub mod ffmpeg_backend;
pub mod input;
pub mod plan;
pub mod reveal;
pub mod timecode;

pub use clip::{ClipGuard, VideoBackend};
pub use config::AppConfig;
pub use conversion_api::{compress, output_path_for, probe_duration, ConversionOutput};
pub use ffmpeg_backend::{FfmpegBackend, FfmpegClip};
pub use plan::{
    compute_plan, Codec, EncodePlan, EncodeRequest, GifPlan, GifRequest, Mp4Plan, Mp4Request,
    OutputFormat, Preset, TrimWindow,
};
pub use reveal::{NoReveal, Reveal, SystemReveal};
pub use timecode::{format_clip_duration, format_seconds, parse_mmss, parse_mmss_strict};

pub use shared_utils::errors::{CompressError, Result};
