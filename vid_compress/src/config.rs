//! Environment configuration
//!
//! | Env Var               | Default               |
//! |-----------------------|-----------------------|
//! | `DEFAULT_DIRECTORY`   | none                  |
//! | `VID_COMPRESS_FFMPEG` | `ffmpeg` on `PATH`    |
//! | `VID_COMPRESS_FFPROBE`| `ffprobe` on `PATH`   |
//!
//! A `.env` file in the working directory is loaded first when present.

use crate::ffmpeg_backend::FfmpegBackend;
use crate::Result;
use shared_utils::{find_tool, FFMPEG_NAME, FFPROBE_NAME};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DEFAULT_DIRECTORY: &str = "DEFAULT_DIRECTORY";
pub const ENV_FFMPEG: &str = "VID_COMPRESS_FFMPEG";
pub const ENV_FFPROBE: &str = "VID_COMPRESS_FFPROBE";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// Base directory for relative input paths that do not exist as given.
    pub default_directory: Option<PathBuf>,
    pub ffmpeg_override: Option<PathBuf>,
    pub ffprobe_override: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            default_directory: path(ENV_DEFAULT_DIRECTORY),
            ffmpeg_override: path(ENV_FFMPEG),
            ffprobe_override: path(ENV_FFPROBE),
        }
    }

    pub fn resolve_input(&self, input: &Path) -> PathBuf {
        if input.is_absolute() || input.exists() {
            return input.to_path_buf();
        }
        match &self.default_directory {
            Some(dir) => {
                let candidate = dir.join(input);
                if candidate.exists() {
                    debug!("Resolved {} against {}", input.display(), dir.display());
                    candidate
                } else {
                    input.to_path_buf()
                }
            }
            None => input.to_path_buf(),
        }
    }

    /// Locates ffmpeg/ffprobe and builds the backend with default settings.
    pub fn backend(&self) -> Result<FfmpegBackend> {
        let ffmpeg = find_tool(FFMPEG_NAME, self.ffmpeg_override.as_deref())?;
        let ffprobe = find_tool(FFPROBE_NAME, self.ffprobe_override.as_deref())?;
        debug!(ffmpeg = %ffmpeg.display(), ffprobe = %ffprobe.display(), "Using tools");
        Ok(FfmpegBackend::new(ffmpeg, ffprobe))
    }
}
