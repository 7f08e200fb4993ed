//! External tool discovery (ffmpeg / ffprobe)

use crate::errors::{CompressError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

#[cfg(target_os = "windows")]
pub const FFMPEG_NAME: &str = "ffmpeg.exe";
#[cfg(target_os = "windows")]
pub const FFPROBE_NAME: &str = "ffprobe.exe";

#[cfg(not(target_os = "windows"))]
pub const FFMPEG_NAME: &str = "ffmpeg";
#[cfg(not(target_os = "windows"))]
pub const FFPROBE_NAME: &str = "ffprobe";

/// Locates a tool: an explicit override path wins, otherwise `PATH` lookup.
pub fn find_tool(name: &str, override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(CompressError::ToolNotFound(format!(
            "{} (configured path {} does not exist)",
            name,
            path.display()
        )));
    }

    which::which(name).map_err(|_| {
        CompressError::ToolNotFound(format!(
            "{} not found in PATH. \
             Install ffmpeg (e.g. `brew install ffmpeg`, `apt install ffmpeg`)",
            name
        ))
    })
}

// `ffmpeg -encoders` output, one entry per ffmpeg binary
static ENCODER_LISTS: OnceLock<Mutex<HashMap<PathBuf, String>>> = OnceLock::new();

/// Whether the given ffmpeg build lists `encoder` (e.g. `h264_nvenc`).
///
/// The encoder list is queried once per binary and cached for the process.
pub fn encoder_available(ffmpeg: &Path, encoder: &str) -> bool {
    let cache = ENCODER_LISTS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = match cache.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let listing = cache.entry(ffmpeg.to_path_buf()).or_insert_with(|| {
        crate::logging::execute_external_command(ffmpeg, &["-hide_banner", "-encoders"])
            .ok()
            .filter(|r| r.success())
            .map(|r| r.stdout)
            .unwrap_or_default()
    });

    encoder_listed(listing, encoder)
}

fn encoder_listed(listing: &str, encoder: &str) -> bool {
    // " V....D libx264              libx264 H.264 / AVC ..."
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|name| name == encoder)
}
