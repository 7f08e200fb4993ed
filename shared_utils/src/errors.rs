use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error(
        "Invalid trim window {start_seconds}s–{end_seconds}s: \
         end must be after start and within the clip"
    )]
    InvalidTrim {
        start_seconds: u32,
        end_seconds: u32,
    },

    #[error(
        "Target size {target_size_mb}MB is too small for {duration_secs}s of video \
         (video bitrate would be {video_bitrate_kbps} kbps)"
    )]
    InfeasibleSize {
        target_size_mb: u32,
        duration_secs: u32,
        video_bitrate_kbps: i64,
    },

    #[error("Invalid {field}: {value:?}")]
    InvalidInput { field: &'static str, value: String },

    #[error("Failed to read video: {0}")]
    Decode(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompressError {
    pub fn invalid_input(field: &'static str, value: impl Into<String>) -> Self {
        CompressError::InvalidInput {
            field,
            value: value.into(),
        }
    }

    /// Message shown to the user when the action aborts.
    pub fn user_message(&self) -> String {
        match self {
            CompressError::InvalidInput { field: "size", .. } => {
                format!("❌ Invalid custom size. {}", self)
            }
            CompressError::InvalidInput {
                field: "resolution",
                ..
            } => format!("❌ Invalid custom resolution. {}", self),
            CompressError::FileNotFound(_) => {
                format!("❌ Please select a valid video file. {}", self)
            }
            _ => format!("❌ Error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressError>;
