//! FFprobe wrapper module
//!
//! Reads the stream facts the encoder needs (duration, frame size, frame rate,
//! audio presence) from `ffprobe -print_format json`.

use crate::errors::{CompressError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub format_name: String,
    /// Seconds, fractional.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub video_codec: String,
    pub has_audio: bool,
}

pub fn probe_clip(ffprobe: &Path, path: &Path) -> Result<ClipInfo> {
    if !path.is_file() {
        return Err(CompressError::FileNotFound(path.to_path_buf()));
    }

    let path_str = path.to_str().ok_or_else(|| {
        CompressError::Decode(format!("Invalid path encoding: {}", path.display()))
    })?;

    let args = [
        "-v",
        "error",
        "-print_format",
        "json",
        "-show_format",
        "-show_streams",
        path_str,
    ];

    let start = Instant::now();
    let output = Command::new(ffprobe).args(args).output().map_err(|e| {
        CompressError::Decode(format!(
            "Failed to run ffprobe ({}): {}",
            ffprobe.display(),
            e
        ))
    })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    crate::logging::log_external_tool(
        "ffprobe",
        &args.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        &stderr,
        output.status.code(),
        start.elapsed(),
    );

    if !output.status.success() {
        let error_msg = if stderr.trim().is_empty() {
            format!(
                "ffprobe failed to analyze file: {} (exit code: {:?})",
                path.display(),
                output.status.code()
            )
        } else {
            format!("ffprobe error for '{}': {}", path.display(), stderr.trim())
        };
        return Err(CompressError::Decode(error_msg));
    }

    parse_probe_json(&String::from_utf8_lossy(&output.stdout))
}

/// Parses the JSON document printed by `ffprobe -show_format -show_streams`.
pub fn parse_probe_json(json_str: &str) -> Result<ClipInfo> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| CompressError::Decode(format!("Unreadable ffprobe output: {}", e)))?;

    let format = &json["format"];
    let format_name = format["format_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| CompressError::Decode("No streams found".to_string()))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| CompressError::Decode("No video stream found".to_string()))?;

    // format duration first, stream duration as fallback (some containers only set one)
    let duration = format["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| {
            video_stream["duration"]
                .as_str()
                .and_then(|s| s.parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    if duration <= 0.0 {
        return Err(CompressError::Decode(
            "Could not determine video duration".to_string(),
        ));
    }

    let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
    let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
    let frame_rate = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("0/1"));
    let video_codec = video_stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();
    let has_audio = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("audio"));

    Ok(ClipInfo {
        format_name,
        duration,
        width,
        height,
        frame_rate,
        video_codec,
        has_audio,
    })
}

/// "30000/1001" → 29.97, "25" → 25.0, anything unparsable → 0.0
pub fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            let den: f64 = den.trim().parse().unwrap_or(1.0);
            if den == 0.0 {
                0.0
            } else {
                num / den
            }
        }
        None => rate.trim().parse().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "duration": "61.000000"},
            {"codec_type": "audio", "codec_name": "aac"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "60.500000"}
    }"#;

    #[test]
    fn test_parse_probe_json() {
        let info = parse_probe_json(SAMPLE).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 60.5).abs() < 1e-9);
        assert!((info.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(info.video_codec, "h264");
        assert!(info.has_audio);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480,
                         "r_frame_rate": "25/1", "duration": "12.0"}],
            "format": {"format_name": "matroska,webm"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert!((info.duration - 12.0).abs() < 1e-9);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_no_video_stream_is_decode_error() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(matches!(
            parse_probe_json(json),
            Err(CompressError::Decode(_))
        ));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            parse_probe_json("not json"),
            Err(CompressError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), 25.0);
        assert_eq!(parse_frame_rate("30"), 30.0);
        assert_eq!(parse_frame_rate("1/0"), 0.0);
        assert_eq!(parse_frame_rate("abc"), 0.0);
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_clip(Path::new("ffprobe"), Path::new("/definitely/not/here.mp4"));
        assert!(matches!(result, Err(CompressError::FileNotFound(_))));
    }
}
