//! Encode Parameter Calculator
//!
//! Turns an [`EncodeRequest`] (what the user asked for) into an
//! [`EncodePlan`] (what the encoder is told). Pure and stateless.
//!
//! ## Size-targeted MP4
//!
//! ```text
//! total_bitrate_bps  = target_size_mb × 8 × 1024 × 1024 / (1.073741824 × duration)
//! total_bitrate_kbps = ⌊total_bitrate_bps / 1000⌋
//! video_bitrate_kbps = total_bitrate_kbps − 128
//! ```
//!
//! 1.073741824 = 1.024³ reconciles the decimal-MB size target with the
//! binary byte math, so the resulting file lands at the size the user typed.

use crate::timecode::format_seconds;
use crate::{CompressError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const AUDIO_BITRATE_KBPS: u32 = 128;
pub const MP4_OUTPUT_WIDTH: u32 = 1280;
pub const MP4_OUTPUT_HEIGHT: u32 = 720;
pub const MP4_OUTPUT_FPS: u32 = 30;

/// 1.024³ as an exact ratio: `MB_MIB_DISTORTION_NUM / MB_MIB_DISTORTION_DEN`.
pub const MB_MIB_DISTORTION_NUM: u128 = 1_073_741_824;
pub const MB_MIB_DISTORTION_DEN: u128 = 1_000_000_000;

/// GIF output is always 16:9, whatever the source aspect ratio.
const GIF_ASPECT_NUM: f64 = 16.0;
const GIF_ASPECT_DEN: f64 = 9.0;

// ═══════════════════════════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════════════════════════

/// `[start, end)` in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start_seconds: u32,
    pub end_seconds: u32,
}

impl TrimWindow {
    pub fn new(start_seconds: u32, end_seconds: u32) -> Self {
        Self {
            start_seconds,
            end_seconds,
        }
    }

    /// `end − start`; may be zero or negative for a malformed window.
    pub fn duration(&self) -> i64 {
        self.end_seconds as i64 - self.start_seconds as i64
    }

    /// Positive duration or `InvalidTrim`.
    pub fn validated_duration(&self) -> Result<u32> {
        if self.end_seconds > self.start_seconds {
            Ok(self.end_seconds - self.start_seconds)
        } else {
            Err(CompressError::InvalidTrim {
                start_seconds: self.start_seconds,
                end_seconds: self.end_seconds,
            })
        }
    }
}

impl fmt::Display for TrimWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}–{}",
            format_seconds(self.start_seconds),
            format_seconds(self.end_seconds)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Codec {
    #[default]
    #[serde(rename = "h264_nvenc")]
    #[value(name = "h264_nvenc")]
    H264Nvenc,
    #[serde(rename = "libx264")]
    #[value(name = "libx264")]
    Libx264,
    #[serde(rename = "libx265")]
    #[value(name = "libx265")]
    Libx265,
}

impl Codec {
    /// ffmpeg encoder name
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264Nvenc => "h264_nvenc",
            Codec::Libx264 => "libx264",
            Codec::Libx265 => "libx265",
        }
    }

    pub fn is_hardware(&self) -> bool {
        matches!(self, Codec::H264Nvenc)
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// x264/x265-style speed presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Preset {
    #[default]
    Fast,
    Medium,
    Slow,
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Slower,
    Veryslow,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
        }
    }

    /// Preset name understood by `codec`. NVENC only knows p1 (fastest) … p7
    /// (slowest), so the nine software names are folded onto that scale.
    pub fn for_codec(&self, codec: Codec) -> &'static str {
        if !codec.is_hardware() {
            return self.as_str();
        }
        match self {
            Preset::Ultrafast | Preset::Superfast => "p1",
            Preset::Veryfast => "p2",
            Preset::Faster => "p3",
            Preset::Fast => "p4",
            Preset::Medium => "p5",
            Preset::Slow => "p6",
            Preset::Slower | Preset::Veryslow => "p7",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp4Request {
    pub target_size_mb: u32,
    pub codec: Codec,
    pub preset: Preset,
    pub trim: TrimWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifRequest {
    pub fps: u32,
    pub vertical_resolution_px: u32,
    pub trim: TrimWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncodeRequest {
    Mp4(Mp4Request),
    Gif(GifRequest),
}

impl EncodeRequest {
    pub fn trim(&self) -> TrimWindow {
        match self {
            EncodeRequest::Mp4(r) => r.trim,
            EncodeRequest::Gif(r) => r.trim,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        match self {
            EncodeRequest::Mp4(_) => OutputFormat::Mp4,
            EncodeRequest::Gif(_) => OutputFormat::Gif,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Gif,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Gif => "gif",
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Plan types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp4Plan {
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub fps: u32,
    pub codec: Codec,
    pub preset: Preset,
    pub trim: TrimWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GifPlan {
    pub output_width: u32,
    pub output_height: u32,
    pub fps: u32,
    pub trim: TrimWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncodePlan {
    Mp4(Mp4Plan),
    Gif(GifPlan),
}

impl EncodePlan {
    pub fn trim(&self) -> TrimWindow {
        match self {
            EncodePlan::Mp4(p) => p.trim,
            EncodePlan::Gif(p) => p.trim,
        }
    }

    pub fn output_size(&self) -> (u32, u32) {
        match self {
            EncodePlan::Mp4(p) => (p.output_width, p.output_height),
            EncodePlan::Gif(p) => (p.output_width, p.output_height),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Calculator
// ═══════════════════════════════════════════════════════════════

pub fn compute_plan(request: &EncodeRequest) -> Result<EncodePlan> {
    match request {
        EncodeRequest::Mp4(r) => compute_mp4_plan(r).map(EncodePlan::Mp4),
        EncodeRequest::Gif(r) => compute_gif_plan(r).map(EncodePlan::Gif),
    }
}

pub fn compute_mp4_plan(request: &Mp4Request) -> Result<Mp4Plan> {
    let duration = request.trim.validated_duration()?;

    if request.target_size_mb == 0 {
        return Err(CompressError::invalid_input("size", "0"));
    }

    let total_kbps = total_bitrate_kbps(request.target_size_mb, duration);
    let video_bitrate_kbps = total_kbps as i64 - AUDIO_BITRATE_KBPS as i64;

    if video_bitrate_kbps <= 0 {
        return Err(CompressError::InfeasibleSize {
            target_size_mb: request.target_size_mb,
            duration_secs: duration,
            video_bitrate_kbps,
        });
    }

    tracing::info!(
        target_size_mb = request.target_size_mb,
        duration_secs = duration,
        total_bitrate_kbps = total_kbps,
        video_bitrate_kbps,
        audio_bitrate_kbps = AUDIO_BITRATE_KBPS,
        codec = %request.codec,
        preset = %request.preset,
        "Computed MP4 bitrate"
    );

    Ok(Mp4Plan {
        video_bitrate_kbps: video_bitrate_kbps as u32,
        audio_bitrate_kbps: AUDIO_BITRATE_KBPS,
        output_width: MP4_OUTPUT_WIDTH,
        output_height: MP4_OUTPUT_HEIGHT,
        fps: MP4_OUTPUT_FPS,
        codec: request.codec,
        preset: request.preset,
        trim: request.trim,
    })
}

/// ⌊size_mb·8·1024·1024 / (1.024³·duration·1000)⌋, computed exactly.
pub fn total_bitrate_kbps(target_size_mb: u32, duration_secs: u32) -> u64 {
    debug_assert!(duration_secs > 0);
    let bits = target_size_mb as u128 * 8 * 1024 * 1024;
    let numerator = bits * MB_MIB_DISTORTION_DEN;
    let denominator = MB_MIB_DISTORTION_NUM * duration_secs as u128 * 1000;
    (numerator / denominator) as u64
}

pub fn compute_gif_plan(request: &GifRequest) -> Result<GifPlan> {
    request.trim.validated_duration()?;

    if request.fps == 0 {
        return Err(CompressError::invalid_input("fps", "0"));
    }
    if request.vertical_resolution_px == 0 {
        return Err(CompressError::invalid_input("resolution", "0"));
    }

    let output_width = gif_width_for_height(request.vertical_resolution_px);

    tracing::info!(
        width = output_width,
        height = request.vertical_resolution_px,
        fps = request.fps,
        "Computed GIF frame size"
    );

    Ok(GifPlan {
        output_width,
        output_height: request.vertical_resolution_px,
        fps: request.fps,
        trim: request.trim,
    })
}

pub fn gif_width_for_height(height: u32) -> u32 {
    (height as f64 * GIF_ASPECT_NUM / GIF_ASPECT_DEN).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4(size: u32, start: u32, end: u32) -> EncodeRequest {
        EncodeRequest::Mp4(Mp4Request {
            target_size_mb: size,
            codec: Codec::Libx264,
            preset: Preset::Medium,
            trim: TrimWindow::new(start, end),
        })
    }

    fn gif(fps: u32, height: u32, start: u32, end: u32) -> EncodeRequest {
        EncodeRequest::Gif(GifRequest {
            fps,
            vertical_resolution_px: height,
            trim: TrimWindow::new(start, end),
        })
    }

    #[test]
    fn test_ten_mb_over_one_minute() {
        // 10·8·1024·1024 / (1.073741824·60) = 1_302_083.3 bps
        assert_eq!(total_bitrate_kbps(10, 60), 1302);
        let EncodePlan::Mp4(plan) = compute_plan(&mp4(10, 0, 60)).unwrap() else {
            panic!("expected mp4 plan");
        };
        assert_eq!(plan.video_bitrate_kbps, 1174);
        assert_eq!(plan.audio_bitrate_kbps, 128);
        assert_eq!((plan.output_width, plan.output_height), (1280, 720));
        assert_eq!(plan.fps, 30);
        assert_eq!(plan.codec, Codec::Libx264);
        assert_eq!(plan.preset, Preset::Medium);
        assert_eq!(plan.trim, TrimWindow::new(0, 60));
    }

    #[test]
    fn test_only_trim_length_matters() {
        let a = compute_plan(&mp4(25, 0, 30)).unwrap();
        let b = compute_plan(&mp4(25, 90, 120)).unwrap();
        let (EncodePlan::Mp4(a), EncodePlan::Mp4(b)) = (a, b) else {
            panic!("expected mp4 plans");
        };
        assert_eq!(a.video_bitrate_kbps, b.video_bitrate_kbps);
        // 25·7_812_500 / 30 / 1000 = 6510
        assert_eq!(a.video_bitrate_kbps, 6510 - 128);
    }

    #[test]
    fn test_exact_division_is_not_rounded_down() {
        // 8MB over 1s = 62_500_000 bps exactly
        assert_eq!(total_bitrate_kbps(8, 1), 62_500);
        assert_eq!(total_bitrate_kbps(1, 125), 62);
    }

    #[test]
    fn test_empty_or_reversed_trim_is_invalid() {
        for (start, end) in [(10, 10), (30, 10)] {
            let err = compute_plan(&mp4(10, start, end)).unwrap_err();
            assert!(matches!(
                err,
                CompressError::InvalidTrim { start_seconds, end_seconds }
                    if start_seconds == start && end_seconds == end
            ));
        }
    }

    #[test]
    fn test_size_too_small_is_infeasible() {
        let err = compute_plan(&mp4(1, 0, 600)).unwrap_err();
        match err {
            CompressError::InfeasibleSize {
                target_size_mb,
                duration_secs,
                video_bitrate_kbps,
            } => {
                assert_eq!(target_size_mb, 1);
                assert_eq!(duration_secs, 600);
                assert_eq!(video_bitrate_kbps, 13 - 128);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bitrate_exactly_audio_share_is_infeasible() {
        // 128 kbps total leaves nothing for video
        // 7_812_500·s / (d·1000) = 128 → s=1, d=61 gives 128.07 → 128
        assert_eq!(total_bitrate_kbps(1, 61), 128);
        assert!(matches!(
            compute_plan(&mp4(1, 0, 61)),
            Err(CompressError::InfeasibleSize { video_bitrate_kbps: 0, .. })
        ));
    }

    #[test]
    fn test_zero_size_is_invalid_input() {
        assert!(matches!(
            compute_plan(&mp4(0, 0, 60)),
            Err(CompressError::InvalidInput { field: "size", .. })
        ));
    }

    #[test]
    fn test_gif_width_follows_16_9() {
        assert_eq!(gif_width_for_height(480), 853);
        assert_eq!(gif_width_for_height(720), 1280);
        assert_eq!(gif_width_for_height(1080), 1920);
        assert_eq!(gif_width_for_height(240), 427);
        assert_eq!(gif_width_for_height(320), 569);
    }

    #[test]
    fn test_gif_plan() {
        let EncodePlan::Gif(plan) = compute_plan(&gif(25, 480, 5, 12)).unwrap() else {
            panic!("expected gif plan");
        };
        assert_eq!(plan.output_width, 853);
        assert_eq!(plan.output_height, 480);
        assert_eq!(plan.fps, 25);
        assert_eq!(plan.trim, TrimWindow::new(5, 12));
    }

    #[test]
    fn test_gif_rejects_zero_fps_and_height() {
        assert!(matches!(
            compute_plan(&gif(0, 480, 0, 5)),
            Err(CompressError::InvalidInput { field: "fps", .. })
        ));
        assert!(matches!(
            compute_plan(&gif(10, 0, 0, 5)),
            Err(CompressError::InvalidInput { field: "resolution", .. })
        ));
        assert!(matches!(
            compute_plan(&gif(10, 240, 5, 5)),
            Err(CompressError::InvalidTrim { .. })
        ));
    }

    #[test]
    fn test_nvenc_preset_mapping() {
        assert_eq!(Preset::Fast.for_codec(Codec::Libx264), "fast");
        assert_eq!(Preset::Veryslow.for_codec(Codec::Libx265), "veryslow");
        assert_eq!(Preset::Fast.for_codec(Codec::H264Nvenc), "p4");
        assert_eq!(Preset::Ultrafast.for_codec(Codec::H264Nvenc), "p1");
        assert_eq!(Preset::Veryslow.for_codec(Codec::H264Nvenc), "p7");
    }

    #[test]
    fn test_plan_serializes_with_format_tag() {
        let plan = compute_plan(&mp4(10, 0, 60)).unwrap();
        let json = serde_json::to_value(plan).unwrap();
        assert_eq!(json["format"], "mp4");
        assert_eq!(json["video_bitrate_kbps"], 1174);
        assert_eq!(json["codec"], "libx264");
        assert_eq!(json["preset"], "medium");
    }

    #[test]
    fn test_trim_window_display() {
        assert_eq!(TrimWindow::new(5, 150).to_string(), "00:05–02:30");
        assert_eq!(TrimWindow::new(30, 10).duration(), -20);
    }
}
