//! Video Compression API
//!
//! One action per call: open the input, compute the plan, trim, resize and
//! write `<stem>_compressed.<ext>` next to the input. A failed write never
//! leaves a partial output or encoder scratch files behind.

use crate::clip::{ClipGuard, VideoBackend};
use crate::plan::{compute_plan, EncodePlan, EncodeRequest, OutputFormat};
use crate::{CompressError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    pub input_path: String,
    pub output_path: String,
    pub plan: EncodePlan,
    pub output_size: u64,
    pub elapsed_secs: f64,
    pub message: String,
}

/// `<dir>/<stem>_compressed.<ext>`
pub fn output_path_for(input: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let dir = input.parent().unwrap_or(Path::new(""));
    dir.join(format!("{}_compressed.{}", stem, format.extension()))
}

fn ensure_input_file(input: &Path) -> Result<()> {
    if input.is_file() {
        Ok(())
    } else {
        Err(CompressError::FileNotFound(input.to_path_buf()))
    }
}

/// Opens `input` only long enough to read its duration in seconds.
pub fn probe_duration<B: VideoBackend + ?Sized>(backend: &B, input: &Path) -> Result<f64> {
    ensure_input_file(input)?;
    let guard = ClipGuard::open(backend, input)?;
    Ok(guard.duration())
}

pub fn compress<B: VideoBackend + ?Sized>(
    backend: &B,
    input: &Path,
    request: &EncodeRequest,
) -> Result<ConversionOutput> {
    ensure_input_file(input)?;
    let output_path = output_path_for(input, request.output_format());
    let start = Instant::now();

    let mut guard = ClipGuard::open(backend, input)?;
    let plan = compute_plan(request)?;
    let trim = plan.trim();
    let (width, height) = plan.output_size();

    info!(
        "🎬 {} → {} (trim {})",
        input.display(),
        output_path.display(),
        trim
    );

    backend.trim(guard.clip_mut(), trim.start_seconds, trim.end_seconds)?;
    backend.resize(guard.clip_mut(), width, height);

    let written = match &plan {
        EncodePlan::Mp4(p) => backend.write_video(guard.clip(), &output_path, p),
        EncodePlan::Gif(p) => backend.write_gif(guard.clip(), &output_path, p),
    };

    if let Err(e) = written {
        warn!(error = %e, "Encode failed, removing partial output");
        remove_partial_output(backend, &output_path);
        return Err(e);
    }
    drop(guard);

    let output_size = std::fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
    let elapsed_secs = start.elapsed().as_secs_f64();
    let message = match plan {
        EncodePlan::Mp4(p) => format!(
            "✅ Video compressed at {} kbps ({}, preset {})",
            p.video_bitrate_kbps, p.codec, p.preset
        ),
        EncodePlan::Gif(p) => format!(
            "✅ GIF created at {}x{}, {} fps",
            p.output_width, p.output_height, p.fps
        ),
    };

    info!(
        output = %output_path.display(),
        output_size,
        elapsed_secs,
        "{}",
        message
    );

    Ok(ConversionOutput {
        input_path: input.display().to_string(),
        output_path: output_path.display().to_string(),
        plan,
        output_size,
        elapsed_secs,
        message,
    })
}

fn remove_partial_output<B: VideoBackend + ?Sized>(backend: &B, output: &Path) {
    let mut leftovers = vec![output.to_path_buf()];
    leftovers.extend(backend.scratch_artifacts(output));

    for path in leftovers {
        if !path.exists() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => info!("🗑️  Removed {}", path.display()),
            Err(e) => warn!("⚠️  Could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::mock::MockBackend;
    use crate::plan::{Codec, GifRequest, Mp4Request, Preset, TrimWindow};
    use tempfile::TempDir;

    fn mp4_request(start: u32, end: u32) -> EncodeRequest {
        EncodeRequest::Mp4(Mp4Request {
            target_size_mb: 10,
            codec: Codec::H264Nvenc,
            preset: Preset::Fast,
            trim: TrimWindow::new(start, end),
        })
    }

    fn input_in(dir: &TempDir) -> PathBuf {
        let input = dir.path().join("holiday.mov");
        std::fs::write(&input, b"source").unwrap();
        input
    }

    #[test]
    fn test_output_path_naming() {
        assert_eq!(
            output_path_for(Path::new("/videos/holiday.mov"), OutputFormat::Mp4),
            PathBuf::from("/videos/holiday_compressed.mp4")
        );
        assert_eq!(
            output_path_for(Path::new("/videos/holiday.mp4"), OutputFormat::Gif),
            PathBuf::from("/videos/holiday_compressed.gif")
        );
        assert_eq!(
            output_path_for(Path::new("clip.webm"), OutputFormat::Mp4),
            PathBuf::from("clip_compressed.mp4")
        );
    }

    #[test]
    fn test_mp4_success() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend::with_duration(120.0);

        let out = compress(&backend, &input, &mp4_request(0, 60)).unwrap();

        let expected = dir.path().join("holiday_compressed.mp4");
        assert_eq!(out.output_path, expected.display().to_string());
        assert!(expected.exists());
        assert_eq!(out.output_size, b"encoded output".len() as u64);
        assert!(matches!(out.plan, EncodePlan::Mp4(p) if p.video_bitrate_kbps == 1174));

        let written = backend.written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].1.trim, Some((0, 60)));
        assert_eq!(written[0].1.size, Some((1280, 720)));
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn test_gif_success_uses_16_9_frame() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend::with_duration(30.0);
        let request = EncodeRequest::Gif(GifRequest {
            fps: 25,
            vertical_resolution_px: 480,
            trim: TrimWindow::new(2, 7),
        });

        let out = compress(&backend, &input, &request).unwrap();

        assert!(out.output_path.ends_with("holiday_compressed.gif"));
        assert_eq!(backend.written.borrow()[0].1.size, Some((853, 480)));
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn test_encode_failure_removes_output_and_scratch() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend {
            duration: 120.0,
            fail_write: true,
            scratch_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let err = compress(&backend, &input, &mp4_request(0, 60)).unwrap_err();

        assert!(matches!(err, CompressError::Encode(_)));
        assert!(!dir.path().join("holiday_compressed.mp4").exists());
        assert!(!dir
            .path()
            .join("holiday_compressedTEMP_wvf_snd.mp3")
            .exists());
        assert!(input.exists());
        assert_eq!(backend.opened.get(), 1);
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn test_invalid_trim_closes_clip_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend::with_duration(120.0);

        let err = compress(&backend, &input, &mp4_request(30, 10)).unwrap_err();

        assert!(matches!(err, CompressError::InvalidTrim { .. }));
        assert!(backend.written.borrow().is_empty());
        assert!(!dir.path().join("holiday_compressed.mp4").exists());
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn test_missing_input_never_opens() {
        let dir = TempDir::new().unwrap();
        let backend = MockBackend::with_duration(120.0);

        let err = compress(&backend, &dir.path().join("nope.mp4"), &mp4_request(0, 60))
            .unwrap_err();

        assert!(matches!(err, CompressError::FileNotFound(_)));
        assert_eq!(backend.opened.get(), 0);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend {
            fail_open: true,
            ..Default::default()
        };

        assert!(matches!(
            compress(&backend, &input, &mp4_request(0, 60)),
            Err(CompressError::Decode(_))
        ));
        assert_eq!(backend.closed.get(), 0);
    }

    #[test]
    fn test_probe_duration_closes_clip() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend::with_duration(95.4);

        assert_eq!(probe_duration(&backend, &input).unwrap(), 95.4);
        assert_eq!(backend.opened.get(), 1);
        assert_eq!(backend.closed.get(), 1);
    }

    #[test]
    fn test_output_serializes() {
        let dir = TempDir::new().unwrap();
        let input = input_in(&dir);
        let backend = MockBackend::with_duration(120.0);

        let out = compress(&backend, &input, &mp4_request(0, 60)).unwrap();
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["plan"]["format"], "mp4");
        assert_eq!(json["plan"]["codec"], "h264_nvenc");
        assert_eq!(json["output_size"], 14);
    }
}
