//! ffmpeg-backed [`VideoBackend`]
//!
//! `open` probes the file with ffprobe; `trim`/`resize` only record what to do;
//! the actual decode/scale/encode happens in a single ffmpeg run inside
//! `write_video` / `write_gif` (two runs for two-pass libx264).

use crate::clip::VideoBackend;
use crate::plan::{Codec, GifPlan, Mp4Plan, TrimWindow};
use crate::{CompressError, Result};
use shared_utils::ffprobe::{probe_clip, ClipInfo};
use shared_utils::{
    create_encode_progress_bar, describe_ffmpeg_failure, encoder_available, set_fraction,
    FfmpegProcess, FfmpegProgressParser,
};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Encoder threads handed to ffmpeg unless configured otherwise.
pub const DEFAULT_THREADS: u32 = 6;

#[cfg(target_os = "windows")]
const NULL_OUTPUT: &str = "NUL";
#[cfg(not(target_os = "windows"))]
const NULL_OUTPUT: &str = "/dev/null";

#[derive(Debug, Clone, PartialEq)]
pub struct FfmpegClip {
    pub path: PathBuf,
    pub info: ClipInfo,
    pub trim: Option<TrimWindow>,
    pub scale: Option<(u32, u32)>,
}

impl FfmpegClip {
    /// Seconds of output this clip will produce.
    pub fn output_duration(&self) -> f64 {
        match self.trim {
            Some(t) => t.duration().max(0) as f64,
            None => self.info.duration,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    threads: u32,
    two_pass: bool,
    show_progress: bool,
}

impl FfmpegBackend {
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self {
            ffmpeg,
            ffprobe,
            threads: DEFAULT_THREADS,
            two_pass: false,
            show_progress: true,
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Two-pass rate control; honoured for libx264 only.
    pub fn with_two_pass(mut self, two_pass: bool) -> Self {
        self.two_pass = two_pass;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Falls back to libx264 when this ffmpeg build has no NVENC encoder.
    fn effective_codec(&self, requested: Codec) -> Codec {
        if requested.is_hardware() && !encoder_available(&self.ffmpeg, requested.as_str()) {
            warn!(
                requested = requested.as_str(),
                fallback = Codec::Libx264.as_str(),
                "Encoder not available in this ffmpeg build, falling back to software encoding"
            );
            return Codec::Libx264;
        }
        requested
    }

    fn run_ffmpeg(&self, args: &[String], output_duration: f64, label: &str) -> Result<()> {
        let mut full_args: Vec<String> = ["-hide_banner", "-progress", "pipe:1", "-nostats"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        full_args.extend_from_slice(args);

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(&full_args);

        let start = Instant::now();
        let mut process = FfmpegProcess::spawn(&mut cmd)
            .map_err(|e| CompressError::Encode(format!("{:#}", e)))?;

        let pb = create_encode_progress_bar(label, self.show_progress);
        if let Some(stdout) = process.take_stdout() {
            let mut parser = FfmpegProgressParser::with_duration(output_duration);
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                if let Some(fraction) = parser.parse_line(&line) {
                    set_fraction(&pb, fraction);
                    pb.set_message(format!(
                        "frame {} · {:.0} fps · {:.1}x",
                        parser.current_frame(),
                        parser.current_fps(),
                        parser.current_speed()
                    ));
                }
            }
            if !parser.is_finished() {
                debug!(
                    encoded_secs = parser.current_time(),
                    "ffmpeg closed its progress stream before reporting the end"
                );
            }
        }

        let (status, stderr) = process
            .wait_with_output()
            .map_err(|e| CompressError::Encode(format!("{:#}", e)))?;

        shared_utils::logging::log_external_tool(
            "ffmpeg",
            &full_args,
            &stderr,
            status.code(),
            start.elapsed(),
        );

        if !status.success() {
            pb.abandon_with_message("failed");
            return Err(CompressError::Encode(describe_ffmpeg_failure(
                &stderr,
                status.code(),
            )));
        }

        pb.finish_with_message("done");
        Ok(())
    }
}

impl VideoBackend for FfmpegBackend {
    type Clip = FfmpegClip;

    fn open(&self, path: &Path) -> Result<FfmpegClip> {
        let info = probe_clip(&self.ffprobe, path)?;
        info!(
            path = %path.display(),
            duration_secs = info.duration,
            width = info.width,
            height = info.height,
            fps = info.frame_rate,
            has_audio = info.has_audio,
            "Loaded video"
        );
        Ok(FfmpegClip {
            path: path.to_path_buf(),
            info,
            trim: None,
            scale: None,
        })
    }

    fn duration(&self, clip: &FfmpegClip) -> f64 {
        clip.info.duration
    }

    fn trim(&self, clip: &mut FfmpegClip, start_seconds: u32, end_seconds: u32) -> Result<()> {
        let window = TrimWindow::new(start_seconds, end_seconds);
        window.validated_duration()?;
        // the end field defaults to the truncated duration, so allow up to the next whole second
        if end_seconds as f64 > clip.info.duration.ceil() {
            return Err(CompressError::InvalidTrim {
                start_seconds,
                end_seconds,
            });
        }
        clip.trim = Some(window);
        Ok(())
    }

    fn resize(&self, clip: &mut FfmpegClip, width: u32, height: u32) {
        clip.scale = Some((width, height));
    }

    fn write_video(&self, clip: &FfmpegClip, output: &Path, plan: &Mp4Plan) -> Result<()> {
        let codec = self.effective_codec(plan.codec);
        let duration = clip.output_duration();

        if self.two_pass && codec == Codec::Libx264 {
            let log_prefix = passlog_prefix(output);
            info!(passlog = %log_prefix.display(), "Two-pass encode");
            let pass1 = mp4_args(
                clip,
                Path::new(NULL_OUTPUT),
                plan,
                codec,
                self.threads,
                Some(Pass::First(&log_prefix)),
            );
            self.run_ffmpeg(&pass1, duration, "Pass 1/2")?;
            let pass2 = mp4_args(
                clip,
                output,
                plan,
                codec,
                self.threads,
                Some(Pass::Second(&log_prefix)),
            );
            self.run_ffmpeg(&pass2, duration, "Pass 2/2")?;
            for log in self.scratch_artifacts(output) {
                if !log.exists() {
                    continue;
                }
                if let Err(e) = std::fs::remove_file(&log) {
                    warn!("⚠️  Could not remove {}: {}", log.display(), e);
                }
            }
            return Ok(());
        }

        if self.two_pass {
            warn!(
                codec = codec.as_str(),
                "Two-pass is only supported for libx264, encoding in one pass"
            );
        }

        let args = mp4_args(clip, output, plan, codec, self.threads, None);
        self.run_ffmpeg(&args, duration, "MP4")
    }

    fn write_gif(&self, clip: &FfmpegClip, output: &Path, plan: &GifPlan) -> Result<()> {
        let args = gif_args(clip, output, plan, self.threads);
        self.run_ffmpeg(&args, clip.output_duration(), "GIF")
    }

    fn close(&self, clip: FfmpegClip) {
        debug!(path = %clip.path.display(), "Closed video");
    }

    fn scratch_artifacts(&self, output: &Path) -> Vec<PathBuf> {
        let prefix = passlog_prefix(output).display().to_string();
        vec![
            PathBuf::from(format!("{}-0.log", prefix)),
            PathBuf::from(format!("{}-0.log.mbtree", prefix)),
        ]
    }
}

// ═══════════════════════════════════════════════════════════════
// Argument construction
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub enum Pass<'a> {
    First(&'a Path),
    Second(&'a Path),
}

fn passlog_prefix(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".passlog");
    PathBuf::from(name)
}

/// `-y [-ss S] -i INPUT [-t D]`
pub fn input_args(clip: &FfmpegClip) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    if let Some(trim) = clip.trim {
        args.push("-ss".to_string());
        args.push(trim.start_seconds.to_string());
    }
    args.push("-i".to_string());
    args.push(clip.path.display().to_string());
    if let Some(trim) = clip.trim {
        args.push("-t".to_string());
        args.push(trim.duration().max(0).to_string());
    }
    args
}

fn scale_filter(clip: &FfmpegClip, plan_size: (u32, u32)) -> String {
    let (w, h) = clip.scale.unwrap_or(plan_size);
    format!("scale={}:{}", w, h)
}

pub fn mp4_args(
    clip: &FfmpegClip,
    output: &Path,
    plan: &Mp4Plan,
    codec: Codec,
    threads: u32,
    pass: Option<Pass<'_>>,
) -> Vec<String> {
    let mut args = input_args(clip);
    let bitrate = format!("{}k", plan.video_bitrate_kbps);

    args.extend([
        "-vf".to_string(),
        scale_filter(clip, (plan.output_width, plan.output_height)),
        "-r".to_string(),
        plan.fps.to_string(),
        "-c:v".to_string(),
        codec.as_str().to_string(),
        "-preset".to_string(),
        plan.preset.for_codec(codec).to_string(),
        "-b:v".to_string(),
        bitrate,
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-threads".to_string(),
        threads.to_string(),
    ]);

    if codec == Codec::Libx265 {
        // QuickTime only plays HEVC tagged hvc1
        args.extend(["-tag:v".to_string(), "hvc1".to_string()]);
    }

    match pass {
        Some(Pass::First(log)) => {
            args.extend([
                "-pass".to_string(),
                "1".to_string(),
                "-passlogfile".to_string(),
                log.display().to_string(),
                "-an".to_string(),
                "-f".to_string(),
                "null".to_string(),
            ]);
        }
        Some(Pass::Second(log)) => {
            args.extend([
                "-pass".to_string(),
                "2".to_string(),
                "-passlogfile".to_string(),
                log.display().to_string(),
            ]);
            args.extend(audio_args(clip, plan));
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
        None => {
            args.extend(audio_args(clip, plan));
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
    }

    args.push(output.display().to_string());
    args
}

fn audio_args(clip: &FfmpegClip, plan: &Mp4Plan) -> Vec<String> {
    if clip.info.has_audio {
        vec![
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            format!("{}k", plan.audio_bitrate_kbps),
        ]
    } else {
        vec!["-an".to_string()]
    }
}

pub fn gif_args(clip: &FfmpegClip, output: &Path, plan: &GifPlan, threads: u32) -> Vec<String> {
    let mut args = input_args(clip);
    let (w, h) = clip.scale.unwrap_or((plan.output_width, plan.output_height));
    args.extend([
        "-vf".to_string(),
        format!("fps={},scale={}:{}", plan.fps, w, h),
        "-loop".to_string(),
        "0".to_string(),
        "-an".to_string(),
        "-threads".to_string(),
        threads.to_string(),
        output.display().to_string(),
    ]);
    args
}
