//! FFmpeg 进程管理模块 - 防止管道死锁
//!
//! ffmpeg is run with `-progress pipe:1 -nostats`: machine-readable progress
//! goes to stdout, diagnostics to stderr. If both are piped and only stdout is
//! read, a chatty stderr fills its 64KB pipe buffer, ffmpeg blocks, and so
//! does the reader. stderr is therefore drained on its own thread.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-progress", "pipe:1", "-nostats", "-i", "in.mp4", "out.mp4"]);
//! let mut process = FfmpegProcess::spawn(&mut cmd)?;
//! // read process.take_stdout() line by line ...
//! let (status, stderr) = process.wait_with_output()?;
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

// ═══════════════════════════════════════════════════════════════
// FfmpegProcess
// ═══════════════════════════════════════════════════════════════

/// FFmpeg 进程包装器 - stderr 由独立线程持续消耗
pub struct FfmpegProcess {
    child: Child,
    stderr_thread: Option<JoinHandle<String>>,
}

impl FfmpegProcess {
    /// 启动进程；stdout/stderr 会被设置为 piped，stdin 为 null
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        info!(command = %format!("{:?}", cmd), "Executing FFmpeg command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stderr"))?;

        let stderr_thread = thread::spawn(move || {
            let mut buf = String::new();
            for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                buf.push_str(&line);
                buf.push('\n');
            }
            buf
        });

        Ok(Self {
            child,
            stderr_thread: Some(stderr_thread),
        })
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// 等待进程结束，返回 (退出状态, stderr 全文)
    pub fn wait_with_output(mut self) -> Result<(ExitStatus, String)> {
        let status = self.child.wait().context("Failed to wait for FFmpeg")?;
        let stderr = self
            .stderr_thread
            .take()
            .map(|t| t.join().unwrap_or_default())
            .unwrap_or_default();

        if status.success() {
            info!(exit_code = status.code(), "FFmpeg process completed successfully");
            debug!(stderr_output = %stderr, "FFmpeg stderr output");
        } else {
            error!(
                exit_code = status.code(),
                stderr_output = %stderr,
                "FFmpeg process failed"
            );
        }

        Ok((status, stderr))
    }
}

// ═══════════════════════════════════════════════════════════════
// FfmpegProgressParser
// ═══════════════════════════════════════════════════════════════

/// Parser for `-progress` key=value blocks.
///
/// Recognised keys: `frame`, `fps`, `out_time_us`, `out_time`, `speed`,
/// `progress` (`continue` / `end`).
#[derive(Debug, Clone)]
pub struct FfmpegProgressParser {
    total_duration: f64,
    current_frame: u64,
    current_time: f64,
    current_fps: f64,
    current_speed: f64,
    finished: bool,
}

impl FfmpegProgressParser {
    /// `total_duration` - seconds of output expected (the trim window)
    pub fn with_duration(total_duration: f64) -> Self {
        Self {
            total_duration,
            current_frame: 0,
            current_time: 0.0,
            current_fps: 0.0,
            current_speed: 0.0,
            finished: false,
        }
    }

    /// 解析一行；返回 0.0..=1.0 的进度（无法计算时 None）
    pub fn parse_line(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key {
            "frame" => {
                if let Ok(frame) = value.parse::<u64>() {
                    self.current_frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse::<f64>() {
                    self.current_fps = fps;
                }
            }
            // ffmpeg reports out_time_ms in microseconds as well; out_time_us is unambiguous
            "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current_time = us.max(0) as f64 / 1_000_000.0;
                }
            }
            "out_time" => {
                if let Some(t) = Self::parse_time(value) {
                    self.current_time = t;
                }
            }
            "speed" => {
                if let Ok(speed) = value.trim_end_matches('x').trim().parse::<f64>() {
                    self.current_speed = speed;
                }
            }
            "progress" => {
                self.finished = value == "end";
            }
            _ => return None,
        }

        self.calculate_progress()
    }

    /// HH:MM:SS.micro
    fn parse_time(time_str: &str) -> Option<f64> {
        let parts: Vec<&str> = time_str.split(':').collect();
        if parts.len() != 3 {
            return None;
        }

        let hours: f64 = parts[0].parse().ok()?;
        let minutes: f64 = parts[1].parse().ok()?;
        let seconds: f64 = parts[2].parse().ok()?;

        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    fn calculate_progress(&self) -> Option<f64> {
        if self.finished {
            return Some(1.0);
        }
        if self.total_duration > 0.0 && self.current_time > 0.0 {
            return Some((self.current_time / self.total_duration).min(1.0));
        }
        None
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

// ═══════════════════════════════════════════════════════════════
// 错误格式化
// ═══════════════════════════════════════════════════════════════

/// 从 stderr 中提取最有意义的一行
///
/// 1. 最后一个包含 "Error"/"error" 的行
/// 2. 否则最后一行非空、非进度内容
/// 3. 全空时 "Unknown FFmpeg error"
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// 常见错误模式 → 可操作的建议
pub fn get_error_suggestion(stderr: &str) -> Option<String> {
    let patterns = [
        ("No such file or directory", "Check that the input file path is correct"),
        ("Invalid data found", "The input file may be corrupt or not a video"),
        ("Unknown encoder", "This ffmpeg build lacks the selected codec; try --codec libx264"),
        ("Cannot load nvcuda", "No NVIDIA GPU available; try --codec libx264"),
        ("No NVENC capable devices", "No NVENC capable GPU found; try --codec libx264"),
        ("Permission denied", "Check read/write permissions on the input and output folder"),
        ("No space left on device", "Free up disk space next to the input file"),
        ("moov atom not found", "The input MP4 is incomplete (interrupted recording?)"),
    ];

    patterns
        .iter()
        .find(|(pattern, _)| stderr.contains(pattern))
        .map(|(_, suggestion)| suggestion.to_string())
}

/// One-line encode failure description: error line plus suggestion if any.
pub fn describe_ffmpeg_failure(stderr: &str, exit_code: Option<i32>) -> String {
    let mut msg = format_ffmpeg_error(stderr);
    if let Some(code) = exit_code {
        msg = format!("{} (exit code {})", msg, code);
    }
    if let Some(suggestion) = get_error_suggestion(stderr) {
        msg.push_str(&format!(" 💡 {}", suggestion));
    }
    msg
}
