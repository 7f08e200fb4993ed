//! Logging Module - 统一的日志系统
//!
//! tracing-based logging shared by the compressor binaries:
//! - 日志文件写入系统临时目录（按天轮转）
//! - stderr 彩色输出
//! - 超出保留数量的旧日志自动删除
//! - 外部工具（ffmpeg / ffprobe）调用的详细记录
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//!
//! init_logging("vid_compress", LogConfig::default()).expect("Failed to initialize logging");
//! tracing::info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志目录（默认系统临时目录）
    pub log_dir: PathBuf,
    /// 保留的日志文件数量
    pub max_files: usize,
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir(),
            max_files: 5,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// 初始化日志系统
///
/// Installs a global subscriber with a daily-rotated file layer
/// (`{program_name}.log.YYYY-MM-DD` in `config.log_dir`) and an ANSI stderr
/// layer. `RUST_LOG` overrides the configured level.
///
/// Can only succeed once per process.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={level},shared_utils={level}",
            program_name,
            level = config.level
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::debug!(
        program = program_name,
        log_dir = ?config.log_dir,
        log_file = log_file_name,
        max_files = config.max_files,
        level = ?config.level,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;

    Ok(())
}

/// 清理旧日志，只保留最近的 `max_files` 个
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let prefix = format!("{}.log", program_name);
    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((p, modified))
        })
        .collect();

    if log_files.len() <= max_files {
        return Ok(());
    }

    // 最新的在前
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(max_files) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = ?path, "Removed old log file"),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove old log file"),
        }
    }

    Ok(())
}

/// 记录外部工具调用（命令行、耗时、退出码、输出）
pub fn log_external_tool(
    tool_name: &str,
    args: &[String],
    output: &str,
    exit_code: Option<i32>,
    duration: Duration,
) {
    let command = format!("{} {}", tool_name, args.join(" "));

    match exit_code {
        Some(0) => {
            tracing::info!(
                tool = tool_name,
                command = %command,
                duration_secs = duration.as_secs_f64(),
                exit_code = 0,
                "External tool completed successfully"
            );
            tracing::debug!(tool = tool_name, output = %output, "External tool output");
        }
        Some(code) => {
            tracing::error!(
                tool = tool_name,
                command = %command,
                duration_secs = duration.as_secs_f64(),
                exit_code = code,
                output = %output,
                "External tool failed"
            );
        }
        None => {
            tracing::error!(
                tool = tool_name,
                command = %command,
                duration_secs = duration.as_secs_f64(),
                output = %output,
                "External tool terminated without exit code"
            );
        }
    }
}

/// 外部命令执行结果
#[derive(Debug)]
pub struct ExternalCommandResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ExternalCommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// 执行外部命令并记录详细日志
///
/// Runs `program` to completion, capturing stdout/stderr. A non-zero exit is
/// NOT an error here; callers inspect [`ExternalCommandResult::success`].
pub fn execute_external_command(program: &Path, args: &[&str]) -> Result<ExternalCommandResult> {
    use std::process::Command;

    let tool_name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.display().to_string());
    let owned_args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

    tracing::debug!(
        tool = %tool_name,
        command = %format!("{} {}", program.display(), args.join(" ")),
        "Executing external command"
    );

    let start_time = Instant::now();
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute command: {}", program.display()))?;
    let duration = start_time.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();

    let combined_output = if !stdout.is_empty() && !stderr.is_empty() {
        format!("STDOUT:\n{}\n\nSTDERR:\n{}", stdout, stderr)
    } else if !stdout.is_empty() {
        stdout.clone()
    } else {
        stderr.clone()
    };

    log_external_tool(&tool_name, &owned_args, &combined_output, exit_code, duration);

    Ok(ExternalCommandResult {
        exit_code,
        stdout,
        stderr,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.max_files, 5);
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.log_dir, std::env::temp_dir());
    }

    #[test]
    fn test_log_config_with_level() {
        let config = LogConfig::default().with_level(Level::DEBUG);
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.max_files, 5);
    }

    #[test]
    fn test_cleanup_old_logs_keeps_newest() {
        let temp_dir = TempDir::new().unwrap();
        let program_name = "vid_compress";

        for i in 0..8 {
            let file_path = temp_dir
                .path()
                .join(format!("{}.log.2026-01-0{}", program_name, i + 1));
            fs::write(&file_path, format!("log content {}", i)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        // 其他程序的日志不受影响
        fs::write(temp_dir.path().join("other.log"), "x").unwrap();

        cleanup_old_logs(temp_dir.path(), program_name, 3).unwrap();

        let remaining: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(program_name))
            .collect();

        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().any(|n| n.ends_with("2026-01-08")));
        assert!(temp_dir.path().join("other.log").exists());
    }

    #[test]
    fn test_execute_external_command_success() {
        let result = execute_external_command(Path::new("echo"), &["hello", "world"]).unwrap();
        assert!(result.success());
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn test_execute_external_command_missing_program() {
        let result = execute_external_command(Path::new("nonexistent_command_xyz"), &["arg1"]);
        assert!(result.is_err());
    }
}
