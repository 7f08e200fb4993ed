//! Show a finished output in the platform file manager

use crate::Result;
use shared_utils::logging::execute_external_command;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait Reveal {
    fn reveal(&self, path: &Path) -> Result<()>;
}

/// Does nothing; used when `--reveal` is not given.
pub struct NoReveal;

impl Reveal for NoReveal {
    fn reveal(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

pub struct SystemReveal;

impl SystemReveal {
    /// Program and arguments that select `path` in the file manager.
    pub fn command_for(path: &Path) -> (PathBuf, Vec<String>) {
        if cfg!(target_os = "windows") {
            (
                PathBuf::from("explorer"),
                vec![format!("/select,{}", path.display())],
            )
        } else if cfg!(target_os = "macos") {
            (
                PathBuf::from("open"),
                vec!["-R".to_string(), path.display().to_string()],
            )
        } else {
            // xdg-open cannot select a file; open its directory instead
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            (PathBuf::from("xdg-open"), vec![dir.display().to_string()])
        }
    }
}

impl Reveal for SystemReveal {
    fn reveal(&self, path: &Path) -> Result<()> {
        let (program, args) = Self::command_for(path);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match execute_external_command(&program, &args) {
            // explorer exits 1 even when it succeeds
            Ok(result) => {
                debug!(exit_code = ?result.exit_code, "Revealed {}", path.display());
                Ok(())
            }
            Err(e) => {
                warn!("⚠️  Could not open file manager: {:#}", e);
                Err(crate::CompressError::ToolNotFound(program.display().to_string()))
            }
        }
    }
}
