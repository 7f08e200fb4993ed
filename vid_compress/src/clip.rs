//! Video decode/encode collaborator
//!
//! The conversion layer only talks to a [`VideoBackend`]; the ffmpeg
//! implementation lives in [`crate::ffmpeg_backend`], tests use a recording
//! mock. An opened clip is held by a [`ClipGuard`] so it is closed exactly
//! once on every exit path.

use crate::plan::{GifPlan, Mp4Plan};
use crate::Result;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

pub trait VideoBackend {
    type Clip;

    /// Opens `path` for decoding. Unreadable input → `Decode`.
    fn open(&self, path: &Path) -> Result<Self::Clip>;

    /// Clip length in seconds.
    fn duration(&self, clip: &Self::Clip) -> f64;

    /// Restricts the clip to `[start, end)` seconds.
    fn trim(&self, clip: &mut Self::Clip, start_seconds: u32, end_seconds: u32) -> Result<()>;

    fn resize(&self, clip: &mut Self::Clip, width: u32, height: u32);

    fn write_video(&self, clip: &Self::Clip, output: &Path, plan: &Mp4Plan) -> Result<()>;

    fn write_gif(&self, clip: &Self::Clip, output: &Path, plan: &GifPlan) -> Result<()>;

    fn close(&self, clip: Self::Clip);

    /// Temporary files an encode towards `output` may leave behind
    /// (pass logs, temporary audio). Deleted when the encode fails.
    fn scratch_artifacts(&self, _output: &Path) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Owns an opened clip; closes it through its backend when dropped.
pub struct ClipGuard<'a, B: VideoBackend + ?Sized> {
    backend: &'a B,
    clip: ManuallyDrop<B::Clip>,
}

impl<'a, B: VideoBackend + ?Sized> ClipGuard<'a, B> {
    pub fn open(backend: &'a B, path: &Path) -> Result<Self> {
        let clip = backend.open(path)?;
        Ok(Self {
            backend,
            clip: ManuallyDrop::new(clip),
        })
    }

    pub fn clip(&self) -> &B::Clip {
        &self.clip
    }

    pub fn clip_mut(&mut self) -> &mut B::Clip {
        &mut self.clip
    }

    pub fn duration(&self) -> f64 {
        self.backend.duration(&self.clip)
    }
}

impl<B: VideoBackend + ?Sized> Drop for ClipGuard<'_, B> {
    fn drop(&mut self) {
        // SAFETY: `self.clip` is never touched again after this point.
        let clip = unsafe { ManuallyDrop::take(&mut self.clip) };
        self.backend.close(clip);
    }
}
