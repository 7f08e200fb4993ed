//! `MM:SS` trim strings ⇄ whole seconds

use crate::{CompressError, Result};

/// Parses `MM:SS` into seconds.
///
/// Any malformed input (wrong number of components, non-numeric parts,
/// overflow) yields `0` rather than an error, so a mistyped end time turns
/// into `00:00` and the trim window is later rejected as empty. Use
/// [`parse_mmss_strict`] to surface the mistake instead.
pub fn parse_mmss(text: &str) -> u32 {
    split_mmss(text).unwrap_or(0)
}

pub fn parse_mmss_strict(text: &str) -> Result<u32> {
    split_mmss(text).ok_or_else(|| CompressError::invalid_input("time (expected MM:SS)", text))
}

fn split_mmss(text: &str) -> Option<u32> {
    let (minutes, seconds) = text.split_once(':')?;
    if seconds.contains(':') {
        return None;
    }
    let minutes: u32 = minutes.trim().parse().ok()?;
    let seconds: u32 = seconds.trim().parse().ok()?;
    minutes.checked_mul(60)?.checked_add(seconds)
}

/// 150 → "02:30". Minutes are not rolled over into hours.
pub fn format_seconds(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Formats a probed duration, dropping the fractional second.
pub fn format_clip_duration(seconds: f64) -> String {
    format_seconds(whole_seconds(seconds))
}

/// Truncates a probed duration to whole seconds (negative/NaN → 0).
pub fn whole_seconds(seconds: f64) -> u32 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.min(u32::MAX as f64) as u32
    } else {
        0
    }
}
