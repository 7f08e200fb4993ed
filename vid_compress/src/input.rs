//! Parsing of user-typed option values (sizes, resolutions, frame rates, times)

use crate::plan::TrimWindow;
use crate::timecode::{parse_mmss, parse_mmss_strict, whole_seconds};
use crate::{CompressError, Result};

pub const DEFAULT_SIZE_MB: u32 = 10;
pub const SIZE_PRESETS: [&str; 3] = ["8MB", "10MB", "25MB"];
pub const DEFAULT_GIF_FPS: u32 = 25;
pub const DEFAULT_GIF_HEIGHT: u32 = 240;
pub const GIF_HEIGHT_PRESETS: [u32; 5] = [240, 320, 480, 720, 1080];
pub const DEFAULT_START: &str = "00:00";

/// `"8MB"`, `"25mb"` or a bare custom integer like `"42"`.
pub fn parse_size_mb(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = match trimmed.len().checked_sub(2).and_then(|i| trimmed.split_at_checked(i)) {
        Some((number, unit)) if !number.is_empty() && unit.eq_ignore_ascii_case("mb") => {
            number.trim_end()
        }
        _ => trimmed,
    };
    match digits.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CompressError::invalid_input("size", text)),
    }
}

/// Positive integer option (`resolution`, `fps`).
pub fn parse_positive(field: &'static str, text: &str) -> Result<u32> {
    match text.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CompressError::invalid_input(field, text)),
    }
}

/// Trim window from the optional start/end fields.
///
/// A missing end means "until the end of the clip". With `strict` unset, a
/// malformed time counts as `00:00` and the window is rejected downstream.
pub fn trim_window(
    start: Option<&str>,
    end: Option<&str>,
    clip_duration: f64,
    strict: bool,
) -> Result<TrimWindow> {
    let parse = |text: &str| -> Result<u32> {
        if strict {
            parse_mmss_strict(text)
        } else {
            Ok(parse_mmss(text))
        }
    };
    let start_seconds = parse(start.unwrap_or(DEFAULT_START))?;
    let end_seconds = match end {
        Some(text) => parse(text)?,
        None => whole_seconds(clip_duration),
    };
    Ok(TrimWindow::new(start_seconds, end_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_presets_and_custom() {
        assert_eq!(parse_size_mb("8MB").unwrap(), 8);
        assert_eq!(parse_size_mb("10MB").unwrap(), 10);
        assert_eq!(parse_size_mb("25mb").unwrap(), 25);
        assert_eq!(parse_size_mb("42").unwrap(), 42);
        assert_eq!(parse_size_mb(" 16 MB ").unwrap(), 16);
        for preset in SIZE_PRESETS {
            assert!(parse_size_mb(preset).is_ok());
        }
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        for bad in ["abc", "", "MB", "0", "-5", "1.5", "10GB"] {
            let err = parse_size_mb(bad).unwrap_err();
            assert!(
                matches!(err, CompressError::InvalidInput { field: "size", .. }),
                "{bad:?} accepted"
            );
            assert!(err.user_message().contains("Invalid custom size"));
        }
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("resolution", "480").unwrap(), 480);
        let err = parse_positive("resolution", "tall").unwrap_err();
        assert!(err.user_message().contains("Invalid custom resolution"));
        assert!(parse_positive("fps", "0").is_err());
        for h in GIF_HEIGHT_PRESETS {
            assert_eq!(parse_positive("resolution", &h.to_string()).unwrap(), h);
        }
    }

    #[test]
    fn test_trim_window_defaults_to_whole_clip() {
        let w = trim_window(None, None, 95.7, false).unwrap();
        assert_eq!(w, TrimWindow::new(0, 95));
    }

    #[test]
    fn test_trim_window_lenient_vs_strict() {
        assert_eq!(
            trim_window(Some("00:10"), Some("oops"), 60.0, false).unwrap(),
            TrimWindow::new(10, 0)
        );
        assert!(matches!(
            trim_window(Some("00:10"), Some("oops"), 60.0, true),
            Err(CompressError::InvalidInput { .. })
        ));
        assert_eq!(
            trim_window(Some("00:10"), Some("00:40"), 60.0, true).unwrap(),
            TrimWindow::new(10, 40)
        );
    }
}
