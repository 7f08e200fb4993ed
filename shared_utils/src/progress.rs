//! Terminal progress bars (indicatif)

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Resolution of the encode bar: progress fractions are mapped onto 0..=1000.
pub const PROGRESS_SCALE: u64 = 1000;

const ENCODE_TEMPLATE: &str =
    "{spinner:.green} {prefix:.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg} (ETA {eta})";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";
const PROGRESS_CHARS: &str = "█▓░";

/// Bar for a single encode, driven by [`set_fraction`].
pub fn create_encode_progress_bar(prefix: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_SCALE);

    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    pb.set_style(
        ProgressStyle::default_bar()
            .template(ENCODE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(PROGRESS_CHARS)
            .tick_chars(SPINNER_CHARS),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn create_spinner(message: &str, visible: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();

    if !visible {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }

    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(SPINNER_CHARS),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Moves the bar to `fraction` (clamped to 0.0..=1.0). Never moves backwards.
pub fn set_fraction(pb: &ProgressBar, fraction: f64) {
    let pos = (fraction.clamp(0.0, 1.0) * PROGRESS_SCALE as f64) as u64;
    if pos > pb.position() {
        pb.set_position(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_fraction_is_monotonic_and_clamped() {
        let pb = create_encode_progress_bar("test", false);
        set_fraction(&pb, 0.5);
        assert_eq!(pb.position(), 500);
        set_fraction(&pb, 0.25);
        assert_eq!(pb.position(), 500);
        set_fraction(&pb, 7.0);
        assert_eq!(pb.position(), PROGRESS_SCALE);
    }
}
