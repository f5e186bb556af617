//! Terminal colour control for the plain report.
//!
//! Colours are disabled by `--no-color`, the `NO_COLOR` environment
//! variable, or when stdout is not a terminal. When disabled every styling
//! method returns the text unchanged.

use std::sync::atomic::{AtomicBool, Ordering};

/// Global color enable flag.
static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Disable all colors globally.
pub fn disable_colors() {
    COLORS_ENABLED.store(false, Ordering::Relaxed);
    owo_colors::set_override(false);
}

/// Check if colors are currently enabled.
pub fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

/// Semantic styles for report text.
///
/// All methods respect the global color enable state set by `disable_colors()`.
pub trait Themed: owo_colors::OwoColorize {
    /// Section banners (bold).
    fn section_header(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::bold(self))
        } else {
            self.to_string()
        }
    }

    /// Field names (cyan).
    fn label(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::cyan(self))
        } else {
            self.to_string()
        }
    }

    /// Style for success messages (green + bold).
    fn success(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!(
                "{}",
                owo_colors::OwoColorize::bold(&owo_colors::OwoColorize::green(self))
            )
        } else {
            self.to_string()
        }
    }

    /// Style for warning messages (yellow).
    fn warning(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!("{}", owo_colors::OwoColorize::yellow(self))
        } else {
            self.to_string()
        }
    }

    /// Style for error messages (red + bold).
    fn error_style(&self) -> String
    where
        Self: std::fmt::Display,
    {
        if colors_enabled() {
            format!(
                "{}",
                owo_colors::OwoColorize::bold(&owo_colors::OwoColorize::red(self))
            )
        } else {
            self.to_string()
        }
    }
}

impl Themed for String {}
impl Themed for &str {}
impl Themed for i32 {}
impl Themed for usize {}

#[cfg(test)]
pub(crate) fn reset_colors() {
    COLORS_ENABLED.store(true, Ordering::Relaxed);
    owo_colors::set_override(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(colors)]
    fn test_disable_colors() {
        reset_colors();
        assert!(colors_enabled());
        disable_colors();
        assert!(!colors_enabled());
        reset_colors();
    }

    #[test]
    #[serial(colors)]
    fn test_themed_with_colors() {
        reset_colors();
        let colored = "COMPLETED".success();
        assert!(colored.contains("\x1b["), "Expected ANSI escape codes");
        assert!(colored.contains("COMPLETED"));
    }

    #[test]
    #[serial(colors)]
    fn test_themed_without_colors() {
        reset_colors();
        disable_colors();

        assert_eq!("x".section_header(), "x");
        assert_eq!("x".label(), "x");
        assert_eq!("x".success(), "x");
        assert_eq!("x".warning(), "x");
        assert_eq!("x".error_style(), "x");
        assert_eq!(42i32.success(), "42");
        assert_eq!(3usize.label(), "3");

        reset_colors();
    }
}
