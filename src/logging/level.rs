//! Severity levels and the persisted-level threshold

use crossterm::style::{Color, Stylize};
use serde::Serialize;

/// Severity of a log record, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Critical,
    Fatal,
}

impl LogLevel {
    /// All levels, least severe first
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Critical,
        LogLevel::Fatal,
    ];

    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Whether console output for this level goes to stderr
    pub fn is_alert(&self) -> bool {
        *self >= LogLevel::Warning
    }

    /// Terminal colour of the level tag
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::DarkGrey,
            LogLevel::Info => Color::Blue,
            LogLevel::Warning => Color::Yellow,
            LogLevel::Critical | LogLevel::Fatal => Color::Red,
        }
    }

    /// The tag padded to the fixed column width, e.g. `"INFO    "`
    pub fn padded_tag(&self) -> String {
        format!("{:<width$}", self.as_str(), width = TAG_WIDTH)
    }

    /// Padded tag with ANSI styling for terminals
    pub fn styled_tag(&self) -> String {
        // Padding goes outside the escape codes so columns stay aligned
        let pad = " ".repeat(TAG_WIDTH - self.as_str().len());
        format!("{}{}", self.as_str().with(self.color()).bold(), pad)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR => LogLevel::Critical,
        }
    }
}

/// Width of the level column (length of `CRITICAL`)
pub const TAG_WIDTH: usize = 8;

/// Which records reach the log file
///
/// A monotonic cutoff with three modes. Console output is never filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LevelThreshold(u8);

impl LevelThreshold {
    pub const ALL: LevelThreshold = LevelThreshold(0);
    pub const NO_DEBUG: LevelThreshold = LevelThreshold(1);
    pub const WARNINGS: LevelThreshold = LevelThreshold(2);

    /// Build a threshold from a raw config value, clamping into `0..=2`
    pub fn from_raw(raw: i64) -> Self {
        LevelThreshold(raw.clamp(0, 2) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether a record of `level` is persisted under this threshold
    pub fn admits(&self, level: LogLevel) -> bool {
        match self.0 {
            0 => true,
            1 => level != LogLevel::Debug,
            _ => level >= LogLevel::Warning,
        }
    }
}

impl Default for LevelThreshold {
    fn default() -> Self {
        LevelThreshold::NO_DEBUG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Critical);
        assert!(LogLevel::Critical < LogLevel::Fatal);
    }

    #[test]
    fn test_padded_tags() {
        assert_eq!(LogLevel::Debug.padded_tag(), "DEBUG   ");
        assert_eq!(LogLevel::Info.padded_tag(), "INFO    ");
        assert_eq!(LogLevel::Warning.padded_tag(), "WARNING ");
        assert_eq!(LogLevel::Critical.padded_tag(), "CRITICAL");
        assert_eq!(LogLevel::Fatal.padded_tag(), "FATAL   ");
    }

    #[test]
    fn test_styled_tag_keeps_padding() {
        let styled = LogLevel::Info.styled_tag();
        assert!(styled.contains("INFO"));
        assert!(styled.ends_with("    "));
    }

    #[test]
    fn test_alert_levels() {
        assert!(!LogLevel::Debug.is_alert());
        assert!(!LogLevel::Info.is_alert());
        assert!(LogLevel::Warning.is_alert());
        assert!(LogLevel::Critical.is_alert());
        assert!(LogLevel::Fatal.is_alert());
    }

    #[test]
    fn test_threshold_clamps() {
        assert_eq!(LevelThreshold::from_raw(-5).value(), 0);
        assert_eq!(LevelThreshold::from_raw(1).value(), 1);
        assert_eq!(LevelThreshold::from_raw(7).value(), 2);
    }

    #[test]
    fn test_threshold_cutoff_table() {
        let expected = [
            (0, [true, true, true, true, true]),
            (1, [false, true, true, true, true]),
            (2, [false, false, true, true, true]),
        ];

        for (raw, row) in expected {
            let threshold = LevelThreshold::from_raw(raw);
            for (level, admitted) in LogLevel::ALL.into_iter().zip(row) {
                assert_eq!(
                    threshold.admits(level),
                    admitted,
                    "threshold {} level {}",
                    raw,
                    level
                );
            }
        }
    }

    #[test]
    fn test_from_tracing_level() {
        assert_eq!(LogLevel::from(tracing::Level::TRACE), LogLevel::Debug);
        assert_eq!(LogLevel::from(tracing::Level::WARN), LogLevel::Warning);
        assert_eq!(LogLevel::from(tracing::Level::ERROR), LogLevel::Critical);
    }
}
