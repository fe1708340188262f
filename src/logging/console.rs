//! Console output of log records

use std::io::Write;
use std::sync::{Arc, Mutex};

use super::level::LogLevel;
use super::record::LogRecord;

/// Destination for the immediate, unfiltered console copy of every record
///
/// Implementations:
/// - `TerminalConsole`: stdout for Debug/Info, stderr for the rest, coloured tags
/// - `CapturedConsole`: keeps plain lines in memory, for tests and embedders
pub trait ConsoleWriter: Send + Sync {
    fn write_record(&self, record: &LogRecord);
}

/// Type alias for an Arc-wrapped console writer
pub type SharedConsole = Arc<dyn ConsoleWriter>;

/// Writes to the process' standard streams
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl ConsoleWriter for TerminalConsole {
    fn write_record(&self, record: &LogRecord) {
        let line = record.console_line();
        // A closed stream must not take the caller down
        if record.level.is_alert() {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        } else {
            let _ = writeln!(std::io::stdout().lock(), "{}", line);
        }
    }
}

/// Collects console lines without colour codes
#[derive(Debug, Clone, Default)]
pub struct CapturedConsole {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines in emission order
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Captured lines whose text contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(_, line)| line.contains(needle))
            .map(|(_, line)| line)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
    }
}

impl ConsoleWriter for CapturedConsole {
    fn write_record(&self, record: &LogRecord) {
        if let Ok(mut lines) = self.lines.lock() {
            let line = record.file_line();
            lines.push((record.level, line.trim_end().to_string()));
        }
    }
}
