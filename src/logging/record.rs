//! Log records and line formatting
//!
//! A record is built once on the emitting thread; the console and the file
//! share the same layout:
//!
//! ```text
//! HH:MM:SS.mmm | WARNING  | doWork                        , line   42 | message
//! ```

use chrono::{DateTime, Local};

use super::level::LogLevel;

/// Default width of the call-site column
pub const DEFAULT_MAX_NAME_LEN: usize = 30;

const ELLIPSIS: &str = "...";

/// Qualifier keywords stripped from the front of a call-site signature
const QUALIFIERS: &[&str] = &["virtual "];

/// A single formatted-ready log record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Local time the record was emitted
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    /// Call-site name, already truncated and padded to the column width
    pub call_site: String,
    pub line: u32,
    pub message: String,
}

impl LogRecord {
    /// Build a record from a raw call-site signature such as `"void Worker::run(int)"`
    pub fn new(
        timestamp: DateTime<Local>,
        level: LogLevel,
        signature: &str,
        line: u32,
        message: impl Into<String>,
        max_name_len: usize,
    ) -> Self {
        Self {
            timestamp,
            level,
            call_site: display_name(signature, max_name_len),
            line,
            message: message.into(),
        }
    }

    /// Everything after the level column: `<name>, line <n> | <message>`
    pub fn body(&self) -> String {
        format!("{}, line {:>4} | {}", self.call_site, self.line, self.message)
    }

    /// `HH:MM:SS.mmm`
    pub fn time(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }

    /// The plain line written to the log file, newline included
    pub fn file_line(&self) -> String {
        format!("{} | {} | {}\n", self.time(), self.level.padded_tag(), self.body())
    }

    /// The console line with a coloured level tag, without newline
    pub fn console_line(&self) -> String {
        format!("{} | {} | {}", self.time(), self.level.styled_tag(), self.body())
    }
}

/// Reduce a call-site signature to a bare, fixed-width name
///
/// The argument list and anything before the last space (return type,
/// qualifiers) are dropped. An empty result becomes `...`; a result longer
/// than `max_len` is cut to exactly `max_len` characters ending in `...`.
pub fn display_name(signature: &str, max_len: usize) -> String {
    let name = bare_name(signature);
    let max_len = max_len.max(ELLIPSIS.len());

    let name = if name.is_empty() {
        ELLIPSIS.to_string()
    } else if name.chars().count() > max_len {
        let kept: String = name.chars().take(max_len - ELLIPSIS.len()).collect();
        kept + ELLIPSIS
    } else {
        name.to_string()
    };

    format!("{:<width$}", name, width = max_len)
}

fn bare_name(signature: &str) -> &str {
    let mut name = match signature.find('(') {
        Some(pos) => &signature[..pos],
        None => signature,
    };

    for qualifier in QUALIFIERS {
        if let Some(rest) = name.strip_prefix(qualifier) {
            name = rest;
        }
    }

    match name.rfind(' ') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Trim a type-name path of the form `crate::module::function::f` to `function`'s
/// last two segments, e.g. `worker::run`
///
/// Used by the logging macros, which locate their enclosing function through
/// `std::any::type_name` of a nested item.
pub fn function_path(raw: &'static str) -> &'static str {
    let mut path = raw.strip_suffix("::f").unwrap_or(raw);
    while let Some(stripped) = path.strip_suffix("::{{closure}}") {
        path = stripped;
    }

    let mut separators = path.rmatch_indices("::").map(|(pos, _)| pos);
    separators.next();
    match separators.next() {
        Some(pos) => &path[pos + 2..],
        None => path,
    }
}
