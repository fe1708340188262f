//! Logging system for daylog
//!
//! Records are printed on the caller's thread and persisted by a dedicated
//! writer thread into one file per calendar day. A retention sweep runs
//! whenever a new file is started, and the settings are re-read from the
//! config store periodically.

mod bridge;
mod clock;
mod console;
mod level;
mod logger;
mod macros;
mod record;
mod retention;
mod worker;

pub use bridge::DaylogLayer;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use console::{CapturedConsole, ConsoleWriter, SharedConsole, TerminalConsole};
pub use level::{LevelThreshold, LogLevel, TAG_WIDTH};
pub use logger::{init, DispatchMode, Logger, LoggerOptions, LoggingGuard, DEFAULT_SYNC_INTERVAL};
pub use record::{display_name, function_path, LogRecord, DEFAULT_MAX_NAME_LEN};
pub use retention::{age_in_days, cleanup_old_logs, is_expired, SweepReport};
pub use worker::LogWritten;
