//! daylog - process-wide logging into daily rotating files
//!
//! Every record is echoed to the console at once and, if it passes the
//! configured level threshold, appended to `<dir>/<pattern with date>` by a
//! background writer. Old files are swept by age whenever a new day's file is
//! started.
//!
//! ```no_run
//! use daylog::{info, warning, LoggerOptions};
//!
//! fn main() -> Result<(), daylog::LoggerError> {
//!     let _guard = daylog::init(LoggerOptions::new().config_path("log.toml"))?;
//!     info!("service started");
//!     warning!("disk at {}%", 91);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use error::{ConfigError, LoggerError};
pub use logging::{init, DaylogLayer, DispatchMode, LogLevel, Logger, LoggerOptions, LoggingGuard};
