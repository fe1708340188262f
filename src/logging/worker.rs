//! The writer task
//!
//! Runs on the logger's dedicated thread and processes commands strictly one
//! at a time. It is the only owner of the live configuration and the config
//! store, and the only code that touches log files.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;

use crate::config::{BoxedConfigStore, LoggerConfig, Settings, TomlConfigStore};
use crate::error::LoggerError;

use super::clock::SharedClock;
use super::console::SharedConsole;
use super::level::LogLevel;
use super::record::LogRecord;
use super::retention;

/// Call-site name used for the writer's own notices
const NOTICE_SITE: &str = "daylog::writer";

/// Acknowledgement channel for blocking requests
pub(crate) type Ack = SyncSender<()>;

/// A line that reached a log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogWritten {
    pub level: LogLevel,
    /// The formatted line, newline included
    pub line: String,
}

/// Requests handled by the writer, in submission order
pub(crate) enum Command {
    Log {
        record: LogRecord,
        ack: Option<Ack>,
    },
    SetLevel(i64),
    SetRetentionDays(i64),
    SetFilenamePattern(String),
    SetDirectory {
        path: PathBuf,
        reply: SyncSender<Result<(), LoggerError>>,
    },
    Reconfigure(PathBuf),
    ReloadConfig,
    CurrentPath(SyncSender<PathBuf>),
    Flush(Ack),
    Shutdown(Ack),
}

/// Where a record being written came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Submitted by application code
    Caller,
    /// One of the writer's own notices
    Internal,
}

enum Event {
    Command(Option<Command>),
    Sync,
}

pub(crate) struct Worker {
    config: LoggerConfig,
    store: BoxedConfigStore,
    default_dir: PathBuf,
    clock: SharedClock,
    console: SharedConsole,
    written: broadcast::Sender<LogWritten>,
    max_name_len: Arc<AtomicUsize>,
    /// Notices waiting to be persisted after the current command
    notices: VecDeque<LogRecord>,
}

impl Worker {
    pub(crate) fn new(
        config: LoggerConfig,
        store: BoxedConfigStore,
        default_dir: PathBuf,
        clock: SharedClock,
        console: SharedConsole,
        written: broadcast::Sender<LogWritten>,
        max_name_len: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            config,
            store,
            default_dir,
            clock,
            console,
            written,
            max_name_len,
            notices: VecDeque::new(),
        }
    }

    /// Drain `commands` until shutdown, reloading the config every `sync_interval`
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        sync_interval: Duration,
    ) {
        let first_tick = tokio::time::Instant::now() + sync_interval;
        let mut sync_timer = tokio::time::interval_at(first_tick, sync_interval);
        sync_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = tokio::select! {
                command = commands.recv() => Event::Command(command),
                _ = sync_timer.tick() => Event::Sync,
            };

            match event {
                Event::Sync => {
                    self.reload_config();
                    self.drain_notices();
                }
                Event::Command(None) => break,
                Event::Command(Some(Command::Shutdown(ack))) => {
                    // Stop the timer before anything is torn down
                    drop(sync_timer);
                    commands.close();
                    self.drain_notices();
                    let _ = ack.send(());
                    return;
                }
                Event::Command(Some(command)) => {
                    let ack = self.handle(command);
                    self.drain_notices();
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                }
            }
        }
    }

    /// Process one command, returning the acknowledgement to send once its
    /// follow-up notices are written
    fn handle(&mut self, command: Command) -> Option<Ack> {
        match command {
            Command::Log { record, ack } => {
                self.write_record(&record, Origin::Caller);
                ack
            }
            Command::SetLevel(level) => {
                self.config.set_level(level);
                None
            }
            Command::SetRetentionDays(days) => {
                self.config.set_retention_days(days);
                None
            }
            Command::SetFilenamePattern(pattern) => {
                self.config.set_filename_pattern(pattern);
                None
            }
            Command::SetDirectory { path, reply } => {
                let result = self.config.set_directory(path);
                if let Err(e) = &result {
                    self.notice(LogLevel::Critical, line!(), e.to_string(), Origin::Caller);
                }
                let _ = reply.send(result);
                None
            }
            Command::Reconfigure(path) => {
                self.reconfigure(path);
                None
            }
            Command::ReloadConfig => {
                self.reload_config();
                None
            }
            Command::CurrentPath(reply) => {
                let _ = reply.send(self.config.file_path(self.today()));
                None
            }
            Command::Flush(ack) => Some(ack),
            Command::Shutdown(ack) => Some(ack),
        }
    }

    fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    fn max_name_len(&self) -> usize {
        self.max_name_len.load(Ordering::Relaxed)
    }

    /// Filter, rotate and append one record
    fn write_record(&mut self, record: &LogRecord, origin: Origin) {
        if !self.config.threshold().admits(record.level) {
            return;
        }

        let path = self.config.file_path(self.today());
        // No file for today yet: first write ever or the date rolled over
        let is_new_file = !path.exists();

        let mut file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(e) => {
                self.notice(
                    LogLevel::Critical,
                    line!(),
                    format!("Failed to open log file {}: {}", path.display(), e),
                    origin,
                );
                return;
            }
        };

        if is_new_file {
            self.notice(
                LogLevel::Info,
                line!(),
                format!("Created new log file: {}", path.display()),
                origin,
            );
            self.sweep(origin);
        }

        let line = record.file_line();
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
            self.notice(
                LogLevel::Critical,
                line!(),
                format!("Failed to write log file {}: {}", path.display(), e),
                origin,
            );
            return;
        }
        drop(file);

        // Nobody listening is fine
        let _ = self.written.send(LogWritten {
            level: record.level,
            line,
        });
    }

    /// Delete files outside the retention window, reporting each deletion
    fn sweep(&mut self, origin: Origin) {
        let dir = self.config.directory().to_path_buf();
        self.notice(
            LogLevel::Info,
            line!(),
            format!("Removing expired logs from {}", dir.display()),
            origin,
        );

        match retention::cleanup_old_logs(&dir, self.config.retention_days(), self.today()) {
            Ok(report) => {
                for path in report.deleted {
                    self.notice(
                        LogLevel::Info,
                        line!(),
                        format!("Deleted expired log file {}", path.display()),
                        origin,
                    );
                }
                for (path, e) in report.failed {
                    self.notice(
                        LogLevel::Critical,
                        line!(),
                        format!("Failed to delete expired log file {}: {}", path.display(), e),
                        origin,
                    );
                }
                for (path, e) in report.unchecked {
                    self.notice(
                        LogLevel::Warning,
                        line!(),
                        format!("Could not check age of {}: {}", path.display(), e),
                        origin,
                    );
                }
            }
            Err(e) => {
                self.notice(LogLevel::Critical, line!(), format!("{:#}", e), origin);
            }
        }

        self.notice(
            LogLevel::Info,
            line!(),
            format!("Finished removing expired logs from {}", dir.display()),
            origin,
        );
    }

    /// Re-read the store and apply it
    ///
    /// An unreadable store leaves the current settings in place. A log
    /// directory that cannot be created is fatal: there is no caller to report
    /// it to and nothing more can be persisted.
    fn reload_config(&mut self) {
        let settings = self
            .store
            .reload()
            .and_then(|()| Settings::read(self.store.as_mut(), &self.default_dir));

        let settings = match settings {
            Ok(settings) => settings,
            Err(e) => {
                self.notice(
                    LogLevel::Critical,
                    line!(),
                    format!("Failed to read logger config, keeping current settings: {}", e),
                    Origin::Caller,
                );
                return;
            }
        };

        if let Err(e) = self.config.apply(&settings) {
            self.fatal(e);
        }
    }

    /// Switch to the config file at `path`; the old directory is swept first
    fn reconfigure(&mut self, path: PathBuf) {
        if self.store.location() == Some(path.as_path()) {
            return;
        }

        self.notice(
            LogLevel::Info,
            line!(),
            format!("Switching logger config to {}", path.display()),
            Origin::Caller,
        );
        self.store = Box::new(TomlConfigStore::new(path));
        self.sweep(Origin::Caller);
        self.reload_config();
    }

    /// Print a notice at once and queue it for the log file
    ///
    /// Queued notices pass the level filter like any other record. Notices
    /// raised while persisting a notice stay on the console so a broken log
    /// directory cannot feed itself.
    fn notice(&mut self, level: LogLevel, line: u32, message: String, origin: Origin) {
        let record = LogRecord::new(
            self.clock.now(),
            level,
            NOTICE_SITE,
            line,
            message,
            self.max_name_len(),
        );
        self.console.write_record(&record);

        if origin == Origin::Caller {
            self.notices.push_back(record);
        }
    }

    /// Report a startup problem that did not stop the logger
    pub(crate) fn startup_notice(&mut self, message: String) {
        self.notice(LogLevel::Critical, line!(), message, Origin::Caller);
    }

    fn drain_notices(&mut self) {
        while let Some(record) = self.notices.pop_front() {
            self.write_record(&record, Origin::Internal);
        }
    }

    fn fatal(&mut self, error: LoggerError) -> ! {
        let record = LogRecord::new(
            self.clock.now(),
            LogLevel::Fatal,
            NOTICE_SITE,
            line!(),
            error.to_string(),
            self.max_name_len(),
        );
        self.console.write_record(&record);
        std::process::abort();
    }

    #[cfg(test)]
    pub(crate) fn config(&self) -> &LoggerConfig {
        &self.config
    }
}
