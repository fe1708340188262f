//! The process-wide logger
//!
//! `Logger` is a cheap front for the writer thread. Producers format and print
//! on their own thread, then hand the record over a channel; the writer does
//! the filtering, rotation and file I/O.
//!
//! The global instance is created on first use of [`Logger::instance`], or
//! explicitly with [`crate::init`], and lives until [`Logger::shutdown`] or
//! the drop of the [`LoggingGuard`] returned by `init`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::{
    default_config_path, default_log_dir, BoxedConfigStore, LoggerConfig, Settings,
    TomlConfigStore,
};
use crate::error::LoggerError;

use super::clock::{SharedClock, SystemClock};
use super::console::{SharedConsole, TerminalConsole};
use super::level::LogLevel;
use super::record::{LogRecord, DEFAULT_MAX_NAME_LEN};
use super::worker::{Command, LogWritten, Worker};

/// How often the writer re-reads its config store
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Lines kept for slow "log written" subscribers before they start lagging
const WRITTEN_CAPACITY: usize = 1024;

const WRITER_THREAD_NAME: &str = "daylog-writer";

static GLOBAL: OnceLock<Logger> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = Mutex::new(());

/// How records reach the writer thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Hand off and return immediately
    #[default]
    Queued,
    /// Wait until the writer has processed the record
    ///
    /// Gives a strict global order across threads; meant for tests.
    Blocking,
}

/// Everything needed to start a logger
pub struct LoggerOptions {
    store: Option<BoxedConfigStore>,
    config_path: PathBuf,
    default_dir: PathBuf,
    console: SharedConsole,
    clock: SharedClock,
    dispatch: DispatchMode,
    max_name_len: usize,
    sync_interval: Duration,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            store: None,
            config_path: default_config_path(),
            default_dir: default_log_dir(),
            console: Arc::new(TerminalConsole),
            clock: Arc::new(SystemClock),
            dispatch: DispatchMode::Queued,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

impl LoggerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from the TOML file at `path`
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Read settings from `store` instead of a file
    pub fn store(mut self, store: BoxedConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Log directory written into the store when it has none
    pub fn default_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_dir = dir.into();
        self
    }

    pub fn console(mut self, console: SharedConsole) -> Self {
        self.console = console;
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    pub fn max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }
}

/// Handle to a running logger
pub struct Logger {
    commands: mpsc::UnboundedSender<Command>,
    written: broadcast::Sender<LogWritten>,
    console: SharedConsole,
    clock: SharedClock,
    max_name_len: Arc<AtomicUsize>,
    blocking: AtomicBool,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    /// Start a logger with its own writer thread
    ///
    /// Settings are read before this returns; missing keys are written back
    /// with their defaults. Fails if the log directory cannot be created.
    /// Applications normally use [`Logger::instance`] or [`crate::init`].
    pub fn start(options: LoggerOptions) -> Result<Self, LoggerError> {
        let LoggerOptions {
            store,
            config_path,
            default_dir,
            console,
            clock,
            dispatch,
            max_name_len,
            sync_interval,
        } = options;

        let mut store = store.unwrap_or_else(|| Box::new(TomlConfigStore::new(config_path)));
        let read = store
            .reload()
            .and_then(|()| Settings::read(store.as_mut(), &default_dir));
        let (settings, startup_problem) = match read {
            Ok(settings) => (settings, None),
            Err(e) => (
                Settings::defaults(&default_dir),
                Some(format!("Failed to read logger config, using defaults: {}", e)),
            ),
        };

        let config = LoggerConfig::from_settings(&settings)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(LoggerError::Runtime)?;

        let (commands, receiver) = mpsc::unbounded_channel();
        let (written, _) = broadcast::channel(WRITTEN_CAPACITY);
        let max_name_len = Arc::new(AtomicUsize::new(max_name_len));

        let mut worker = Worker::new(
            config,
            store,
            default_dir,
            Arc::clone(&clock),
            Arc::clone(&console),
            written.clone(),
            Arc::clone(&max_name_len),
        );
        if let Some(problem) = startup_problem {
            worker.startup_notice(problem);
        }

        let writer = std::thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(worker.run(receiver, sync_interval)))
            .map_err(LoggerError::Spawn)?;

        Ok(Self {
            commands,
            written,
            console,
            clock,
            max_name_len,
            blocking: AtomicBool::new(dispatch == DispatchMode::Blocking),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// The process-wide logger, started with default options on first call
    ///
    /// # Panics
    ///
    /// Panics if the logger has to be started and its log directory cannot be
    /// created. Use [`crate::init`] to handle that case as an error.
    pub fn instance() -> &'static Logger {
        if let Some(logger) = GLOBAL.get() {
            return logger;
        }

        let _init = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        GLOBAL.get_or_init(|| {
            Logger::start(LoggerOptions::default())
                .unwrap_or_else(|e| panic!("daylog: cannot start the global logger: {}", e))
        })
    }

    /// The process-wide logger if it has been started
    pub fn get() -> Option<&'static Logger> {
        GLOBAL.get()
    }

    /// Point the global logger at another config file
    ///
    /// Starts the global logger if needed, like the rest of the global API.
    pub fn set_config_path(path: impl AsRef<Path>) {
        Logger::instance().reconfigure(path);
    }

    /// Format, print and hand over one message
    ///
    /// The console line is written here, unfiltered. The record then goes to
    /// the writer according to the dispatch mode; Fatal records always wait
    /// for the writer so they are on disk before the caller carries on.
    pub fn emit(&self, level: LogLevel, call_site: &str, line: u32, message: impl Into<String>) {
        let record = LogRecord::new(
            self.clock.now(),
            level,
            call_site,
            line,
            message,
            self.max_name_len(),
        );
        self.console.write_record(&record);

        let blocking = level == LogLevel::Fatal || self.dispatch_mode() == DispatchMode::Blocking;
        self.dispatch(record, blocking);
    }

    /// Hand a prepared record to the writer without printing it
    pub fn log(&self, record: LogRecord) {
        self.dispatch(record, self.dispatch_mode() == DispatchMode::Blocking);
    }

    fn dispatch(&self, record: LogRecord, blocking: bool) {
        if !blocking {
            // A stopped writer drops late records
            let _ = self.commands.send(Command::Log { record, ack: None });
            return;
        }

        let (ack, done) = sync_channel(1);
        if self
            .commands
            .send(Command::Log {
                record,
                ack: Some(ack),
            })
            .is_ok()
        {
            let _ = done.recv();
        }
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        if self.blocking.load(Ordering::Relaxed) {
            DispatchMode::Blocking
        } else {
            DispatchMode::Queued
        }
    }

    pub fn set_dispatch_mode(&self, mode: DispatchMode) {
        self.blocking
            .store(mode == DispatchMode::Blocking, Ordering::Relaxed);
    }

    pub fn max_name_len(&self) -> usize {
        self.max_name_len.load(Ordering::Relaxed)
    }

    /// Width of the call-site column; at least 3 so `...` fits
    pub fn set_max_name_len(&self, len: usize) {
        self.max_name_len.store(len.max(3), Ordering::Relaxed);
    }

    /// Set the level threshold (0 all, 1 no Debug, 2 Warning and above)
    pub fn set_level(&self, threshold: i64) {
        let _ = self.commands.send(Command::SetLevel(threshold));
    }

    /// Set the retention window in days; values below 1 mean 1
    pub fn set_retention_days(&self, days: i64) {
        let _ = self.commands.send(Command::SetRetentionDays(days));
    }

    /// Set the filename pattern; `%1` is replaced by the date
    pub fn set_filename_pattern(&self, pattern: impl Into<String>) {
        let _ = self.commands.send(Command::SetFilenamePattern(pattern.into()));
    }

    /// Move logging to `path`, creating the directory
    ///
    /// Waits for the writer. On failure the previous directory stays in use.
    pub fn set_directory(&self, path: impl Into<PathBuf>) -> Result<(), LoggerError> {
        let (reply, result) = sync_channel(1);
        self.commands
            .send(Command::SetDirectory {
                path: path.into(),
                reply,
            })
            .map_err(|_| LoggerError::WorkerGone)?;
        result.recv().map_err(|_| LoggerError::WorkerGone)?
    }

    /// Read settings from the config file at `path` from now on
    ///
    /// A relative path is resolved against the current directory. If it
    /// differs from the current source the old log directory is swept and the
    /// settings reloaded.
    pub fn reconfigure(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let _ = self.commands.send(Command::Reconfigure(path));
    }

    /// Re-read the config store now instead of waiting for the next sync
    pub fn reload_config(&self) {
        let _ = self.commands.send(Command::ReloadConfig);
    }

    /// Listen for lines written to log files
    pub fn subscribe(&self) -> broadcast::Receiver<LogWritten> {
        self.written.subscribe()
    }

    /// Path of the file a record written now would go to
    pub fn log_file_path(&self) -> Result<PathBuf, LoggerError> {
        let (reply, path) = sync_channel(1);
        self.commands
            .send(Command::CurrentPath(reply))
            .map_err(|_| LoggerError::WorkerGone)?;
        path.recv().map_err(|_| LoggerError::WorkerGone)
    }

    /// Wait until everything queued so far has been processed
    pub fn flush(&self) -> Result<(), LoggerError> {
        let (ack, done) = sync_channel(1);
        self.commands
            .send(Command::Flush(ack))
            .map_err(|_| LoggerError::WorkerGone)?;
        done.recv().map_err(|_| LoggerError::WorkerGone)
    }

    /// Stop the writer after the commands already queued
    ///
    /// The config timer is cancelled first; records sent afterwards are
    /// dropped. Safe to call more than once.
    pub fn shutdown(&self) {
        let (ack, done) = sync_channel(1);
        if self.commands.send(Command::Shutdown(ack)).is_ok() {
            let _ = done.recv();
        }

        let writer = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(writer) = writer {
            let _ = writer.join();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Guard that keeps the global logger alive
///
/// Dropping it shuts the global logger down; keep it in `main`.
#[must_use = "dropping the guard stops the logger"]
pub struct LoggingGuard {
    _private: (),
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        if let Some(logger) = GLOBAL.get() {
            logger.shutdown();
        }
    }
}

/// Start the global logger with `options`
///
/// Returns an error instead of panicking when the log directory cannot be
/// created, and [`LoggerError::AlreadyInitialized`] if the global logger
/// already exists.
pub fn init(options: LoggerOptions) -> Result<LoggingGuard, LoggerError> {
    let _init = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if GLOBAL.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    let logger = Logger::start(options)?;
    GLOBAL
        .set(logger)
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    Ok(LoggingGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ConfigStore, MemoryConfigStore, KEY_DIR, KEY_LIFETIME, KEY_LOG_LEVEL, KEY_NAME_PATTERN,
    };
    use crate::logging::clock::{Clock, ManualClock};
    use crate::logging::console::CapturedConsole;
    use chrono::{DateTime, Local, TimeZone};
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct TestLogger {
        logger: Logger,
        console: CapturedConsole,
        clock: ManualClock,
        store: MemoryConfigStore,
        _dir: TempDir,
        logs: PathBuf,
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn test_logger(level: i64) -> TestLogger {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("Logs");
        let store = MemoryConfigStore::with_values([
            (KEY_LOG_LEVEL, toml::Value::Integer(level)),
            (KEY_DIR, toml::Value::String(logs.to_string_lossy().into_owned())),
        ]);
        let console = CapturedConsole::new();
        let clock = ManualClock::new(noon(2026, 6, 15));

        let logger = Logger::start(
            LoggerOptions::new()
                .store(Box::new(store.clone()))
                .default_dir(&logs)
                .console(Arc::new(console.clone()))
                .clock(Arc::new(clock.clone()))
                .dispatch(DispatchMode::Blocking),
        )
        .unwrap();

        TestLogger {
            logger,
            console,
            clock,
            store,
            _dir: dir,
            logs,
        }
    }

    fn file_lines(t: &TestLogger) -> Vec<String> {
        let path = t.logger.log_file_path().unwrap();
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_start_populates_store_and_creates_dir() {
        let t = test_logger(1);
        assert!(t.logs.is_dir());
        assert!(t.store.peek(KEY_LIFETIME).is_some());
        assert!(t.store.peek(KEY_NAME_PATTERN).is_some());
    }

    #[test]
    fn test_start_fails_when_dir_cannot_be_created() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let store = MemoryConfigStore::with_values([(
            KEY_DIR,
            toml::Value::String(blocker.join("Logs").to_string_lossy().into_owned()),
        )]);

        let result = Logger::start(
            LoggerOptions::new()
                .store(Box::new(store))
                .console(Arc::new(CapturedConsole::new())),
        );
        assert!(matches!(result, Err(LoggerError::CreateDirectory { .. })));
    }

    #[test]
    fn test_filtering_table_file_vs_console() {
        for threshold in 0..=2i64 {
            let t = test_logger(threshold);
            for level in LogLevel::ALL {
                t.logger.emit(level, "check(int)", 1, format!("{}-{}", threshold, level));
            }

            let lines = file_lines(&t);
            for level in LogLevel::ALL {
                let needle = format!("| {}-{}", threshold, level);
                let persisted = lines.iter().any(|l| l.ends_with(&needle));
                let expected = match threshold {
                    0 => true,
                    1 => level != LogLevel::Debug,
                    _ => level >= LogLevel::Warning,
                };
                assert_eq!(persisted, expected, "threshold {} level {}", threshold, level);
                assert_eq!(
                    t.console.matching(&needle).len(),
                    1,
                    "console threshold {} level {}",
                    threshold,
                    level
                );
            }
        }
    }

    #[test]
    fn test_records_in_submission_order() {
        let t = test_logger(2);
        for i in 0..50 {
            t.logger.emit(LogLevel::Warning, "producer()", 10, format!("msg {}", i));
        }

        assert_eq!(log_files(&t.logs).len(), 1);
        let lines = file_lines(&t);
        assert_eq!(lines.len(), 50);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.ends_with(&format!("| msg {}", i)), "line {}: {}", i, line);
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let t = test_logger(1);
        t.logger.emit(LogLevel::Debug, "doWork(int)", 42, "x");
        t.logger.emit(LogLevel::Warning, "doWork(int)", 42, "y");

        // The record comes first; the writer's own notices about the new file follow it
        let lines = file_lines(&t);
        let line = &lines[0];
        assert_eq!(&line[12..], " | WARNING  | doWork                        , line   42 | y");
        assert!(lines[1..].iter().all(|l| l.contains("| daylog::writer")));
        assert!(lines[1..].iter().any(|l| l.contains("| INFO     |")));

        let time = &line[..12];
        assert_eq!(time, t.clock.now().format("%H:%M:%S%.3f").to_string());

        assert_eq!(t.console.matching("| x").len(), 1);
    }

    #[test]
    fn test_day_rollover_creates_new_file_and_sweeps_once() {
        let t = test_logger(2);
        t.logger.set_retention_days(30);

        t.logger.emit(LogLevel::Warning, "roll()", 1, "day one");
        let first = t.logger.log_file_path().unwrap();

        // Stale file dropped in after today's sweep already ran
        let stale = t.logs.join("stale.log");
        let file = std::fs::File::create(&stale).unwrap();
        let aged = SystemTime::from(t.clock.now()) - Duration::from_secs(40 * 24 * 60 * 60);
        file.set_modified(aged).unwrap();
        drop(file);

        t.logger.emit(LogLevel::Warning, "roll()", 2, "still day one");
        assert!(stale.exists());

        t.console.clear();
        t.clock.advance(chrono::Duration::days(1));
        t.logger.emit(LogLevel::Warning, "roll()", 3, "day two");
        let second = t.logger.log_file_path().unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
        assert!(!stale.exists());
        assert_eq!(t.console.matching("Removing expired logs").len(), 1);
        let lines = file_lines(&t);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("| day two"));
    }

    #[test]
    fn test_retention_zero_means_one_day() {
        let t = test_logger(2);
        t.logger.set_retention_days(0);

        let one_day = t.logs.join("one_day.log");
        let two_days = t.logs.join("two_days.log");
        for (path, days) in [(&one_day, 1u64), (&two_days, 2)] {
            let file = std::fs::File::create(path).unwrap();
            let aged = SystemTime::from(t.clock.now()) - Duration::from_secs(days * 24 * 60 * 60);
            file.set_modified(aged).unwrap();
        }

        t.logger.emit(LogLevel::Warning, "sweep()", 1, "trigger");
        assert!(one_day.exists());
        assert!(!two_days.exists());
    }

    #[test]
    fn test_mutators_apply_to_following_writes() {
        let t = test_logger(2);
        t.logger.set_level(0);
        t.logger.set_filename_pattern("custom_%1.txt");
        t.logger.emit(LogLevel::Debug, "mutate()", 1, "now visible");

        let path = t.logger.log_file_path().unwrap();
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with("custom_15.06.2026"));
        assert!(file_lines(&t).iter().any(|l| l.ends_with("| now visible")));
    }

    #[test]
    fn test_set_directory() {
        let t = test_logger(2);
        let moved = t.logs.join("moved");
        t.logger.set_directory(&moved).unwrap();
        t.logger.emit(LogLevel::Critical, "move()", 1, "over here");
        assert_eq!(log_files(&moved).len(), 1);

        let blocker = t.logs.join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = t.logger.set_directory(blocker.join("sub")).unwrap_err();
        assert!(matches!(err, LoggerError::CreateDirectory { .. }));
        assert!(t.logger.log_file_path().unwrap().starts_with(&moved));
    }

    #[test]
    fn test_periodic_sync_picks_up_store_changes() {
        let dir = TempDir::new().unwrap();
        let store = MemoryConfigStore::with_values([
            (KEY_LOG_LEVEL, toml::Value::Integer(2)),
            (KEY_DIR, toml::Value::String(dir.path().to_string_lossy().into_owned())),
        ]);
        let logger = Logger::start(
            LoggerOptions::new()
                .store(Box::new(store.clone()))
                .console(Arc::new(CapturedConsole::new()))
                .dispatch(DispatchMode::Blocking)
                .sync_interval(Duration::from_millis(20)),
        )
        .unwrap();

        let mut editor = store.clone();
        editor.set(KEY_LOG_LEVEL, toml::Value::Integer(0)).unwrap();
        std::thread::sleep(Duration::from_millis(200));

        logger.emit(LogLevel::Debug, "sync()", 1, "after reload");
        let lines = std::fs::read_to_string(logger.log_file_path().unwrap()).unwrap();
        assert!(lines.contains("| after reload"));
    }

    #[test]
    fn test_reload_config_on_demand() {
        let t = test_logger(2);
        let mut editor = t.store.clone();
        editor.set(KEY_LOG_LEVEL, toml::Value::Integer(0)).unwrap();
        t.logger.reload_config();

        t.logger.emit(LogLevel::Debug, "reload()", 1, "debug now kept");
        assert!(file_lines(&t).iter().any(|l| l.ends_with("| debug now kept")));
    }

    #[test]
    fn test_reconfigure_switches_to_file() {
        let t = test_logger(2);
        let config_path = t.logs.join("..").join("other.toml");
        let other_logs = t.logs.join("other");
        std::fs::write(
            &config_path,
            format!(
                "[LOGGER]\nlog_level = 0\ndir = {:?}\n",
                other_logs.to_string_lossy()
            ),
        )
        .unwrap();

        let stale = t.logs.join("log_01.03.2026.log");
        let file = std::fs::File::create(&stale).unwrap();
        let aged = SystemTime::from(t.clock.now()) - Duration::from_secs(90 * 24 * 60 * 60);
        file.set_modified(aged).unwrap();
        drop(file);

        t.logger.reconfigure(&config_path);
        t.logger.emit(LogLevel::Debug, "switch()", 1, "in other dir");

        // The old directory is swept before the new settings apply
        assert!(!stale.exists());
        let new_file = t.logger.log_file_path().unwrap();
        assert!(new_file.starts_with(&other_logs));
        let logged = std::fs::read_to_string(&new_file).unwrap();
        assert!(logged.contains(&format!("Deleted expired log file {}", stale.display())));
        assert!(logged.contains("| in other dir"));
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("lifetime = 30"));
        assert!(content.contains("name_pattern"));
        assert_eq!(t.console.matching("Switching logger config").len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_written_lines() {
        let t = test_logger(2);
        let mut rx = t.logger.subscribe();

        t.logger.emit(LogLevel::Info, "ui()", 1, "filtered");
        t.logger.emit(LogLevel::Warning, "ui()", 2, "mirrored");

        let written = rx.recv().await.unwrap();
        assert_eq!(written.level, LogLevel::Warning);
        assert!(written.line.ends_with("| mirrored\n"));
        assert!(rx.try_recv().is_err());

        let json = serde_json::to_value(&written).unwrap();
        assert_eq!(json["level"], "WARNING");
    }

    #[test]
    fn test_queued_mode_with_flush() {
        let t = test_logger(2);
        t.logger.set_dispatch_mode(DispatchMode::Queued);
        assert_eq!(t.logger.dispatch_mode(), DispatchMode::Queued);

        let logger = &t.logger;
        std::thread::scope(|s| {
            for n in 0..4u32 {
                s.spawn(move || {
                    for i in 0..25 {
                        logger.emit(LogLevel::Warning, "worker()", n, format!("{}:{}", n, i));
                    }
                });
            }
        });
        t.logger.flush().unwrap();

        let lines = file_lines(&t);
        assert_eq!(lines.len(), 100);
        for n in 0..4u32 {
            let own: Vec<&String> = lines
                .iter()
                .filter(|l| l.contains(&format!("| {}:", n)))
                .collect();
            assert_eq!(own.len(), 25);
            for (i, line) in own.iter().enumerate() {
                assert!(line.ends_with(&format!("| {}:{}", n, i)));
            }
        }
    }

    #[test]
    fn test_fatal_is_delivered_before_emit_returns() {
        let t = test_logger(2);
        t.logger.set_dispatch_mode(DispatchMode::Queued);
        t.logger.emit(LogLevel::Fatal, "crash()", 1, "last words");

        let path = t.logger.log_file_path().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("| FATAL    |"));
    }

    #[test]
    fn test_max_name_len() {
        let t = test_logger(2);
        t.logger.set_max_name_len(10);
        t.logger.emit(LogLevel::Warning, "a_rather_long_function_name()", 1, "short");
        t.logger.set_max_name_len(0);
        assert_eq!(t.logger.max_name_len(), 3);

        assert!(file_lines(&t)[0].contains("| a_rathe..., line"));
    }

    #[test]
    fn test_shutdown_drops_later_records() {
        let t = test_logger(2);
        t.logger.emit(LogLevel::Warning, "stop()", 1, "before");
        let path = t.logger.log_file_path().unwrap();

        t.logger.shutdown();
        assert!(!t.logger.is_running());
        t.logger.emit(LogLevel::Warning, "stop()", 2, "after");
        t.logger.shutdown();

        assert!(matches!(t.logger.flush(), Err(LoggerError::WorkerGone)));
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("| before"));
        assert!(!content.contains("| after"));
        // Console output does not depend on the writer
        assert_eq!(t.console.matching("| after").len(), 1);
    }
}
