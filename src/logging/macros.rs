//! Call-site macros
//!
//! Each macro captures the enclosing function and line and formats its
//! arguments like `format!`. The plain macros go to the global logger;
//! `log_to!` takes an explicit one.

/// Path of the enclosing function as `parent::function`
#[macro_export]
macro_rules! function_path {
    () => {{
        fn f() {}
        $crate::logging::function_path(::std::any::type_name_of_val(&f))
    }};
}

/// Log through a specific logger
///
/// ```no_run
/// use daylog::{log_to, LogLevel, Logger};
///
/// let logger = Logger::instance();
/// log_to!(logger, LogLevel::Info, "loaded {} items", 3);
/// ```
#[macro_export]
macro_rules! log_to {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.emit(
            $level,
            $crate::function_path!(),
            ::std::line!(),
            ::std::format!($($arg)+),
        )
    };
}

/// Log at `level` through the global logger
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)+) => {
        $crate::log_to!($crate::Logger::instance(), $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Warning, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log a fatal message; returns once it is on disk
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::log!($crate::LogLevel::Fatal, $($arg)+)
    };
}
