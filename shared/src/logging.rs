/// Severity of a diagnostic message, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    VeryVerbose,
    Verbose,
    Log,
    Display,
    Warning,
    Error,
    Fatal,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::VeryVerbose => log::Level::Trace,
            LogLevel::Verbose => log::Level::Debug,
            LogLevel::Log | LogLevel::Display => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error | LogLevel::Fatal => log::Level::Error,
        }
    }
}

/// Destination for the leveled diagnostics the core emits.
///
/// Implementations must not assume delivery matters to the caller: the core
/// never inspects the outcome of a log call.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards every message to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: LogLevel, message: &str) {
        log::log!(target: "strata", log::Level::from(level), "{}", message);
    }
}
