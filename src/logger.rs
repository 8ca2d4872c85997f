//! Logging capability for the client.
//!
//! The client itself never terminates the process: unrecoverable states are
//! reported through [`ClientLogger::fatal`], which must diverge. The
//! outermost boundary decides what diverging means. Production loggers
//! exit; test loggers may panic their thread instead.

use std::process;

/// Everything the client needs from a logging sink.
pub trait ClientLogger: Send + Sync {
    /// Log an informational message.
    fn info(&self, message: &str);

    /// Log an unrecoverable failure and never return.
    fn fatal(&self, message: &str) -> !;
}

/// Logger that discards informational messages and exits on fatal.
pub struct NullLogger;

impl ClientLogger for NullLogger {
    fn info(&self, _message: &str) {}

    fn fatal(&self, _message: &str) -> ! {
        process::exit(1);
    }
}

/// Logger backed by the `tracing` ecosystem.
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn fatal(&self, message: &str) -> ! {
        tracing::error!("{message}");
        process::exit(1);
    }
}
