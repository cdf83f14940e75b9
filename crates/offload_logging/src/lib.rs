#![deny(missing_docs)]
//! Shared logging utilities for the offload workspace.
//!
//! This crate provides the `offload_*` logging macros used by the worker and
//! the coordinator, logger initialization for binaries, a minimal test
//! initializer, and [`TimedSection`] for measuring a scope.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! offload_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! offload_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! offload_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! offload_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! offload_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes the global logger for a binary.
///
/// Always logs to the terminal; when `log_file` is given, the same records
/// are also written to that file. A file that cannot be created is reported
/// on stderr and skipped. Safely no-ops if a logger is already installed.
pub fn initialize(level: LevelFilter, log_file: Option<&Path>) {
    let config = build_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(err) => eprintln!("Warning: Could not create log file at {:?}: {}", path, err),
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Debug)
        .build()
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

/// Measures the time spent in a scope and logs it at debug level on drop.
///
/// Call [`TimedSection::finish`] to read the elapsed time instead of only
/// logging it.
pub struct TimedSection {
    label: &'static str,
    started: Instant,
    reported: bool,
}

impl TimedSection {
    /// Starts measuring a section identified by `label`.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
            reported: false,
        }
    }

    /// Time elapsed since the section started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Ends the section, logs it, and returns the elapsed time.
    pub fn finish(mut self) -> Duration {
        let elapsed = self.elapsed();
        self.report(elapsed);
        elapsed
    }

    fn report(&mut self, elapsed: Duration) {
        if !self.reported {
            self.reported = true;
            log::debug!("{} took {:.3} ms", self.label, elapsed.as_secs_f64() * 1000.0);
        }
    }
}

impl Drop for TimedSection {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        self.report(elapsed);
    }
}
