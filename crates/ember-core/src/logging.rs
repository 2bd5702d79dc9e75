// SPDX-License-Identifier: CEPL-1.0
//! Engine-facing logging sink.
//!
//! Messages carry a [`Severity`] and a category and are forwarded to `tracing`.
//! A [`Severity::Fatal`] message additionally raises the [`ExitSignal`], which
//! the main loop checks before every tick.
use std::fmt;

use tracing::{error, info, warn};

use crate::exit::ExitSignal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Log,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Log => "LOG",
            Severity::Warning => "WARNG",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        })
    }
}

/// Writes one leveled line without touching any exit state.
///
/// Used directly by callbacks that have no [`Logger`] at hand.
pub fn emit(severity: Severity, category: &str, message: &dyn fmt::Display) {
    match severity {
        Severity::Log => info!(category, "{message}"),
        Severity::Warning => warn!(category, "{message}"),
        Severity::Error => error!(category, "{message}"),
        Severity::Fatal => error!(category, fatal = true, "[{severity}] {message}"),
    }
}

#[derive(Clone, Debug)]
pub struct Logger {
    exit: ExitSignal,
}

impl Logger {
    pub fn new(exit: ExitSignal) -> Self {
        Self { exit }
    }

    pub fn log(&self, severity: Severity, category: &str, message: impl fmt::Display) {
        emit(severity, category, &message);
        if severity == Severity::Fatal {
            self.exit.request();
        }
    }

    pub fn exit_signal(&self) -> &ExitSignal {
        &self.exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_requests_exit() {
        let exit = ExitSignal::new();
        let logger = Logger::new(exit.clone());
        logger.log(Severity::Fatal, "Test", "boom");
        assert!(exit.is_requested());
    }

    #[test]
    fn non_fatal_severities_keep_running() {
        let exit = ExitSignal::new();
        let logger = Logger::new(exit.clone());
        logger.log(Severity::Log, "Test", "hello");
        logger.log(Severity::Warning, "Test", "careful");
        logger.log(Severity::Error, "Test", format_args!("failed {}", 3));
        assert!(!exit.is_requested());
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Log < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        assert_eq!(Severity::Warning.to_string(), "WARNG");
    }
}
