//! Diagnostics sink shared by the resolution pipeline.
//!
//! The original design funneled warnings and errors through process-global
//! state. Here the sink is an explicit value passed through resolution calls:
//! warnings are always logged and counted, errors either abort immediately
//! (strict mode) or are counted and surfaced at the end of the run, and fatal
//! conditions bypass the sink entirely by returning `Error` values.

use crate::error::{Error, Result};
use log::{error, warn};
use std::cell::Cell;

/// Collects diagnostics emitted during resolution and document assembly.
pub struct Reporter {
    strict: bool,
    warning_count: Cell<usize>,
    error_count: Cell<usize>,
}

impl Reporter {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            warning_count: Cell::new(0),
            error_count: Cell::new(0),
        }
    }

    /// Reporter that aborts on the first reported error.
    pub fn strict() -> Self {
        Self::new(true)
    }

    /// Reporter that counts errors and lets the run continue.
    pub fn lenient() -> Self {
        Self::new(false)
    }

    /// Report a non-fatal issue. Resolution continues with a best-effort
    /// fallback.
    pub fn warning(&self, context: &str, message: &str) {
        warn!("{}: {}", context, message);
        self.warning_count.set(self.warning_count.get() + 1);
    }

    /// Report an error. In strict mode this aborts the current item by
    /// returning `Err`; otherwise the error is logged and counted and the
    /// caller proceeds.
    pub fn error(&self, context: &str, message: &str) -> Result<()> {
        if self.strict {
            return Err(Error::Diagnostic {
                context: context.to_string(),
                message: message.to_string(),
            });
        }
        error!("{}: {}", context, message);
        self.error_count.set(self.error_count.get() + 1);
        Ok(())
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count.get()
    }

    pub fn error_count(&self) -> usize {
        self.error_count.get()
    }

    /// Whether any error was reported in lenient mode. Consulted once at the
    /// end of a run to decide the exit status.
    pub fn has_errors(&self) -> bool {
        self.error_count.get() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode_aborts_on_error() {
        let reporter = Reporter::strict();
        let result = reporter.error("ctx", "broken");

        assert!(result.is_err());
        assert_eq!(reporter.error_count(), 0);
    }

    #[test]
    fn test_lenient_mode_counts_errors() {
        let reporter = Reporter::lenient();

        assert!(reporter.error("ctx", "broken").is_ok());
        assert!(reporter.error("ctx", "still broken").is_ok());
        assert_eq!(reporter.error_count(), 2);
        assert!(reporter.has_errors());
    }

    #[test]
    fn test_warnings_never_abort() {
        let reporter = Reporter::strict();
        reporter.warning("ctx", "questionable");

        assert_eq!(reporter.warning_count(), 1);
        assert!(!reporter.has_errors());
    }
}
