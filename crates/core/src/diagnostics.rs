//! Diagnostics capability
//!
//! Rule-tree editors report what they touched through a `Diagnostics`
//! collaborator handed to them once at construction. The default
//! implementation forwards to `tracing`, so verbosity is decided by the
//! subscriber the binary installs.

use std::sync::{Arc, Mutex};
use tracing::Level;

/// Sink for diagnostic messages
pub trait Diagnostics: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Shared diagnostics reference
pub type SharedDiagnostics = Arc<dyn Diagnostics>;

/// Forwards every message to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: "edgeprov::rules", "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "edgeprov::rules", "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "edgeprov::rules", "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "edgeprov::rules", "{message}");
        } else {
            tracing::trace!(target: "edgeprov::rules", "{message}");
        }
    }
}

/// Keeps messages in memory; used to assert on what an edit reported.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: Mutex<Vec<(Level, String)>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, msg)| msg.contains(needle))
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push((level, message.to_string()));
        }
    }
}

/// Default collaborator used when none is supplied.
pub fn tracing_diagnostics() -> SharedDiagnostics {
    Arc::new(TracingDiagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_diagnostics_keeps_order() {
        let diag = RecordingDiagnostics::new();
        diag.log(Level::DEBUG, "first");
        diag.log(Level::WARN, "second");

        let entries = diag.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (Level::DEBUG, "first".to_string()));
        assert_eq!(entries[1].0, Level::WARN);
        assert!(diag.contains("sec"));
        assert!(!diag.contains("third"));
    }

    #[test]
    fn test_tracing_diagnostics_accepts_all_levels() {
        let diag = TracingDiagnostics;
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            diag.log(level, "message");
        }
    }
}
