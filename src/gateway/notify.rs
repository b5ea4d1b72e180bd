//! User-facing notification seam.
//!
//! The gateway converts every failure into exactly one notice; how it is
//! rendered (toast, status line, log) is up to the injected implementation.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Default notifier: routes notices into the log stream.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Error => warn!("{message}"),
        }
    }
}
