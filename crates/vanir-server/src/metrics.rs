//! Resolution handler counters exposed by the ops listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Counters kept by the resolution handler.
///
/// Shared via `Arc`; increments are relaxed, a snapshot is advisory.
#[derive(Debug, Default)]
pub struct Metrics {
    calls: AtomicU64,
    errors: AtomicU64,
    not_found: AtomicU64,
    doc_redirects: AtomicU64,
    template_errors: AtomicU64,
    backend_micros: AtomicU64,
    backend_observations: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Successful backend resolutions
    pub calls: u64,
    /// Backend failures other than not-found
    pub errors: u64,
    /// Resolutions that found no entry
    pub not_found: u64,
    /// Browser redirects to documentation
    pub doc_redirects: u64,
    /// Meta-tag rendering failures
    pub template_errors: u64,
    /// Total seconds spent in backend resolution
    pub backend_seconds_sum: f64,
    /// Number of backend resolutions measured
    pub backend_seconds_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_doc_redirects(&self) {
        self.doc_redirects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_template_errors(&self) {
        self.template_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_backend(&self, elapsed: Duration) {
        self.backend_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.backend_observations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            doc_redirects: self.doc_redirects.load(Ordering::Relaxed),
            template_errors: self.template_errors.load(Ordering::Relaxed),
            backend_seconds_sum: self.backend_micros.load(Ordering::Relaxed) as f64 / 1e6,
            backend_seconds_count: self.backend_observations.load(Ordering::Relaxed),
        }
    }
}
