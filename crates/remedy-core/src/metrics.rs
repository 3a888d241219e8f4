//! Global atomic counters for remedy core observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a CLI command finishes).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    queries_scored: AtomicU64,
    searches_executed: AtomicU64,
    stats_recomputed: AtomicU64,
    recompute_failures: AtomicU64,
    moderation_transitions: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            queries_scored: AtomicU64::new(0),
            searches_executed: AtomicU64::new(0),
            stats_recomputed: AtomicU64::new(0),
            recompute_failures: AtomicU64::new(0),
            moderation_transitions: AtomicU64::new(0),
        }
    }

    /// One scored `query_remedies` call.
    pub fn inc_queries_scored(&self) {
        self.queries_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "queries_scored", "counter incremented");
    }

    /// One unscored `search_remedies` call.
    pub fn inc_searches(&self) {
        self.searches_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "searches_executed", "counter incremented");
    }

    /// One successful stats recomputation.
    pub fn inc_stats_recomputed(&self) {
        self.stats_recomputed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stats_recomputed", "counter incremented");
    }

    /// One failed recomputation attempt.
    pub fn inc_recompute_failures(&self) {
        self.recompute_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "recompute_failures", "counter incremented");
    }

    /// One review or comment status change.
    pub fn inc_moderation_transitions(&self) {
        self.moderation_transitions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "moderation_transitions", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            queries_scored = self.queries_scored(),
            searches_executed = self.searches_executed(),
            stats_recomputed = self.stats_recomputed(),
            recompute_failures = self.recompute_failures(),
            moderation_transitions = self.moderation_transitions(),
        );
    }

    pub fn queries_scored(&self) -> u64 {
        self.queries_scored.load(Ordering::Relaxed)
    }

    pub fn searches_executed(&self) -> u64 {
        self.searches_executed.load(Ordering::Relaxed)
    }

    pub fn stats_recomputed(&self) -> u64 {
        self.stats_recomputed.load(Ordering::Relaxed)
    }

    pub fn recompute_failures(&self) -> u64 {
        self.recompute_failures.load(Ordering::Relaxed)
    }

    pub fn moderation_transitions(&self) -> u64 {
        self.moderation_transitions.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.queries_scored.store(0, Ordering::Relaxed);
        self.searches_executed.store(0, Ordering::Relaxed);
        self.stats_recomputed.store(0, Ordering::Relaxed);
        self.recompute_failures.store(0, Ordering::Relaxed);
        self.moderation_transitions.store(0, Ordering::Relaxed);
    }
}
