//! Aggregation engine: keeps a remedy's `avg_rating` / `review_count`
//! derivable from its approved reviews.
//!
//! Stats are always recomputed from the full approved set, never adjusted
//! incrementally, so two racing recomputations converge on the same value.
//! Within one process, recomputations of the same remedy are additionally
//! serialized through a per-remedy async lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use remedy_state::{EntityStore, ModerationStatus, RemedyId, RemedyStats, ReviewRecord};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::domain::Result;
use crate::metrics::METRICS;
use crate::obs;

/// Derive stats from a remedy's reviews. Non-approved entries are ignored.
///
/// The mean rating is rounded to one decimal place; no approved reviews
/// gives `0.0` / `0`.
pub fn compute_stats(reviews: &[ReviewRecord]) -> RemedyStats {
    let ratings: Vec<f64> = reviews
        .iter()
        .filter(|r| r.status.is_approved())
        .map(|r| f64::from(r.ratings.rating))
        .collect();

    if ratings.is_empty() {
        return RemedyStats::default();
    }

    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    RemedyStats {
        avg_rating: (mean * 10.0).round() / 10.0,
        review_count: ratings.len() as u32,
    }
}

/// Outcome of the stats recomputation that follows a review mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatsSync {
    /// Stored stats reflect the approved set after the mutation.
    Synced { stats: RemedyStats },
    /// Recomputation failed; the mutation stands but stored stats are stale
    /// until the next successful recomputation or reconciliation.
    Lagging { remedy_id: RemedyId, reason: String },
}

impl StatsSync {
    pub fn is_synced(&self) -> bool {
        matches!(self, StatsSync::Synced { .. })
    }

    pub fn stats(&self) -> Option<RemedyStats> {
        match self {
            StatsSync::Synced { stats } => Some(*stats),
            StatsSync::Lagging { .. } => None,
        }
    }
}

/// Result of [`Aggregator::reconcile_all`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub remedies: usize,
    /// Remedies whose stored stats differed from the recomputed ones.
    pub changed: Vec<RemedyId>,
    /// Remedies whose recomputation failed.
    pub lagging: Vec<RemedyId>,
}

pub struct Aggregator<S> {
    store: Arc<S>,
    attempts: u32,
    locks: Mutex<HashMap<RemedyId, Arc<AsyncMutex<()>>>>,
}

impl<S> Aggregator<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
        Self {
            store,
            attempts: config.recompute_attempts.max(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, remedy_id: &RemedyId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(*remedy_id).or_default().clone()
    }

    /// Drop the map entry once no other recomputation holds or awaits it.
    fn release_lock(&self, remedy_id: &RemedyId, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(remedy_id);
        }
    }

    /// Recompute and store a remedy's stats from its approved reviews.
    #[instrument(skip_all, fields(remedy_id = %remedy_id))]
    pub async fn recompute_remedy_stats(&self, remedy_id: &RemedyId) -> Result<RemedyStats> {
        let lock = self.lock_for(remedy_id);
        let result = {
            let _guard = lock.lock().await;
            self.recompute_locked(remedy_id).await
        };
        self.release_lock(remedy_id, lock);
        result
    }

    async fn recompute_locked(&self, remedy_id: &RemedyId) -> Result<RemedyStats> {
        let approved = self
            .store
            .find_reviews_by_remedy(remedy_id, Some(ModerationStatus::Approved))
            .await?;
        let stats = compute_stats(&approved);
        self.store.update_remedy_stats(remedy_id, stats).await?;

        METRICS.inc_stats_recomputed();
        obs::emit_stats_recomputed(remedy_id, stats.avg_rating, stats.review_count);
        Ok(stats)
    }

    /// Hook run after every review create, edit, status change and delete.
    ///
    /// Never fails: a recomputation that still fails after the configured
    /// attempts is logged, counted and reported as [`StatsSync::Lagging`].
    pub async fn on_review_mutated(&self, remedy_id: &RemedyId) -> StatsSync {
        let mut reason = String::new();
        for attempt in 1..=self.attempts {
            match self.recompute_remedy_stats(remedy_id).await {
                Ok(stats) => return StatsSync::Synced { stats },
                Err(err) => {
                    METRICS.inc_recompute_failures();
                    debug!(remedy_id = %remedy_id, attempt, error = %err, "stats recomputation failed");
                    reason = err.to_string();
                }
            }
        }

        obs::emit_stats_lagging(remedy_id, self.attempts, &reason);
        StatsSync::Lagging {
            remedy_id: *remedy_id,
            reason,
        }
    }

    /// Recompute every remedy's stats, reporting which ones were stale.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let remedies = self.store.list_remedies().await?;
        let mut report = ReconcileReport {
            remedies: remedies.len(),
            ..Default::default()
        };

        for remedy in remedies {
            match self.recompute_remedy_stats(&remedy.id).await {
                Ok(stats) if stats != remedy.stats() => report.changed.push(remedy.id),
                Ok(_) => {}
                Err(err) => {
                    METRICS.inc_recompute_failures();
                    obs::emit_stats_lagging(&remedy.id, 1, &err);
                    report.lagging.push(remedy.id);
                }
            }
        }

        obs::emit_reconciled(report.remedies, report.changed.len(), report.lagging.len());
        Ok(report)
    }
}
