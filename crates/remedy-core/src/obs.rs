//! Structured observability hooks for moderation, aggregation and ranking.
//!
//! Emission functions for the lifecycle events of reviews, comments,
//! remedy stats and queries. Request scoping comes from `#[instrument]`
//! spans on the service methods.
//!
//! Events are emitted at `info!` level, failures at `warn!`. Use
//! `telemetry::init_tracing` with `json = true` for JSON output.

use std::fmt::Display;

use remedy_state::ModerationStatus;
use tracing::{info, warn};

use crate::moderation::ApprovalTransition;

/// Emit event: a review or comment was created (always pending).
pub fn emit_content_created(entity: &str, id: &dyn Display, parent_id: &dyn Display) {
    info!(event = "content.created", entity = %entity, id = %id, parent_id = %parent_id);
}

/// Emit event: the moderation status of a review or comment changed.
pub fn emit_status_changed(
    entity: &str,
    id: &dyn Display,
    from: ModerationStatus,
    to: ModerationStatus,
) {
    let transition = ApprovalTransition::between(from, to);
    info!(
        event = "content.status_changed",
        entity = %entity,
        id = %id,
        from = %from,
        to = %to,
        approval = ?transition,
    );
}

/// Emit event: a review or comment was deleted with its back-references.
pub fn emit_content_deleted(entity: &str, id: &dyn Display, cascaded: usize) {
    info!(event = "content.deleted", entity = %entity, id = %id, cascaded = cascaded);
}

/// Emit event: a remedy's derived stats were written.
pub fn emit_stats_recomputed(remedy_id: &dyn Display, avg_rating: f64, review_count: u32) {
    info!(
        event = "stats.recomputed",
        remedy_id = %remedy_id,
        avg_rating = avg_rating,
        review_count = review_count,
    );
}

/// Emit event: stats recomputation gave up; the stored stats are stale.
pub fn emit_stats_lagging(remedy_id: &dyn Display, attempts: u32, error: &dyn Display) {
    warn!(
        event = "stats.lagging",
        remedy_id = %remedy_id,
        attempts = attempts,
        error = %error,
    );
}

/// Emit event: a full reconciliation pass finished.
pub fn emit_reconciled(remedies: usize, changed: usize, lagging: usize) {
    info!(
        event = "stats.reconciled",
        remedies = remedies,
        changed = changed,
        lagging = lagging,
    );
}

/// Emit event: a keyword query was ranked.
pub fn emit_query_ranked(keywords: usize, candidates: usize, top_score: Option<f64>) {
    info!(
        event = "query.ranked",
        keywords = keywords,
        candidates = candidates,
        top_score = top_score.unwrap_or(0.0),
    );
}
