//! Remedy Core Library
//!
//! Relevance scoring, review moderation and rating aggregation for the
//! remedy review platform, written against the `remedy_state` entity-store
//! traits. [`RemedyEngine`] bundles every service over one shared store.

pub mod aggregation;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod moderation;
pub mod obs;
pub mod reviews;
pub mod scoring;
pub mod search;
pub mod telemetry;

use std::sync::Arc;

pub use aggregation::{compute_stats, Aggregator, ReconcileReport, StatsSync};
pub use catalog::Catalog;
pub use comments::CommentService;
pub use config::EngineConfig;
pub use domain::{
    parse_id, Actor, CommentEdit, ErrorKind, Failure, NewComment, NewRemedy, NewReview,
    NewSource, NewUser, RemedyError, Result, ReviewEdit,
};
pub use moderation::ApprovalTransition;
pub use reviews::{ReviewMutation, ReviewService};
pub use scoring::{relevance_score, KeywordSet, ScoreBreakdown};
pub use search::{RemedySearch, ScoredRemedy};

pub use remedy_state::{
    CommentId, CommentRecord, EntityStore, ModerationStatus, RemedyId, RemedyRecord, RemedyStats,
    ReviewId, ReviewRatings, ReviewRecord, Role, SourceId, SourceRecord, Symptom, UserId,
    UserRecord,
};

/// Every core service over one shared entity store.
pub struct RemedyEngine<S> {
    store: Arc<S>,
    aggregator: Arc<Aggregator<S>>,
    search: RemedySearch<S>,
    reviews: ReviewService<S>,
    comments: CommentService<S>,
    catalog: Catalog<S>,
}

impl<S> RemedyEngine<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        let aggregator = Arc::new(Aggregator::new(store.clone(), &config));
        Self {
            search: RemedySearch::new(store.clone()),
            reviews: ReviewService::new(store.clone(), aggregator.clone()),
            comments: CommentService::new(store.clone()),
            catalog: Catalog::new(store.clone()),
            aggregator,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn aggregator(&self) -> &Aggregator<S> {
        &self.aggregator
    }

    pub fn search(&self) -> &RemedySearch<S> {
        &self.search
    }

    pub fn reviews(&self) -> &ReviewService<S> {
        &self.reviews
    }

    pub fn comments(&self) -> &CommentService<S> {
        &self.comments
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }
}
