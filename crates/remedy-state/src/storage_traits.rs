//! Storage trait definitions for the remedy review platform
//!
//! One trait per entity family:
//! - `RemedyStore`: remedies, their derived stats and back-references
//! - `SourceStore`: citation sources and their remedy back-references
//! - `ReviewStore`: reviews, including the (author, remedy) lookup
//! - `CommentStore`: comments on reviews
//! - `UserStore`: accounts and their authored-content back-references
//!
//! `EntityStore` bundles all five. Traits are async and backend-agnostic.
//! In-memory fakes live in the `fakes` module, the SurrealDB backend in
//! `surreal_store`.
//!
//! Common conventions:
//! - `get_*` returns `Ok(None)` for a missing record.
//! - `update_*` / `delete_*` / `add_*` return `StorageError::NotFound` when the
//!   addressed record does not exist.
//! - `remove_*` back-reference operations are no-ops for a missing record.
//! - `create_*` returns `StorageError::Duplicate` when a uniqueness rule
//!   rejects the record.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::records::*;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// RemedyStore
// ---------------------------------------------------------------------------

/// Remedy persistence.
///
/// Guarantees:
/// - `name` is unique across remedies.
/// - `find_remedies_by_symptom_names` returns remedies in creation order.
#[async_trait]
pub trait RemedyStore: Send + Sync {
    async fn create_remedy(&self, remedy: RemedyRecord) -> StorageResult<RemedyRecord>;

    async fn get_remedy(&self, id: &RemedyId) -> StorageResult<Option<RemedyRecord>>;

    /// Every remedy, in creation order.
    async fn list_remedies(&self) -> StorageResult<Vec<RemedyRecord>>;

    /// Remedies having at least one symptom whose name is in `names`.
    ///
    /// Backends may over-approximate; callers re-check membership with the
    /// exact matching rule.
    async fn find_remedies_by_symptom_names(
        &self,
        names: &[String],
    ) -> StorageResult<Vec<RemedyRecord>>;

    /// Overwrite the derived `avg_rating` / `review_count` fields.
    async fn update_remedy_stats(&self, id: &RemedyId, stats: RemedyStats) -> StorageResult<()>;

    async fn add_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()>;

    async fn remove_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()>;

    async fn add_remedy_source(&self, id: &RemedyId, source: &SourceId) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// SourceStore
// ---------------------------------------------------------------------------

/// Source persistence. `url` is unique.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn create_source(&self, source: SourceRecord) -> StorageResult<SourceRecord>;

    async fn get_source(&self, id: &SourceId) -> StorageResult<Option<SourceRecord>>;

    /// Fetch several sources at once. Unknown ids are skipped.
    async fn get_sources(&self, ids: &[SourceId]) -> StorageResult<Vec<SourceRecord>>;

    async fn add_source_remedy(&self, id: &SourceId, remedy: &RemedyId) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// ReviewStore
// ---------------------------------------------------------------------------

/// Review persistence. At most one review exists per (author, remedy).
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord>;

    async fn get_review(&self, id: &ReviewId) -> StorageResult<Option<ReviewRecord>>;

    /// Replace a stored review with `review` (matched on `review.id`).
    async fn update_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord>;

    async fn delete_review(&self, id: &ReviewId) -> StorageResult<()>;

    /// Reviews of a remedy, optionally restricted to one status, oldest first.
    async fn find_reviews_by_remedy(
        &self,
        remedy: &RemedyId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<ReviewRecord>>;

    async fn find_review_by_author_and_remedy(
        &self,
        author: &UserId,
        remedy: &RemedyId,
    ) -> StorageResult<Option<ReviewRecord>>;

    /// Atomically add one to `helpful_count`, returning the updated review.
    async fn increment_review_helpful(&self, id: &ReviewId) -> StorageResult<ReviewRecord>;

    async fn add_review_comment(&self, id: &ReviewId, comment: &CommentId) -> StorageResult<()>;

    async fn remove_review_comment(&self, id: &ReviewId, comment: &CommentId)
        -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// CommentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord>;

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<CommentRecord>>;

    async fn update_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord>;

    async fn delete_comment(&self, id: &CommentId) -> StorageResult<()>;

    /// Comments on a review, optionally restricted to one status, oldest first.
    async fn find_comments_by_review(
        &self,
        review: &ReviewId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<CommentRecord>>;

    async fn increment_comment_helpful(&self, id: &CommentId) -> StorageResult<CommentRecord>;
}

// ---------------------------------------------------------------------------
// UserStore
// ---------------------------------------------------------------------------

/// Account persistence. `username` is unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: UserRecord) -> StorageResult<UserRecord>;

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<UserRecord>>;

    async fn add_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()>;

    async fn remove_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()>;

    async fn add_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()>;

    async fn remove_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

/// The full entity store the platform core runs against.
pub trait EntityStore: RemedyStore + SourceStore + ReviewStore + CommentStore + UserStore {}

impl<T> EntityStore for T where T: RemedyStore + SourceStore + ReviewStore + CommentStore + UserStore
{}
