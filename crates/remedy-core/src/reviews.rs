//! Review lifecycle: creation, moderation, edits, deletion and helpful marks.
//!
//! Every mutation that can move a review in or out of the approved set is
//! followed by a synchronous stats recomputation of the owning remedy.

use std::sync::Arc;

use chrono::Utc;
use remedy_state::{
    CommentRecord, EntityStore, ModerationStatus, RemedyId, ReviewId, ReviewRecord, StorageError,
    UserId,
};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::aggregation::{Aggregator, StatsSync};
use crate::domain::{Actor, NewReview, RemedyError, Result, ReviewEdit};
use crate::metrics::METRICS;
use crate::moderation::{
    authorize_owner_or_privileged, authorize_privileged, is_visible_to, status_after_edit,
};
use crate::obs;

/// A completed review mutation together with the stats recomputation it
/// triggered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewMutation<T> {
    pub value: T,
    pub stats: StatsSync,
}

/// Log and skip a missing user when maintaining authored-content lists.
pub(crate) fn tolerate_missing_user(
    result: remedy_state::StorageResult<()>,
    user: &UserId,
) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(StorageError::NotFound { .. }) => {
            warn!(user_id = %user, "author has no user record; back-reference skipped");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub struct ReviewService<S> {
    store: Arc<S>,
    aggregator: Arc<Aggregator<S>>,
}

impl<S> ReviewService<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>, aggregator: Arc<Aggregator<S>>) -> Self {
        Self { store, aggregator }
    }

    async fn load(&self, id: &ReviewId) -> Result<ReviewRecord> {
        self.store
            .get_review(id)
            .await?
            .ok_or_else(|| RemedyError::not_found(ReviewId::ENTITY, id))
    }

    /// Load a review the viewer may see; hidden reviews read as missing.
    async fn load_visible(&self, viewer: Option<&Actor>, id: &ReviewId) -> Result<ReviewRecord> {
        let review = self.load(id).await?;
        if !is_visible_to(viewer, &review.author_id, review.status) {
            return Err(RemedyError::not_found(ReviewId::ENTITY, id));
        }
        Ok(review)
    }

    /// Submit a review. It starts out pending.
    ///
    /// Checks run in order: input format, remedy existence, one review per
    /// author and remedy.
    #[instrument(
        name = "review.create",
        skip_all,
        fields(remedy_id = %input.remedy_id, author_id = %actor.user_id)
    )]
    pub async fn create_review(
        &self,
        actor: &Actor,
        input: NewReview,
    ) -> Result<ReviewMutation<ReviewRecord>> {
        input.validate()?;

        if self.store.get_remedy(&input.remedy_id).await?.is_none() {
            return Err(RemedyError::not_found(RemedyId::ENTITY, input.remedy_id));
        }
        if self
            .store
            .find_review_by_author_and_remedy(&actor.user_id, &input.remedy_id)
            .await?
            .is_some()
        {
            return Err(RemedyError::Conflict(
                "you have already reviewed this remedy".to_string(),
            ));
        }

        let review = self
            .store
            .create_review(ReviewRecord::new(
                actor.user_id,
                input.remedy_id,
                input.ratings,
                input.title,
                input.content,
            ))
            .await?;
        self.store
            .add_remedy_review(&review.remedy_id, &review.id)
            .await?;
        tolerate_missing_user(
            self.store.add_user_review(&actor.user_id, &review.id).await,
            &actor.user_id,
        )?;
        obs::emit_content_created("review", &review.id, &review.remedy_id);

        let stats = self.aggregator.on_review_mutated(&review.remedy_id).await;
        Ok(ReviewMutation {
            value: review,
            stats,
        })
    }

    pub async fn get_review(&self, viewer: Option<&Actor>, id: &ReviewId) -> Result<ReviewRecord> {
        self.load_visible(viewer, id).await
    }

    /// Reviews of a remedy the viewer may see, oldest first.
    pub async fn list_reviews_for_remedy(
        &self,
        viewer: Option<&Actor>,
        remedy_id: &RemedyId,
    ) -> Result<Vec<ReviewRecord>> {
        if self.store.get_remedy(remedy_id).await?.is_none() {
            return Err(RemedyError::not_found(RemedyId::ENTITY, remedy_id));
        }

        // Anonymous viewers can only ever see approved reviews.
        let filter = viewer.is_none().then_some(ModerationStatus::Approved);
        let reviews = self.store.find_reviews_by_remedy(remedy_id, filter).await?;
        Ok(reviews
            .into_iter()
            .filter(|r| is_visible_to(viewer, &r.author_id, r.status))
            .collect())
    }

    /// Edit a review. A plain author's edit sends it back to pending; a
    /// moderator's edit applies the supplied status or keeps the current one.
    #[instrument(
        name = "review.update",
        skip_all,
        fields(review_id = %id, actor_id = %actor.user_id)
    )]
    pub async fn update_review(
        &self,
        actor: &Actor,
        id: &ReviewId,
        edit: ReviewEdit,
    ) -> Result<ReviewMutation<ReviewRecord>> {
        edit.validate()?;
        let mut review = self.load(id).await?;
        authorize_owner_or_privileged(actor, &review.author_id, "edit this review")?;

        let before = review.status;
        if let Some(ratings) = edit.ratings {
            review.ratings = ratings;
        }
        if let Some(title) = edit.title {
            review.title = title;
        }
        if let Some(content) = edit.content {
            review.content = content;
        }
        review.status = status_after_edit(actor, before, edit.status);
        review.updated_at = Utc::now();

        let review = self.store.update_review(review).await?;
        self.record_transition(&review, before);

        let stats = self.aggregator.on_review_mutated(&review.remedy_id).await;
        Ok(ReviewMutation {
            value: review,
            stats,
        })
    }

    /// Explicit moderation decision. Moderators and admins only.
    #[instrument(
        name = "review.update_status",
        skip_all,
        fields(review_id = %id, status = %status)
    )]
    pub async fn update_review_status(
        &self,
        actor: &Actor,
        id: &ReviewId,
        status: ModerationStatus,
    ) -> Result<ReviewMutation<ReviewRecord>> {
        let mut review = self.load(id).await?;
        authorize_privileged(actor, "change a review's status")?;

        let before = review.status;
        review.status = status;
        review.updated_at = Utc::now();
        let review = self.store.update_review(review).await?;
        self.record_transition(&review, before);

        let stats = self.aggregator.on_review_mutated(&review.remedy_id).await;
        Ok(ReviewMutation {
            value: review,
            stats,
        })
    }

    /// Delete a review, its comments and every back-reference to them.
    ///
    /// Once the review record is gone the remedy's stats are recomputed even
    /// if cleaning up comments or back-references fails; the first cleanup
    /// error is returned afterwards.
    #[instrument(
        name = "review.delete",
        skip_all,
        fields(review_id = %id, actor_id = %actor.user_id)
    )]
    pub async fn delete_review(&self, actor: &Actor, id: &ReviewId) -> Result<ReviewMutation<()>> {
        let review = self.load(id).await?;
        authorize_owner_or_privileged(actor, &review.author_id, "delete this review")?;

        let comments = self.store.find_comments_by_review(&review.id, None).await?;
        self.store.delete_review(&review.id).await?;

        let cleanup = self.unlink_deleted(&review, &comments).await;
        obs::emit_content_deleted("review", &review.id, comments.len());

        let stats = self.aggregator.on_review_mutated(&review.remedy_id).await;
        if let Err(err) = cleanup {
            warn!(review_id = %review.id, error = %err, "review deleted with stale references");
            return Err(err);
        }
        Ok(ReviewMutation { value: (), stats })
    }

    /// Remove a deleted review's comments and back-references, attempting
    /// every step and keeping the first failure.
    async fn unlink_deleted(&self, review: &ReviewRecord, comments: &[CommentRecord]) -> Result<()> {
        let mut first_error: Option<RemedyError> = None;
        let mut keep = |result: remedy_state::StorageResult<()>| {
            if let Err(err) = result {
                first_error.get_or_insert(err.into());
            }
        };

        for comment in comments {
            match self.store.delete_comment(&comment.id).await {
                Err(StorageError::NotFound { .. }) => {}
                other => keep(other),
            }
            keep(
                self.store
                    .remove_user_comment(&comment.author_id, &comment.id)
                    .await,
            );
        }
        keep(
            self.store
                .remove_remedy_review(&review.remedy_id, &review.id)
                .await,
        );
        keep(
            self.store
                .remove_user_review(&review.author_id, &review.id)
                .await,
        );

        first_error.map_or(Ok(()), Err)
    }

    /// Count one helpful vote. Any actor other than the author may vote,
    /// whatever the review's status.
    pub async fn mark_review_helpful(&self, actor: &Actor, id: &ReviewId) -> Result<ReviewRecord> {
        let review = self.load(id).await?;
        if actor.is(&review.author_id) {
            return Err(RemedyError::validation(
                "cannot mark your own review as helpful",
            ));
        }
        Ok(self.store.increment_review_helpful(id).await?)
    }

    fn record_transition(&self, review: &ReviewRecord, before: ModerationStatus) {
        if review.status != before {
            METRICS.inc_moderation_transitions();
            obs::emit_status_changed("review", &review.id, before, review.status);
        }
    }
}
