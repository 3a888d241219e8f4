//! Comment lifecycle. Comments follow the same moderation rules as reviews
//! but never feed remedy stats.

use std::sync::Arc;

use chrono::Utc;
use remedy_state::{CommentId, CommentRecord, EntityStore, ModerationStatus, ReviewId};
use tracing::instrument;

use crate::domain::{Actor, CommentEdit, NewComment, RemedyError, Result};
use crate::metrics::METRICS;
use crate::moderation::{
    authorize_owner_or_privileged, authorize_privileged, is_visible_to, status_after_edit,
};
use crate::obs;
use crate::reviews::tolerate_missing_user;

pub struct CommentService<S> {
    store: Arc<S>,
}

impl<S> CommentService<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load(&self, id: &CommentId) -> Result<CommentRecord> {
        self.store
            .get_comment(id)
            .await?
            .ok_or_else(|| RemedyError::not_found(CommentId::ENTITY, id))
    }

    async fn ensure_review_visible(&self, viewer: Option<&Actor>, id: &ReviewId) -> Result<()> {
        match self.store.get_review(id).await? {
            Some(review) if is_visible_to(viewer, &review.author_id, review.status) => Ok(()),
            _ => Err(RemedyError::not_found(ReviewId::ENTITY, id)),
        }
    }

    /// Comment on a review the actor can see. The comment starts pending.
    #[instrument(name = "comment.create", skip_all, fields(review_id = %input.review_id))]
    pub async fn create_comment(&self, actor: &Actor, input: NewComment) -> Result<CommentRecord> {
        input.validate()?;
        self.ensure_review_visible(Some(actor), &input.review_id).await?;

        let comment = self
            .store
            .create_comment(CommentRecord::new(
                actor.user_id,
                input.review_id,
                input.content,
            ))
            .await?;
        self.store
            .add_review_comment(&comment.review_id, &comment.id)
            .await?;
        tolerate_missing_user(
            self.store.add_user_comment(&actor.user_id, &comment.id).await,
            &actor.user_id,
        )?;
        obs::emit_content_created("comment", &comment.id, &comment.review_id);
        Ok(comment)
    }

    /// Comments on a review the viewer may see, oldest first.
    pub async fn list_comments_for_review(
        &self,
        viewer: Option<&Actor>,
        review_id: &ReviewId,
    ) -> Result<Vec<CommentRecord>> {
        self.ensure_review_visible(viewer, review_id).await?;

        let filter = viewer.is_none().then_some(ModerationStatus::Approved);
        let comments = self.store.find_comments_by_review(review_id, filter).await?;
        Ok(comments
            .into_iter()
            .filter(|c| is_visible_to(viewer, &c.author_id, c.status))
            .collect())
    }

    #[instrument(name = "comment.update", skip_all, fields(comment_id = %id))]
    pub async fn update_comment(
        &self,
        actor: &Actor,
        id: &CommentId,
        edit: CommentEdit,
    ) -> Result<CommentRecord> {
        edit.validate()?;
        let mut comment = self.load(id).await?;
        authorize_owner_or_privileged(actor, &comment.author_id, "edit this comment")?;

        let before = comment.status;
        if let Some(content) = edit.content {
            comment.content = content;
        }
        comment.status = status_after_edit(actor, before, edit.status);
        comment.updated_at = Utc::now();

        let comment = self.store.update_comment(comment).await?;
        record_transition(&comment, before);
        Ok(comment)
    }

    /// Explicit moderation decision. Moderators and admins only.
    #[instrument(
        name = "comment.update_status",
        skip_all,
        fields(comment_id = %id, status = %status)
    )]
    pub async fn update_comment_status(
        &self,
        actor: &Actor,
        id: &CommentId,
        status: ModerationStatus,
    ) -> Result<CommentRecord> {
        let mut comment = self.load(id).await?;
        authorize_privileged(actor, "change a comment's status")?;

        let before = comment.status;
        comment.status = status;
        comment.updated_at = Utc::now();
        let comment = self.store.update_comment(comment).await?;
        record_transition(&comment, before);
        Ok(comment)
    }

    #[instrument(name = "comment.delete", skip_all, fields(comment_id = %id))]
    pub async fn delete_comment(&self, actor: &Actor, id: &CommentId) -> Result<()> {
        let comment = self.load(id).await?;
        authorize_owner_or_privileged(actor, &comment.author_id, "delete this comment")?;

        self.store.delete_comment(&comment.id).await?;
        self.store
            .remove_review_comment(&comment.review_id, &comment.id)
            .await?;
        self.store
            .remove_user_comment(&comment.author_id, &comment.id)
            .await?;
        obs::emit_content_deleted("comment", &comment.id, 0);
        Ok(())
    }

    /// Count one helpful vote. Any actor other than the author may vote,
    /// whatever the comment's status.
    pub async fn mark_comment_helpful(
        &self,
        actor: &Actor,
        id: &CommentId,
    ) -> Result<CommentRecord> {
        let comment = self.load(id).await?;
        if actor.is(&comment.author_id) {
            return Err(RemedyError::validation(
                "cannot mark your own comment as helpful",
            ));
        }
        Ok(self.store.increment_comment_helpful(id).await?)
    }
}

fn record_transition(comment: &CommentRecord, before: ModerationStatus) {
    if comment.status != before {
        METRICS.inc_moderation_transitions();
        obs::emit_status_changed("comment", &comment.id, before, comment.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_state::{
        MemoryEntityStore, RemedyId, ReviewRatings, ReviewRecord, ReviewStore, UserId,
    };

    async fn setup(status: ModerationStatus) -> (CommentService<MemoryEntityStore>, ReviewRecord) {
        let store = Arc::new(MemoryEntityStore::new());
        let review = store
            .create_review(
                ReviewRecord::new(
                    UserId::new(),
                    RemedyId::new(),
                    ReviewRatings::uniform(4),
                    "Helped",
                    "Slept well",
                )
                .with_status(status),
            )
            .await
            .unwrap();
        (CommentService::new(store), review)
    }

    #[tokio::test]
    async fn comment_on_hidden_review_is_not_found() {
        let (service, review) = setup(ModerationStatus::Flagged).await;
        let stranger = Actor::user(UserId::new());
        let err = service
            .create_comment(&stranger, NewComment::new(review.id, "Me too"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::NotFound { entity: "review", .. }));
    }

    #[tokio::test]
    async fn comments_start_pending_and_reset_on_author_edit() {
        let (service, review) = setup(ModerationStatus::Approved).await;
        let author = Actor::user(UserId::new());
        let moderator = Actor::moderator(UserId::new());

        let comment = service
            .create_comment(&author, NewComment::new(review.id, "Me too"))
            .await
            .unwrap();
        assert_eq!(comment.status, ModerationStatus::Pending);

        let approved = service
            .update_comment_status(&moderator, &comment.id, ModerationStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, ModerationStatus::Approved);

        let edited = service
            .update_comment(
                &author,
                &comment.id,
                CommentEdit::default().with_content("Me too, twice"),
            )
            .await
            .unwrap();
        assert_eq!(edited.status, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn helpful_mark_ignores_status_but_not_authorship() {
        let (service, review) = setup(ModerationStatus::Approved).await;
        let author = Actor::user(UserId::new());
        let reader = Actor::user(UserId::new());
        let comment = service
            .create_comment(&author, NewComment::new(review.id, "Try it warm"))
            .await
            .unwrap();
        assert_eq!(comment.status, ModerationStatus::Pending);

        let marked = service
            .mark_comment_helpful(&reader, &comment.id)
            .await
            .unwrap();
        assert_eq!(marked.helpful_count, 1);

        let err = service
            .mark_comment_helpful(&author, &comment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Validation(_)));
    }

    #[tokio::test]
    async fn plain_user_cannot_set_status_even_on_own_comment() {
        let (service, review) = setup(ModerationStatus::Approved).await;
        let author = Actor::user(UserId::new());
        let comment = service
            .create_comment(&author, NewComment::new(review.id, "Nice"))
            .await
            .unwrap();

        let err = service
            .update_comment_status(&author, &comment.id, ModerationStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Authorization(_)));
    }
}
