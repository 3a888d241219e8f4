//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryEntityStore`, which satisfies every entity-store trait
//! contract without any external dependencies.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::records::*;
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct Tables {
    // Vec keeps creation order, which is the discovery order of candidate queries.
    remedies: Vec<RemedyRecord>,
    sources: HashMap<SourceId, SourceRecord>,
    reviews: HashMap<ReviewId, ReviewRecord>,
    comments: HashMap<CommentId, CommentRecord>,
    users: HashMap<UserId, UserRecord>,
}

impl Tables {
    fn remedy_mut(&mut self, id: &RemedyId) -> StorageResult<&mut RemedyRecord> {
        self.remedies
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| StorageError::not_found(RemedyId::ENTITY, id))
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn oldest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> chrono::DateTime<Utc>,
{
    items.sort_by_key(|item| created_at(item));
    items
}

/// In-memory entity store backed by one mutex-guarded set of tables.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    tables: Mutex<Tables>,
    failing_stats_updates: AtomicU32,
    failing_review_unlinks: AtomicU32,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls to `update_remedy_stats` fail with a
    /// backend error.
    pub fn fail_next_stats_updates(&self, count: u32) {
        self.failing_stats_updates.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` calls to `remove_remedy_review` fail with a
    /// backend error.
    pub fn fail_next_review_unlinks(&self, count: u32) {
        self.failing_review_unlinks.store(count, Ordering::SeqCst);
    }

    /// Number of review records currently stored.
    pub fn review_count(&self) -> usize {
        self.tables.lock().unwrap().reviews.len()
    }

    /// Number of comment records currently stored.
    pub fn comment_count(&self) -> usize {
        self.tables.lock().unwrap().comments.len()
    }

    fn take_injected_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemedyStore for MemoryEntityStore {
    async fn create_remedy(&self, remedy: RemedyRecord) -> StorageResult<RemedyRecord> {
        let mut tables = self.tables.lock().unwrap();
        if tables.remedies.iter().any(|r| r.name == remedy.name) {
            return Err(StorageError::duplicate(RemedyId::ENTITY, remedy.name));
        }
        tables.remedies.push(remedy.clone());
        Ok(remedy)
    }

    async fn get_remedy(&self, id: &RemedyId) -> StorageResult<Option<RemedyRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.remedies.iter().find(|r| r.id == *id).cloned())
    }

    async fn list_remedies(&self) -> StorageResult<Vec<RemedyRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.remedies.clone())
    }

    async fn find_remedies_by_symptom_names(
        &self,
        names: &[String],
    ) -> StorageResult<Vec<RemedyRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .remedies
            .iter()
            .filter(|r| r.symptoms.iter().any(|s| names.contains(&s.name)))
            .cloned()
            .collect())
    }

    async fn update_remedy_stats(&self, id: &RemedyId, stats: RemedyStats) -> StorageResult<()> {
        if Self::take_injected_failure(&self.failing_stats_updates) {
            return Err(StorageError::Backend(
                "injected stats update failure".to_string(),
            ));
        }
        let mut tables = self.tables.lock().unwrap();
        let remedy = tables.remedy_mut(id)?;
        remedy.avg_rating = stats.avg_rating;
        remedy.review_count = stats.review_count;
        remedy.updated_at = Utc::now();
        Ok(())
    }

    async fn add_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        push_unique(&mut tables.remedy_mut(id)?.review_ids, *review);
        Ok(())
    }

    async fn remove_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()> {
        if Self::take_injected_failure(&self.failing_review_unlinks) {
            return Err(StorageError::Backend(
                "injected review unlink failure".to_string(),
            ));
        }
        let mut tables = self.tables.lock().unwrap();
        if let Ok(remedy) = tables.remedy_mut(id) {
            remedy.review_ids.retain(|r| r != review);
        }
        Ok(())
    }

    async fn add_remedy_source(&self, id: &RemedyId, source: &SourceId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        push_unique(&mut tables.remedy_mut(id)?.source_ids, *source);
        Ok(())
    }
}

#[async_trait]
impl SourceStore for MemoryEntityStore {
    async fn create_source(&self, source: SourceRecord) -> StorageResult<SourceRecord> {
        let mut tables = self.tables.lock().unwrap();
        if tables.sources.values().any(|s| s.url == source.url) {
            return Err(StorageError::duplicate(SourceId::ENTITY, source.url));
        }
        tables.sources.insert(source.id, source.clone());
        Ok(source)
    }

    async fn get_source(&self, id: &SourceId) -> StorageResult<Option<SourceRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.sources.get(id).cloned())
    }

    async fn get_sources(&self, ids: &[SourceId]) -> StorageResult<Vec<SourceRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.sources.get(id).cloned())
            .collect())
    }

    async fn add_source_remedy(&self, id: &SourceId, remedy: &RemedyId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let source = tables
            .sources
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(SourceId::ENTITY, id))?;
        push_unique(&mut source.remedy_ids, *remedy);
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryEntityStore {
    async fn create_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .reviews
            .values()
            .any(|r| r.author_id == review.author_id && r.remedy_id == review.remedy_id)
        {
            return Err(StorageError::duplicate(
                ReviewId::ENTITY,
                format!("{}/{}", review.author_id, review.remedy_id),
            ));
        }
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get_review(&self, id: &ReviewId) -> StorageResult<Option<ReviewRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.reviews.get(id).cloned())
    }

    async fn update_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .reviews
            .get_mut(&review.id)
            .ok_or_else(|| StorageError::not_found(ReviewId::ENTITY, review.id))?;
        *slot = review.clone();
        Ok(review)
    }

    async fn delete_review(&self, id: &ReviewId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .reviews
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(ReviewId::ENTITY, id))
    }

    async fn find_reviews_by_remedy(
        &self,
        remedy: &RemedyId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<ReviewRecord>> {
        let tables = self.tables.lock().unwrap();
        let reviews = tables
            .reviews
            .values()
            .filter(|r| r.remedy_id == *remedy)
            .filter(|r| status.map(|s| r.status == s).unwrap_or(true))
            .cloned()
            .collect();
        Ok(oldest_first(reviews, |r: &ReviewRecord| r.created_at))
    }

    async fn find_review_by_author_and_remedy(
        &self,
        author: &UserId,
        remedy: &RemedyId,
    ) -> StorageResult<Option<ReviewRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reviews
            .values()
            .find(|r| r.author_id == *author && r.remedy_id == *remedy)
            .cloned())
    }

    async fn increment_review_helpful(&self, id: &ReviewId) -> StorageResult<ReviewRecord> {
        let mut tables = self.tables.lock().unwrap();
        let review = tables
            .reviews
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(ReviewId::ENTITY, id))?;
        review.helpful_count += 1;
        Ok(review.clone())
    }

    async fn add_review_comment(&self, id: &ReviewId, comment: &CommentId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let review = tables
            .reviews
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(ReviewId::ENTITY, id))?;
        push_unique(&mut review.comment_ids, *comment);
        Ok(())
    }

    async fn remove_review_comment(
        &self,
        id: &ReviewId,
        comment: &CommentId,
    ) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(review) = tables.reviews.get_mut(id) {
            review.comment_ids.retain(|c| c != comment);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentStore for MemoryEntityStore {
    async fn create_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord> {
        let mut tables = self.tables.lock().unwrap();
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<CommentRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.comments.get(id).cloned())
    }

    async fn update_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| StorageError::not_found(CommentId::ENTITY, comment.id))?;
        *slot = comment.clone();
        Ok(comment)
    }

    async fn delete_comment(&self, id: &CommentId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .comments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(CommentId::ENTITY, id))
    }

    async fn find_comments_by_review(
        &self,
        review: &ReviewId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<CommentRecord>> {
        let tables = self.tables.lock().unwrap();
        let comments = tables
            .comments
            .values()
            .filter(|c| c.review_id == *review)
            .filter(|c| status.map(|s| c.status == s).unwrap_or(true))
            .cloned()
            .collect();
        Ok(oldest_first(comments, |c: &CommentRecord| c.created_at))
    }

    async fn increment_comment_helpful(&self, id: &CommentId) -> StorageResult<CommentRecord> {
        let mut tables = self.tables.lock().unwrap();
        let comment = tables
            .comments
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(CommentId::ENTITY, id))?;
        comment.helpful_count += 1;
        Ok(comment.clone())
    }
}

#[async_trait]
impl UserStore for MemoryEntityStore {
    async fn create_user(&self, user: UserRecord) -> StorageResult<UserRecord> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StorageError::duplicate(UserId::ENTITY, user.username));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<UserRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.get(id).cloned())
    }

    async fn add_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(UserId::ENTITY, id))?;
        push_unique(&mut user.review_ids, *review);
        Ok(())
    }

    async fn remove_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.get_mut(id) {
            user.review_ids.retain(|r| r != review);
        }
        Ok(())
    }

    async fn add_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(UserId::ENTITY, id))?;
        push_unique(&mut user.comment_ids, *comment);
        Ok(())
    }

    async fn remove_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.get_mut(id) {
            user.comment_ids.retain(|c| c != comment);
        }
        Ok(())
    }
}
