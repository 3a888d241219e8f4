//! Moderation transitions and the stats they keep in sync.

mod common;

use common::*;
use remedy_core::*;
use remedy_state::{MemoryEntityStore, ReviewStore, UserStore};

#[tokio::test]
async fn approval_lifecycle_drives_stats() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Peppermint oil", ("Headache", 90), 10, &[]).await;
    let author = register(&engine, "lena", Role::User).await;

    // Created → pending, stats untouched.
    let created = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 4))
        .await
        .unwrap();
    assert_eq!(created.value.status, ModerationStatus::Pending);
    assert_eq!(created.stats.stats(), Some(RemedyStats::default()));

    // Approved → counted.
    let approved = engine
        .reviews()
        .update_review_status(&moderator, &created.value.id, ModerationStatus::Approved)
        .await
        .unwrap();
    let stats = approved.stats.stats().unwrap();
    assert_eq!(stats.review_count, 1);
    assert_eq!(stats.avg_rating, 4.0);
    assert_stats_invariant(&engine, &remedy.id).await;

    // Flagged → excluded again.
    let flagged = engine
        .reviews()
        .update_review_status(&moderator, &created.value.id, ModerationStatus::Flagged)
        .await
        .unwrap();
    assert_eq!(flagged.stats.stats(), Some(RemedyStats::default()));
    assert_stats_invariant(&engine, &remedy.id).await;
}

#[tokio::test]
async fn author_edit_resets_approval_and_stats() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Ginger", ("Nausea", 80), 3, &[]).await;
    let author = register(&engine, "omar", Role::User).await;
    let other = register(&engine, "ines", Role::User).await;

    let mine = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;
    let theirs = engine
        .reviews()
        .create_review(&other, review_of(remedy.id, 2))
        .await
        .unwrap()
        .value;
    for id in [mine.id, theirs.id] {
        engine
            .reviews()
            .update_review_status(&moderator, &id, ModerationStatus::Approved)
            .await
            .unwrap();
    }
    assert_eq!(
        engine.catalog().get_remedy(&remedy.id).await.unwrap().avg_rating,
        3.5
    );

    let edited = engine
        .reviews()
        .update_review(
            &author,
            &mine.id,
            ReviewEdit::default().with_content("Wore off after a week"),
        )
        .await
        .unwrap();
    assert_eq!(edited.value.status, ModerationStatus::Pending);
    let stats = edited.stats.stats().unwrap();
    assert_eq!(stats.review_count, 1);
    assert_eq!(stats.avg_rating, 2.0);
    assert_stats_invariant(&engine, &remedy.id).await;
}

#[tokio::test]
async fn moderator_rating_edit_recomputes_without_status_change() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Arnica", ("Bruising", 70), 1, &[]).await;
    let author = register(&engine, "tom", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;
    engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();

    let edited = engine
        .reviews()
        .update_review(
            &moderator,
            &review.id,
            ReviewEdit::default().with_ratings(ReviewRatings::uniform(3)),
        )
        .await
        .unwrap();
    assert_eq!(edited.value.status, ModerationStatus::Approved);
    assert_eq!(edited.stats.stats().unwrap().avg_rating, 3.0);
    assert_stats_invariant(&engine, &remedy.id).await;
}

#[tokio::test]
async fn second_review_for_same_remedy_conflicts() {
    let Fixture { engine, .. } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Honey", ("Cough", 60), 1, &[]).await;
    let author = register(&engine, "ari", Role::User).await;

    engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 4))
        .await
        .unwrap();
    let err = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, RemedyError::Conflict(_)));
    assert_eq!(engine.store().review_count(), 1);
}

#[tokio::test]
async fn plain_users_cannot_moderate() {
    let Fixture { engine, .. } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Sage", ("Sore throat", 50), 1, &[]).await;
    let author = register(&engine, "kai", Role::User).await;
    let stranger = register(&engine, "zoe", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 4))
        .await
        .unwrap()
        .value;

    let err = engine
        .reviews()
        .update_review_status(&author, &review.id, ModerationStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, RemedyError::Authorization(_)));

    let err = engine
        .reviews()
        .update_review(&stranger, &review.id, ReviewEdit::default().with_title("Mine now"))
        .await
        .unwrap_err();
    assert!(matches!(err, RemedyError::Authorization(_)));

    let err = engine
        .reviews()
        .delete_review(&stranger, &review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RemedyError::Authorization(_)));
}

#[tokio::test]
async fn delete_cascades_comments_and_back_references() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Chamomile", ("Insomnia", 85), 2, &[]).await;
    let author = register(&engine, "mia", Role::User).await;
    let commenter = register(&engine, "leo", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;
    engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();
    engine
        .comments()
        .create_comment(&commenter, NewComment::new(review.id, "Worked for me too"))
        .await
        .unwrap();
    assert_eq!(engine.store().comment_count(), 1);

    let deleted = engine
        .reviews()
        .delete_review(&author, &review.id)
        .await
        .unwrap();
    assert_eq!(deleted.stats.stats(), Some(RemedyStats::default()));

    let store = engine.store();
    assert!(store.get_review(&review.id).await.unwrap().is_none());
    assert_eq!(store.comment_count(), 0);
    let remedy = engine.catalog().get_remedy(&remedy.id).await.unwrap();
    assert!(remedy.review_ids.is_empty());
    let author_record = store.get_user(&author.user_id).await.unwrap().unwrap();
    assert!(author_record.review_ids.is_empty());
    let commenter_record = store.get_user(&commenter.user_id).await.unwrap().unwrap();
    assert!(commenter_record.comment_ids.is_empty());
}

#[tokio::test]
async fn helpful_marks() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Eucalyptus", ("Congestion", 75), 2, &[]).await;
    let author = register(&engine, "noa", Role::User).await;
    let reader = register(&engine, "eli", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 4))
        .await
        .unwrap()
        .value;

    // Still pending: any other user may vote.
    let marked = engine
        .reviews()
        .mark_review_helpful(&reader, &review.id)
        .await
        .unwrap();
    assert_eq!(marked.helpful_count, 1);
    assert_eq!(marked.status, ModerationStatus::Pending);

    engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();

    let err = engine
        .reviews()
        .mark_review_helpful(&author, &review.id)
        .await
        .unwrap_err();
    assert!(matches!(err, RemedyError::Validation(_)));

    let marked = engine
        .reviews()
        .mark_review_helpful(&moderator, &review.id)
        .await
        .unwrap();
    assert_eq!(marked.helpful_count, 2);
    assert_eq!(marked.status, ModerationStatus::Approved);
    assert_stats_invariant(&engine, &remedy.id).await;
}

#[tokio::test]
async fn helpful_mark_on_flagged_comment_counts() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Witch hazel", ("Itching", 45), 2, &[]).await;
    let author = register(&engine, "rui", Role::User).await;
    let reader = register(&engine, "sol", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 3))
        .await
        .unwrap()
        .value;
    let comment = engine
        .comments()
        .create_comment(&author, NewComment::new(review.id, "Update: still itchy"))
        .await
        .unwrap();
    engine
        .comments()
        .update_comment_status(&moderator, &comment.id, ModerationStatus::Flagged)
        .await
        .unwrap();

    let marked = engine
        .comments()
        .mark_comment_helpful(&reader, &comment.id)
        .await
        .unwrap();
    assert_eq!(marked.helpful_count, 1);
    assert_eq!(marked.status, ModerationStatus::Flagged);
}

#[tokio::test]
async fn delete_recomputes_even_when_unlinking_fails() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Calendula", ("Rash", 60), 2, &[]).await;
    let author = register(&engine, "uma", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;
    engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();
    assert_eq!(
        engine.catalog().get_remedy(&remedy.id).await.unwrap().review_count,
        1
    );

    engine.store().fail_next_review_unlinks(1);
    let err = engine
        .reviews()
        .delete_review(&author, &review.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    // The review is gone and the stats no longer count it.
    assert!(engine.store().get_review(&review.id).await.unwrap().is_none());
    let stored = engine.catalog().get_remedy(&remedy.id).await.unwrap();
    assert_eq!(stored.stats(), RemedyStats::default());
    assert_stats_invariant(&engine, &remedy.id).await;

    // Cleanup kept going past the failed step.
    let author_record = engine
        .store()
        .get_user(&author.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(author_record.review_ids.is_empty());
}

#[tokio::test]
async fn failed_recompute_keeps_the_mutation() {
    let store = MemoryEntityStore::new();
    let engine = RemedyEngine::with_config(
        std::sync::Arc::new(store),
        EngineConfig::default().with_recompute_attempts(1),
    );
    let moderator = register(&engine, "mod", Role::Moderator).await;
    let remedy = remedy_aged(&engine, "Lemon balm", ("Anxiety", 65), 5, &[]).await;
    let author = register(&engine, "ivy", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;

    engine.store().fail_next_stats_updates(1);
    let approved = engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();
    assert_eq!(approved.value.status, ModerationStatus::Approved);
    assert!(matches!(approved.stats, StatsSync::Lagging { .. }));

    // The status change stands; reconciliation catches the stats up.
    let report = engine.aggregator().reconcile_all().await.unwrap();
    assert_eq!(report.changed, vec![remedy.id]);
    assert_stats_invariant(&engine, &remedy.id).await;
}

#[tokio::test]
async fn visibility_of_listings() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Aloe", ("Burns", 90), 1, &[]).await;
    let a = register(&engine, "ann", Role::User).await;
    let b = register(&engine, "ben", Role::User).await;

    let approved = engine
        .reviews()
        .create_review(&a, review_of(remedy.id, 5))
        .await
        .unwrap()
        .value;
    engine
        .reviews()
        .update_review_status(&moderator, &approved.id, ModerationStatus::Approved)
        .await
        .unwrap();
    let pending = engine
        .reviews()
        .create_review(&b, review_of(remedy.id, 3))
        .await
        .unwrap()
        .value;

    let public = engine
        .reviews()
        .list_reviews_for_remedy(None, &remedy.id)
        .await
        .unwrap();
    assert_eq!(public.len(), 1);

    let for_b = engine
        .reviews()
        .list_reviews_for_remedy(Some(&b), &remedy.id)
        .await
        .unwrap();
    assert_eq!(for_b.len(), 2);
    assert!(for_b.iter().any(|r| r.id == pending.id));

    let for_a = engine
        .reviews()
        .list_reviews_for_remedy(Some(&a), &remedy.id)
        .await
        .unwrap();
    assert_eq!(for_a.len(), 1);

    let for_moderator = engine
        .reviews()
        .list_reviews_for_remedy(Some(&moderator), &remedy.id)
        .await
        .unwrap();
    assert_eq!(for_moderator.len(), 2);
}
