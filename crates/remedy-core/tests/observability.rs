//! Structured events emitted by moderation, aggregation and ranking.

mod common;

use common::*;
use remedy_core::obs::*;
use remedy_core::*;
use remedy_state::MemoryEntityStore;
use tracing_test::traced_test;

#[traced_test]
#[test]
fn status_change_event_names_the_transition() {
    let id = ReviewId::new();
    emit_status_changed(
        "review",
        &id,
        ModerationStatus::Pending,
        ModerationStatus::Approved,
    );
    assert!(logs_contain("content.status_changed"));
    assert!(logs_contain("Entered"));
    assert!(logs_contain(&id.to_string()));
}

#[traced_test]
#[test]
fn lagging_stats_are_a_warning() {
    let id = RemedyId::new();
    emit_stats_lagging(&id, 2, &"backend unavailable");
    assert!(logs_contain("WARN"));
    assert!(logs_contain("stats.lagging"));
    assert!(logs_contain("backend unavailable"));
}

#[traced_test]
#[test]
fn query_event_without_candidates() {
    emit_query_ranked(2, 0, None);
    assert!(logs_contain("query.ranked"));
    assert!(logs_contain("candidates=0"));
}

#[tokio::test]
#[traced_test]
async fn review_lifecycle_is_logged() {
    let Fixture { engine, moderator } = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&engine, "Elderberry", ("Cold", 70), 5, &[6]).await;
    let author = register(&engine, "pia", Role::User).await;

    let review = engine
        .reviews()
        .create_review(&author, review_of(remedy.id, 4))
        .await
        .unwrap()
        .value;
    engine
        .reviews()
        .update_review_status(&moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();
    engine.search().query_remedies(&["Cold"]).await.unwrap();
    engine.reviews().delete_review(&author, &review.id).await.unwrap();

    assert!(logs_contain("content.created"));
    assert!(logs_contain("content.status_changed"));
    assert!(logs_contain("stats.recomputed"));
    assert!(logs_contain("query.ranked"));
    assert!(logs_contain("content.deleted"));
    assert!(logs_contain("review.create"));
}

#[tokio::test]
#[traced_test]
async fn reconciliation_summary_is_logged() {
    let Fixture { engine, .. } = fixture(MemoryEntityStore::new()).await;
    remedy_aged(&engine, "Oat bath", ("Eczema", 55), 1, &[]).await;

    let report = engine.aggregator().reconcile_all().await.unwrap();
    assert_eq!(report.remedies, 1);
    assert!(logs_contain("stats.reconciled"));
}
