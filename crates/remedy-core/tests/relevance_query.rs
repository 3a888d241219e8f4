//! Keyword queries: candidate selection, scoring and ranking.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use remedy_core::*;
use remedy_state::MemoryEntityStore;

async fn approve_rating<S: EntityStore>(
    fixture: &Fixture<S>,
    remedy_id: RemedyId,
    reviewer: &str,
    rating: u8,
) {
    let author = register(&fixture.engine, reviewer, Role::User).await;
    let review = fixture
        .engine
        .reviews()
        .create_review(&author, review_of(remedy_id, rating))
        .await
        .unwrap()
        .value;
    fixture
        .engine
        .reviews()
        .update_review_status(&fixture.moderator, &review.id, ModerationStatus::Approved)
        .await
        .unwrap();
}

#[tokio::test]
async fn reference_remedy_scores_as_expected() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let remedy = remedy_aged(&fixture.engine, "Feverfew", ("Headache", 90), 10, &[8, 6]).await;
    approve_rating(&fixture, remedy.id, "sam", 4).await;

    let ranked = fixture
        .engine
        .search()
        .query_remedies(&["Headache"])
        .await
        .unwrap();
    assert_eq!(ranked.len(), 1);

    let scored = &ranked[0];
    assert_abs_diff_eq!(scored.breakdown.rating, 40.0, epsilon = 1e-9);
    assert_abs_diff_eq!(scored.breakdown.symptom, 9.0, epsilon = 1e-9);
    assert_abs_diff_eq!(scored.breakdown.credibility, 14.0, epsilon = 1e-9);
    assert_abs_diff_eq!(scored.breakdown.recency, 9.6667, epsilon = 1e-2);
    assert_abs_diff_eq!(scored.calculated_relevance_score, 72.6667, epsilon = 1e-2);
}

#[tokio::test]
async fn query_returns_exactly_the_matching_remedies() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let engine = &fixture.engine;
    let headache = remedy_aged(engine, "Willow bark", ("Headache", 70), 1, &[]).await;
    let nausea = remedy_aged(engine, "Ginger root", ("Nausea", 80), 1, &[]).await;
    remedy_aged(engine, "Valerian", ("Insomnia", 60), 1, &[]).await;

    let ranked = engine
        .search()
        .query_remedies(&["Headache", "Nausea", "Headache"])
        .await
        .unwrap();
    let mut ids: Vec<_> = ranked.iter().map(|r| r.remedy.id).collect();
    ids.sort();
    let mut expected = vec![headache.id, nausea.id];
    expected.sort();
    assert_eq!(ids, expected);

    // Symptom names match exactly, case included.
    let none = engine.search().query_remedies(&["headache"]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn ranking_is_descending_by_score() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let engine = &fixture.engine;
    let old = remedy_aged(engine, "Clove oil", ("Toothache", 40), 400, &[]).await;
    let fresh = remedy_aged(engine, "Salt rinse", ("Toothache", 40), 0, &[9]).await;
    let rated = remedy_aged(engine, "Benzocaine gel", ("Toothache", 40), 200, &[5]).await;
    approve_rating(&fixture, rated.id, "ada", 5).await;

    let ranked = engine.search().query_remedies(&["Toothache"]).await.unwrap();
    let order: Vec<_> = ranked.iter().map(|r| r.remedy.id).collect();
    assert_eq!(order, vec![rated.id, fresh.id, old.id]);
    assert!(ranked
        .windows(2)
        .all(|w| w[0].calculated_relevance_score >= w[1].calculated_relevance_score));

    let old_score = &ranked[2].breakdown;
    assert_eq!(old_score.recency, 0.0);
    assert_eq!(old_score.credibility, 0.0);
}

#[tokio::test]
async fn symptom_component_sums_every_matching_symptom() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let engine = &fixture.engine;
    let store = engine.store();
    let remedy = remedy_state::RemedyStore::create_remedy(
        store.as_ref(),
        RemedyRecord::new("Turmeric", "Golden milk")
            .with_symptom("Inflammation", 80)
            .with_symptom("Joint pain", 60)
            .with_symptom("Indigestion", 30),
    )
    .await
    .unwrap();

    let ranked = engine
        .search()
        .query_remedies(&["Inflammation", "Joint pain"])
        .await
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].remedy.id, remedy.id);
    assert_abs_diff_eq!(ranked[0].breakdown.symptom, 14.0, epsilon = 1e-9);
}

#[tokio::test]
async fn unscored_search_orders_by_average_rating() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let engine = &fixture.engine;
    let low = remedy_aged(engine, "Lavender", ("Stress", 50), 1, &[]).await;
    let high = remedy_aged(engine, "Ashwagandha", ("Stress", 50), 1, &[]).await;
    approve_rating(&fixture, low.id, "una", 2).await;
    approve_rating(&fixture, high.id, "vic", 5).await;

    let found = engine.search().search_remedies(&["Stress"]).await.unwrap();
    let order: Vec<_> = found.iter().map(|r| r.id).collect();
    assert_eq!(order, vec![high.id, low.id]);
}

#[tokio::test]
async fn empty_keyword_list_is_rejected() {
    let fixture = fixture(MemoryEntityStore::new()).await;
    let err = fixture
        .engine
        .search()
        .query_remedies::<&str>(&[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
