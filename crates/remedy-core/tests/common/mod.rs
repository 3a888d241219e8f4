//! Shared fixtures for remedy-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use remedy_core::*;
use remedy_state::{RemedyStore, SourceStore};

pub struct Fixture<S> {
    pub engine: RemedyEngine<S>,
    pub moderator: Actor,
}

pub async fn fixture<S: EntityStore>(store: S) -> Fixture<S> {
    let engine = RemedyEngine::new(Arc::new(store));
    let moderator = register(&engine, "moderator", Role::Moderator).await;
    Fixture { engine, moderator }
}

pub async fn register<S: EntityStore>(engine: &RemedyEngine<S>, name: &str, role: Role) -> Actor {
    let user = engine
        .catalog()
        .register_user(NewUser::new(name, format!("{name}@example.com"), role))
        .await
        .unwrap();
    Actor::new(user.id, user.role)
}

pub fn review_of(remedy_id: RemedyId, rating: u8) -> NewReview {
    NewReview::new(
        remedy_id,
        ReviewRatings::uniform(rating),
        "My experience",
        "Tried it for two weeks",
    )
}

/// Remedy with the given symptom, created `age_days` ago and citing sources
/// with the given credibility scores.
pub async fn remedy_aged<S: EntityStore>(
    engine: &RemedyEngine<S>,
    name: &str,
    symptom: (&str, u8),
    age_days: i64,
    credibility: &[u8],
) -> RemedyRecord {
    let store = engine.store();
    let mut remedy = RemedyRecord::new(name, format!("{name} preparation"))
        .with_symptom(symptom.0, symptom.1)
        .with_created_at(Utc::now() - Duration::days(age_days));

    for (i, score) in credibility.iter().enumerate() {
        let source = store
            .create_source(SourceRecord::new(
                format!("{name} study {i}"),
                format!("https://studies.example/{}/{i}", name.to_lowercase().replace(' ', "-")),
                *score,
            ))
            .await
            .unwrap();
        remedy.source_ids.push(source.id);
    }

    let remedy = store.create_remedy(remedy).await.unwrap();
    for source_id in &remedy.source_ids {
        store.add_source_remedy(source_id, &remedy.id).await.unwrap();
    }
    remedy
}

/// Stored stats must equal the stats derived from the approved set.
pub async fn assert_stats_invariant<S: EntityStore>(engine: &RemedyEngine<S>, remedy_id: &RemedyId) {
    let stored = engine.catalog().get_remedy(remedy_id).await.unwrap().stats();
    let reviews = engine
        .reviews()
        .list_reviews_for_remedy(None, remedy_id)
        .await
        .unwrap();
    assert_eq!(stored, compute_stats(&reviews), "stats drifted for {remedy_id}");
}
