//! Keyword search over remedies, scored and unscored.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use remedy_state::{EntityStore, RemedyRecord};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::Result;
use crate::metrics::METRICS;
use crate::obs;
use crate::scoring::{matches_keywords, relevance_score, KeywordSet, ScoreBreakdown};

/// A candidate remedy with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRemedy {
    pub remedy: RemedyRecord,
    pub calculated_relevance_score: f64,
    pub breakdown: ScoreBreakdown,
}

pub struct RemedySearch<S> {
    store: Arc<S>,
}

impl<S> RemedySearch<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Remedies with at least one symptom named by a keyword, in store
    /// discovery order.
    async fn candidates(&self, keywords: &KeywordSet) -> Result<Vec<RemedyRecord>> {
        let found = self
            .store
            .find_remedies_by_symptom_names(&keywords.to_vec())
            .await?;
        Ok(found
            .into_iter()
            .filter(|r| matches_keywords(r, keywords))
            .collect())
    }

    /// Rank candidates by relevance score, highest first.
    ///
    /// Ties keep discovery order. Fails with `Validation` for an empty
    /// keyword list.
    #[instrument(skip_all, fields(keywords = keywords.len()))]
    pub async fn query_remedies<K>(&self, keywords: &[K]) -> Result<Vec<ScoredRemedy>>
    where
        K: AsRef<str>,
    {
        let keywords = KeywordSet::new(keywords.iter().map(|k| k.as_ref().to_string()))?;
        let candidates = self.candidates(&keywords).await?;
        debug!(candidates = candidates.len(), "scoring candidates");

        let sources = try_join_all(
            candidates
                .iter()
                .map(|remedy| self.store.get_sources(&remedy.source_ids)),
        )
        .await?;

        let now = Utc::now();
        let mut ranked: Vec<ScoredRemedy> = candidates
            .into_iter()
            .zip(sources)
            .map(|(remedy, sources)| {
                let breakdown = relevance_score(&remedy, &keywords, &sources, now);
                ScoredRemedy {
                    calculated_relevance_score: breakdown.total(),
                    breakdown,
                    remedy,
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.calculated_relevance_score
                .total_cmp(&a.calculated_relevance_score)
        });

        METRICS.inc_queries_scored();
        obs::emit_query_ranked(
            keywords.len(),
            ranked.len(),
            ranked.first().map(|r| r.calculated_relevance_score),
        );
        Ok(ranked)
    }

    /// Candidates without scoring, by `avg_rating` highest first.
    #[instrument(skip_all, fields(keywords = keywords.len()))]
    pub async fn search_remedies<K>(&self, keywords: &[K]) -> Result<Vec<RemedyRecord>>
    where
        K: AsRef<str>,
    {
        let keywords = KeywordSet::new(keywords.iter().map(|k| k.as_ref().to_string()))?;
        let mut found = self.candidates(&keywords).await?;
        found.sort_by(|a, b| b.avg_rating.total_cmp(&a.avg_rating));

        METRICS.inc_searches();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_state::{MemoryEntityStore, RemedyStats, RemedyStore};

    async fn remedy(store: &MemoryEntityStore, name: &str, symptom: &str, avg: f64) -> RemedyRecord {
        let remedy = store
            .create_remedy(RemedyRecord::new(name, "test").with_symptom(symptom, 50))
            .await
            .unwrap();
        store
            .update_remedy_stats(
                &remedy.id,
                RemedyStats {
                    avg_rating: avg,
                    review_count: 1,
                },
            )
            .await
            .unwrap();
        remedy
    }

    #[tokio::test]
    async fn empty_keywords_fail_validation() {
        let search = RemedySearch::new(Arc::new(MemoryEntityStore::new()));
        let err = search.query_remedies::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, crate::RemedyError::Validation(_)));
        assert!(search.search_remedies::<&str>(&[]).await.is_err());
    }

    #[tokio::test]
    async fn search_orders_by_rating() {
        let store = Arc::new(MemoryEntityStore::new());
        let low = remedy(&store, "Low", "Cough", 2.0).await;
        let high = remedy(&store, "High", "Cough", 4.5).await;
        remedy(&store, "Other", "Rash", 5.0).await;

        let search = RemedySearch::new(store);
        let found = search.search_remedies(&["Cough"]).await.unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![high.id, low.id]);
    }

    #[tokio::test]
    async fn ties_keep_discovery_order() {
        let store = Arc::new(MemoryEntityStore::new());
        let now = Utc::now();
        let first = store
            .create_remedy(
                RemedyRecord::new("First", "a")
                    .with_symptom("Cough", 50)
                    .with_created_at(now),
            )
            .await
            .unwrap();
        let second = store
            .create_remedy(
                RemedyRecord::new("Second", "b")
                    .with_symptom("Cough", 50)
                    .with_created_at(now),
            )
            .await
            .unwrap();

        let search = RemedySearch::new(store);
        let ranked = search.query_remedies(&["Cough"]).await.unwrap();
        let ids: Vec<_> = ranked.iter().map(|r| r.remedy.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
