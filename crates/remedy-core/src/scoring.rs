//! Relevance scoring of a remedy against a set of symptom keywords.
//!
//! ```text
//! score = avg_rating * 10                                   (0..=50)
//!       + Σ relevance_score / 10 over matching symptoms     (0..=10 each)
//!       + mean(source credibility) * 2, 0 without sources   (0..=20)
//!       + max(0, 10 - age_in_days / 30)                     (0..=10)
//! ```
//!
//! Scores are per-remedy; nothing is normalized across candidates.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use remedy_state::{RemedyRecord, SourceRecord};
use serde::Serialize;

use crate::domain::{RemedyError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Distinct, non-empty set of exact-match symptom keywords.
///
/// Matching is case-sensitive and unnormalized: `"headache"` does not
/// match a symptom named `"Headache"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    pub fn new<I, K>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keywords: BTreeSet<String> = keywords.into_iter().map(Into::into).collect();
        if keywords.is_empty() {
            return Err(RemedyError::validation("at least one keyword is required"));
        }
        Ok(Self { keywords })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keywords.contains(name)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.keywords.iter().cloned().collect()
    }
}

/// Whether the remedy has at least one symptom named by a keyword.
///
/// The single candidate rule shared by scored and unscored search.
pub fn matches_keywords(remedy: &RemedyRecord, keywords: &KeywordSet) -> bool {
    remedy.symptoms.iter().any(|s| keywords.contains(&s.name))
}

/// The four weighted components of a relevance score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub rating: f64,
    pub symptom: f64,
    pub credibility: f64,
    pub recency: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.rating + self.symptom + self.credibility + self.recency
    }
}

/// Score one remedy. `sources` are the remedy's linked sources; `now` is
/// fixed by the caller so one query scores every candidate at the same
/// instant.
pub fn relevance_score(
    remedy: &RemedyRecord,
    keywords: &KeywordSet,
    sources: &[SourceRecord],
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    ScoreBreakdown {
        rating: remedy.avg_rating * 10.0,
        symptom: symptom_component(remedy, keywords),
        credibility: credibility_component(sources),
        recency: recency_component(remedy.created_at, now),
    }
}

fn symptom_component(remedy: &RemedyRecord, keywords: &KeywordSet) -> f64 {
    remedy
        .symptoms
        .iter()
        .filter(|s| keywords.contains(&s.name))
        .map(|s| f64::from(s.relevance_score) / 10.0)
        .sum()
}

fn credibility_component(sources: &[SourceRecord]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    let total: f64 = sources
        .iter()
        .map(|s| f64::from(s.credibility_score))
        .sum();
    total / sources.len() as f64 * 2.0
}

fn recency_component(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_secs = (now - created_at).num_milliseconds() as f64 / 1000.0;
    // Future timestamps count as age zero.
    let age_days = (age_secs / SECONDS_PER_DAY).max(0.0);
    (10.0 - age_days / 30.0).max(0.0)
}
