//! Caller-supplied inputs and their format validation.
//!
//! Every `validate` here runs before any store access, so format problems
//! always surface as `Validation` ahead of `NotFound` or `Authorization`.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use remedy_state::{
    ModerationStatus, RemedyId, ReviewId, ReviewRatings, Role, SourceId, Symptom,
};
use serde::{Deserialize, Serialize};

use super::error::{RemedyError, Result};

/// Allowed range for every review rating dimension.
pub const RATING_RANGE: RangeInclusive<u8> = 1..=5;
/// Allowed range for a symptom's relevance weight.
pub const RELEVANCE_RANGE: RangeInclusive<u8> = 0..=100;
/// Allowed range for a source's credibility score.
pub const CREDIBILITY_RANGE: RangeInclusive<u8> = 1..=10;

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RemedyError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_in(field: &str, value: u8, range: &RangeInclusive<u8>) -> Result<()> {
    if !range.contains(&value) {
        return Err(RemedyError::validation(format!(
            "{field} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )));
    }
    Ok(())
}

/// Validate all four rating dimensions.
pub fn validate_ratings(ratings: &ReviewRatings) -> Result<()> {
    require_in("rating", ratings.rating, &RATING_RANGE)?;
    require_in("effectiveness", ratings.effectiveness, &RATING_RANGE)?;
    require_in("side_effects", ratings.side_effects, &RATING_RANGE)?;
    require_in("ease", ratings.ease, &RATING_RANGE)
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub remedy_id: RemedyId,
    pub ratings: ReviewRatings,
    pub title: String,
    pub content: String,
}

impl NewReview {
    pub fn new(
        remedy_id: RemedyId,
        ratings: ReviewRatings,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            remedy_id,
            ratings,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratings(&self.ratings)?;
        require_text("title", &self.title)?;
        require_text("content", &self.content)
    }
}

/// A partial update of a review. `status` is honoured for moderators only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewEdit {
    pub ratings: Option<ReviewRatings>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<ModerationStatus>,
}

impl ReviewEdit {
    pub fn with_ratings(mut self, ratings: ReviewRatings) -> Self {
        self.ratings = Some(ratings);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_status(mut self, status: ModerationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_none()
            && self.title.is_none()
            && self.content.is_none()
            && self.status.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(RemedyError::validation("edit changes nothing"));
        }
        if let Some(ratings) = &self.ratings {
            validate_ratings(ratings)?;
        }
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        if let Some(content) = &self.content {
            require_text("content", content)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub review_id: ReviewId,
    pub content: String,
}

impl NewComment {
    pub fn new(review_id: ReviewId, content: impl Into<String>) -> Self {
        Self {
            review_id,
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("content", &self.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentEdit {
    pub content: Option<String>,
    pub status: Option<ModerationStatus>,
}

impl CommentEdit {
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_status(mut self, status: ModerationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.content, &self.status) {
            (None, None) => Err(RemedyError::validation("edit changes nothing")),
            (Some(content), _) => require_text("content", content),
            (None, Some(_)) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            role,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("username", &self.username)?;
        if !self.email.contains('@') {
            return Err(RemedyError::validation(format!(
                "email is not an address: {:?}",
                self.email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRemedy {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub source_ids: Vec<SourceId>,
    #[serde(default)]
    pub verified: bool,
}

impl NewRemedy {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_symptom(mut self, name: impl Into<String>, relevance_score: u8) -> Self {
        self.symptoms.push(Symptom::new(name, relevance_score));
        self
    }

    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source_ids.push(source);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        for symptom in &self.symptoms {
            require_text("symptom name", &symptom.name)?;
            require_in("relevance_score", symptom.relevance_score, &RELEVANCE_RANGE)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSource {
    pub title: String,
    pub url: String,
    pub credibility_score: u8,
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub is_peer_reviewed: bool,
}

impl NewSource {
    pub fn new(title: impl Into<String>, url: impl Into<String>, credibility_score: u8) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            credibility_score,
            publication_date: None,
            authors: Vec::new(),
            publisher: None,
            is_peer_reviewed: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("url", &self.url)?;
        require_in("credibility_score", self.credibility_score, &CREDIBILITY_RANGE)
    }
}
