//! Entity records shared by every store backend.
//!
//! These are the shapes the rest of the platform works with. Backends convert
//! to and from their own row layouts at the boundary (see `schema` for the
//! SurrealDB rows).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InvalidId, UnknownVariant};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Entity name used in error messages.
            pub const ENTITY: &'static str = $entity;

            /// Generate a new random id.
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                $name(id)
            }
        }

        impl FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map($name).map_err(|_| InvalidId {
                    entity: $entity,
                    value: s.to_string(),
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a remedy
    RemedyId,
    "remedy"
);
entity_id!(
    /// Identifier of a source
    SourceId,
    "source"
);
entity_id!(
    /// Identifier of a review
    ReviewId,
    "review"
);
entity_id!(
    /// Identifier of a comment
    CommentId,
    "comment"
);
entity_id!(
    /// Identifier of a user
    UserId,
    "user"
);

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Moderation state of a user-submitted review or comment.
///
/// Only `Approved` records are visible on the public read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Flagged,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Flagged => "flagged",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ModerationStatus::Approved)
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ModerationStatus::Pending),
            "approved" => Ok(ModerationStatus::Approved),
            "flagged" => Ok(ModerationStatus::Flagged),
            other => Err(UnknownVariant {
                kind: "moderation status",
                value: other.to_string(),
            }),
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Moderators and admins may moderate and edit content they do not own.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Remedy
// ---------------------------------------------------------------------------

/// A curated symptom a remedy addresses, weighted 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub name: String,
    pub relevance_score: u8,
}

impl Symptom {
    pub fn new(name: impl Into<String>, relevance_score: u8) -> Self {
        Self {
            name: name.into(),
            relevance_score,
        }
    }
}

/// Derived review statistics of a remedy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RemedyStats {
    pub avg_rating: f64,
    pub review_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedyRecord {
    pub id: RemedyId,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub symptoms: Vec<Symptom>,
    pub warnings: Vec<String>,
    pub source_ids: Vec<SourceId>,
    /// Derived; written only through `RemedyStore::update_remedy_stats`.
    pub avg_rating: f64,
    /// Derived; written only through `RemedyStore::update_remedy_stats`.
    pub review_count: u32,
    pub review_ids: Vec<ReviewId>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemedyRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RemedyId::new(),
            name: name.into(),
            description: description.into(),
            categories: Vec::new(),
            symptoms: Vec::new(),
            warnings: Vec::new(),
            source_ids: Vec::new(),
            avg_rating: 0.0,
            review_count: 0,
            review_ids: Vec::new(),
            verified: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_symptom(mut self, name: impl Into<String>, relevance_score: u8) -> Self {
        self.symptoms.push(Symptom::new(name, relevance_score));
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    pub fn stats(&self) -> RemedyStats {
        RemedyStats {
            avg_rating: self.avg_rating,
            review_count: self.review_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    pub title: String,
    pub url: String,
    /// 1..=10
    pub credibility_score: u8,
    pub publication_date: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub is_peer_reviewed: bool,
    pub remedy_ids: Vec<RemedyId>,
    pub created_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, url: impl Into<String>, credibility_score: u8) -> Self {
        Self {
            id: SourceId::new(),
            title: title.into(),
            url: url.into(),
            credibility_score,
            publication_date: None,
            authors: Vec::new(),
            publisher: None,
            is_peer_reviewed: false,
            remedy_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn peer_reviewed(mut self) -> Self {
        self.is_peer_reviewed = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// The four 1..=5 scores a reviewer gives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRatings {
    pub rating: u8,
    pub effectiveness: u8,
    pub side_effects: u8,
    pub ease: u8,
}

impl ReviewRatings {
    /// All four scores set to the same value.
    pub fn uniform(score: u8) -> Self {
        Self {
            rating: score,
            effectiveness: score,
            side_effects: score,
            ease: score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: ReviewId,
    pub author_id: UserId,
    pub remedy_id: RemedyId,
    pub ratings: ReviewRatings,
    pub title: String,
    pub content: String,
    pub helpful_count: u32,
    pub comment_ids: Vec<CommentId>,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(
        author_id: UserId,
        remedy_id: RemedyId,
        ratings: ReviewRatings,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReviewId::new(),
            author_id,
            remedy_id,
            ratings,
            title: title.into(),
            content: content.into(),
            helpful_count: 0,
            comment_ids: Vec::new(),
            status: ModerationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ModerationStatus) -> Self {
        self.status = status;
        self
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub author_id: UserId,
    pub review_id: ReviewId,
    pub content: String,
    pub helpful_count: u32,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentRecord {
    pub fn new(author_id: UserId, review_id: ReviewId, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            author_id,
            review_id,
            content: content.into(),
            helpful_count: 0,
            status: ModerationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ModerationStatus) -> Self {
        self.status = status;
        self
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub review_ids: Vec<ReviewId>,
    pub comment_ids: Vec<CommentId>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: email.into(),
            role,
            review_ids: Vec::new(),
            comment_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_round_trip_through_display() {
        let id = RemedyId::new();
        let parsed: RemedyId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_id_names_the_entity() {
        let err = "not-a-uuid".parse::<ReviewId>().unwrap_err();
        assert_eq!(err.entity, "review");
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ModerationStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        assert_eq!(
            "flagged".parse::<ModerationStatus>().unwrap(),
            ModerationStatus::Flagged
        );
        assert!("Approved".parse::<ModerationStatus>().is_err());
    }

    #[test]
    fn only_moderators_and_admins_are_privileged() {
        assert!(!Role::User.is_privileged());
        assert!(Role::Moderator.is_privileged());
        assert!(Role::Admin.is_privileged());
    }

    #[test]
    fn new_review_starts_pending() {
        let review = ReviewRecord::new(
            UserId::new(),
            RemedyId::new(),
            ReviewRatings::uniform(4),
            "Works",
            "Helped a lot",
        );
        assert_eq!(review.status, ModerationStatus::Pending);
        assert_eq!(review.helpful_count, 0);
    }

    #[test]
    fn new_remedy_has_zero_stats() {
        let remedy = RemedyRecord::new("Ginger tea", "Fresh ginger steeped in water");
        assert_eq!(remedy.stats(), RemedyStats::default());
    }
}
