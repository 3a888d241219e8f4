//! Row layouts for the SurrealDB tables
//!
//! Tables:
//! - remedies: curated remedies, their symptoms and derived review stats
//! - sources: citation sources
//! - reviews: user reviews (one per author and remedy)
//! - comments: comments on reviews
//! - users: accounts
//!
//! Rows carry the entity id as a plain string column (`remedy_id`, …) next to
//! SurrealDB's own record `id`, and store timestamps as native datetimes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::records::*;

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Module for serializing optional chrono DateTime to SurrealDB datetime format
mod surreal_datetime_opt {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => {
                let sd = SurrealDatetime::from(*d);
                serde::Serialize::serialize(&Some(sd), serializer)
            }
            None => serde::Serialize::serialize(&None::<SurrealDatetime>, serializer),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = Option::<SurrealDatetime>::deserialize(deserializer)?;
        Ok(sd.map(DateTime::from))
    }
}

fn parse_id<T>(raw: &str) -> Result<T, StorageError>
where
    T: std::str::FromStr<Err = crate::error::InvalidId>,
{
    raw.parse::<T>()
        .map_err(|e| StorageError::Backend(format!("corrupt row: {e}")))
}

fn parse_ids<T>(raw: &[String]) -> Result<Vec<T>, StorageError>
where
    T: std::str::FromStr<Err = crate::error::InvalidId>,
{
    raw.iter().map(|s| parse_id(s)).collect()
}

fn id_strings<T: ToString>(ids: &[T]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

// ---------------------------------------------------------------------------
// remedies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemedyRow {
    /// SurrealDB record ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub remedy_id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub symptoms: Vec<Symptom>,
    pub warnings: Vec<String>,
    pub source_ids: Vec<String>,
    pub avg_rating: f64,
    pub review_count: u32,
    pub review_ids: Vec<String>,
    pub verified: bool,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&RemedyRecord> for RemedyRow {
    fn from(r: &RemedyRecord) -> Self {
        RemedyRow {
            id: None,
            remedy_id: r.id.to_string(),
            name: r.name.clone(),
            description: r.description.clone(),
            categories: r.categories.clone(),
            symptoms: r.symptoms.clone(),
            warnings: r.warnings.clone(),
            source_ids: id_strings(&r.source_ids),
            avg_rating: r.avg_rating,
            review_count: r.review_count,
            review_ids: id_strings(&r.review_ids),
            verified: r.verified,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl TryFrom<RemedyRow> for RemedyRecord {
    type Error = StorageError;

    fn try_from(row: RemedyRow) -> Result<Self, Self::Error> {
        Ok(RemedyRecord {
            id: parse_id(&row.remedy_id)?,
            name: row.name,
            description: row.description,
            categories: row.categories,
            symptoms: row.symptoms,
            warnings: row.warnings,
            source_ids: parse_ids(&row.source_ids)?,
            avg_rating: row.avg_rating,
            review_count: row.review_count,
            review_ids: parse_ids(&row.review_ids)?,
            verified: row.verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub credibility_score: u8,
    #[serde(with = "surreal_datetime_opt", default)]
    pub publication_date: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub is_peer_reviewed: bool,
    pub remedy_ids: Vec<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&SourceRecord> for SourceRow {
    fn from(s: &SourceRecord) -> Self {
        SourceRow {
            id: None,
            source_id: s.id.to_string(),
            title: s.title.clone(),
            url: s.url.clone(),
            credibility_score: s.credibility_score,
            publication_date: s.publication_date,
            authors: s.authors.clone(),
            publisher: s.publisher.clone(),
            is_peer_reviewed: s.is_peer_reviewed,
            remedy_ids: id_strings(&s.remedy_ids),
            created_at: s.created_at,
        }
    }
}

impl TryFrom<SourceRow> for SourceRecord {
    type Error = StorageError;

    fn try_from(row: SourceRow) -> Result<Self, Self::Error> {
        Ok(SourceRecord {
            id: parse_id(&row.source_id)?,
            title: row.title,
            url: row.url,
            credibility_score: row.credibility_score,
            publication_date: row.publication_date,
            authors: row.authors,
            publisher: row.publisher,
            is_peer_reviewed: row.is_peer_reviewed,
            remedy_ids: parse_ids(&row.remedy_ids)?,
            created_at: row.created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub review_id: String,
    pub author_id: String,
    pub remedy_id: String,
    pub rating: u8,
    pub effectiveness: u8,
    pub side_effects: u8,
    pub ease: u8,
    pub title: String,
    pub content: String,
    pub helpful_count: u32,
    pub comment_ids: Vec<String>,
    pub status: ModerationStatus,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&ReviewRecord> for ReviewRow {
    fn from(r: &ReviewRecord) -> Self {
        ReviewRow {
            id: None,
            review_id: r.id.to_string(),
            author_id: r.author_id.to_string(),
            remedy_id: r.remedy_id.to_string(),
            rating: r.ratings.rating,
            effectiveness: r.ratings.effectiveness,
            side_effects: r.ratings.side_effects,
            ease: r.ratings.ease,
            title: r.title.clone(),
            content: r.content.clone(),
            helpful_count: r.helpful_count,
            comment_ids: id_strings(&r.comment_ids),
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl TryFrom<ReviewRow> for ReviewRecord {
    type Error = StorageError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(ReviewRecord {
            id: parse_id(&row.review_id)?,
            author_id: parse_id(&row.author_id)?,
            remedy_id: parse_id(&row.remedy_id)?,
            ratings: ReviewRatings {
                rating: row.rating,
                effectiveness: row.effectiveness,
                side_effects: row.side_effects,
                ease: row.ease,
            },
            title: row.title,
            content: row.content,
            helpful_count: row.helpful_count,
            comment_ids: parse_ids(&row.comment_ids)?,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub comment_id: String,
    pub author_id: String,
    pub review_id: String,
    pub content: String,
    pub helpful_count: u32,
    pub status: ModerationStatus,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl From<&CommentRecord> for CommentRow {
    fn from(c: &CommentRecord) -> Self {
        CommentRow {
            id: None,
            comment_id: c.id.to_string(),
            author_id: c.author_id.to_string(),
            review_id: c.review_id.to_string(),
            content: c.content.clone(),
            helpful_count: c.helpful_count,
            status: c.status,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl TryFrom<CommentRow> for CommentRecord {
    type Error = StorageError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(CommentRecord {
            id: parse_id(&row.comment_id)?,
            author_id: parse_id(&row.author_id)?,
            review_id: parse_id(&row.review_id)?,
            content: row.content,
            helpful_count: row.helpful_count,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<surrealdb::sql::Thing>,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub review_ids: Vec<String>,
    pub comment_ids: Vec<String>,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserRow {
    fn from(u: &UserRecord) -> Self {
        UserRow {
            id: None,
            user_id: u.id.to_string(),
            username: u.username.clone(),
            email: u.email.clone(),
            role: u.role,
            review_ids: id_strings(&u.review_ids),
            comment_ids: id_strings(&u.comment_ids),
            created_at: u.created_at,
        }
    }
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: parse_id(&row.user_id)?,
            username: row.username,
            email: row.email,
            role: row.role,
            review_ids: parse_ids(&row.review_ids)?,
            comment_ids: parse_ids(&row.comment_ids)?,
            created_at: row.created_at,
        })
    }
}
