//! remedy-state: persistence layer for the remedy review platform
//!
//! Holds the entity records (remedies, sources, reviews, comments, users),
//! the async storage traits the engine is written against, and two
//! implementations of them.
//!
//! ## Key Components
//!
//! - `storage_traits`: one trait per entity plus the `EntityStore` bundle
//! - `MemoryEntityStore`: in-memory fake for tests and embedding
//! - `SurrealEntityStore`: SurrealDB backend (`mem://`, `surrealkv://`, `ws://`)

pub mod config;
mod error;
pub mod fakes;
pub mod migrations;
pub mod records;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use config::{CloudConfig, StoreTarget};
pub use error::{InvalidId, StateError, StorageError, UnknownVariant};
pub use fakes::MemoryEntityStore;
pub use records::{
    CommentId, CommentRecord, ModerationStatus, RemedyId, RemedyRecord, RemedyStats, ReviewId,
    ReviewRatings, ReviewRecord, Role, SourceId, SourceRecord, Symptom, UserId, UserRecord,
};
pub use storage_traits::{
    CommentStore, EntityStore, RemedyStore, ReviewStore, SourceStore, StorageResult, UserStore,
};
pub use surreal_store::SurrealEntityStore;

/// Result type for remedy-state setup operations
pub type Result<T> = std::result::Result<T, StateError>;
