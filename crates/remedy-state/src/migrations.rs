//! SurrealDB schema migrations and initialization
//!
//! Sets up every table with its uniqueness constraints and lookup indexes.
//! All statements use `IF NOT EXISTS`, so `init_schema` is idempotent.

use crate::error::StateError;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all tables in SurrealDB
///
/// Call once per connection before using the store.
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing remedy SurrealDB schema");

    init_remedies_table(db).await?;
    init_sources_table(db).await?;
    init_reviews_table(db).await?;
    init_comments_table(db).await?;
    init_users_table(db).await?;

    info!("Remedy schema initialization complete");
    Ok(())
}

async fn run(db: &Surreal<Any>, table: &str, sql: &str) -> Result<()> {
    db.query(sql)
        .await
        .and_then(|response| response.check())
        .map_err(|e| StateError::SchemaSetup(format!("{table}: {e}")))?;
    info!("✓ {} table initialized", table);
    Ok(())
}

/// Initialize `remedies` table
///
/// Constraints:
/// - `remedy_id` and `name` are unique
/// - `avg_rating` / `review_count` are derived, written only by stats
///   recomputation (enforced via app logic)
async fn init_remedies_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing remedies table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS remedies SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_remedy_id ON TABLE remedies COLUMNS remedy_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_remedy_name ON TABLE remedies COLUMNS name UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_remedy_created_at ON TABLE remedies COLUMNS created_at;
    "#;

    run(db, "remedies", sql).await
}

/// Initialize `sources` table
///
/// Constraints:
/// - `source_id` and `url` are unique
async fn init_sources_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing sources table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS sources SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_source_id ON TABLE sources COLUMNS source_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_source_url ON TABLE sources COLUMNS url UNIQUE;
    "#;

    run(db, "sources", sql).await
}

/// Initialize `reviews` table
///
/// Constraints:
/// - `review_id` is unique
/// - `(author_id, remedy_id)` is unique: one review per author and remedy
async fn init_reviews_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing reviews table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS reviews SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_review_id ON TABLE reviews COLUMNS review_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_review_author_remedy ON TABLE reviews COLUMNS author_id, remedy_id UNIQUE;

        -- Stats recomputation reads approved reviews per remedy
        DEFINE INDEX IF NOT EXISTS idx_review_remedy_status ON TABLE reviews COLUMNS remedy_id, status;
    "#;

    run(db, "reviews", sql).await
}

/// Initialize `comments` table
async fn init_comments_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing comments table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS comments SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;

        DEFINE INDEX IF NOT EXISTS idx_comment_id ON TABLE comments COLUMNS comment_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_comment_review_status ON TABLE comments COLUMNS review_id, status;
    "#;

    run(db, "comments", sql).await
}

/// Initialize `users` table
async fn init_users_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing users table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS users SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_user_id ON TABLE users COLUMNS user_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_username ON TABLE users COLUMNS username UNIQUE;
    "#;

    run(db, "users", sql).await
}
