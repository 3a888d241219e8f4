//! SurrealDB-backed entity store
//!
//! Uses the row layouts in `schema` for persistence, converting to/from
//! `records` types at the boundary.

use async_trait::async_trait;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::config::{CloudConfig, StoreTarget, DEFAULT_DATABASE, DEFAULT_NAMESPACE};
use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::records::*;
use crate::schema::{CommentRow, RemedyRow, ReviewRow, SourceRow, UserRow};
use crate::storage_traits::*;

fn backend(err: surrealdb::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

/// Map a failed write, recognising unique-index violations.
fn write_error(entity: &'static str, key: String, err: surrealdb::Error) -> StorageError {
    let msg = err.to_string();
    if msg.contains("already contains") {
        StorageError::duplicate(entity, key)
    } else {
        StorageError::Backend(msg)
    }
}

/// Rows projected down to their key column by `RETURN <key_column>`.
type Touched = Vec<BTreeMap<String, String>>;

fn convert_all<R, T>(rows: Vec<R>) -> StorageResult<Vec<T>>
where
    T: TryFrom<R, Error = StorageError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn status_clause(status: Option<ModerationStatus>) -> &'static str {
    match status {
        Some(_) => " AND status = $status",
        None => "",
    }
}

/// SurrealDB implementation of every entity-store trait.
#[derive(Clone)]
pub struct SurrealEntityStore {
    db: Surreal<Any>,
}

impl SurrealEntityStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `remedies/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(StoreTarget::InMemory).await
    }

    /// Connect using the environment (see [`StoreTarget::from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        let target = StoreTarget::from_env();
        if let StoreTarget::Url(url) = &target {
            if let Some(path) = url.strip_prefix("surrealkv://") {
                std::fs::create_dir_all(path).map_err(|e| {
                    StateError::Connection(format!(
                        "Failed to create database directory {}: {}",
                        path, e
                    ))
                })?;
            }
        }
        Self::connect(target).await
    }

    #[instrument(skip_all)]
    pub async fn connect(target: StoreTarget) -> crate::Result<Self> {
        let db = match target {
            StoreTarget::InMemory => Self::open("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE)
                .await
                .inspect(|_| info!("SurrealEntityStore connected (in-memory)"))?,
            StoreTarget::Url(url) => Self::open(&url, DEFAULT_NAMESPACE, DEFAULT_DATABASE)
                .await
                .inspect(|_| info!("SurrealEntityStore connected ({})", url))?,
            StoreTarget::Cloud(config) => Self::open_cloud(&config).await?,
        };

        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    async fn open(url: &str, namespace: &str, database: &str) -> crate::Result<Surreal<Any>> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        Ok(db)
    }

    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    async fn open_cloud(config: &CloudConfig) -> crate::Result<Surreal<Any>> {
        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        info!("SurrealEntityStore connected (cloud, root={})", config.is_root);
        Ok(db)
    }

    // -- private helpers -----------------------------------------------------

    async fn insert<R>(
        &self,
        table: &'static str,
        entity: &'static str,
        key: String,
        row: R,
    ) -> StorageResult<()>
    where
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let _created: Option<R> = self
            .db
            .create(table)
            .content(row)
            .await
            .map_err(|e| write_error(entity, key, e))?;
        Ok(())
    }

    /// Run a single-statement query with one binding and take its rows.
    async fn rows<R, V>(&self, sql: String, key: &'static str, value: V) -> StorageResult<Vec<R>>
    where
        R: DeserializeOwned,
        V: Serialize + 'static,
    {
        let mut res = self
            .db
            .query(sql)
            .bind((key, value))
            .await
            .map_err(backend)?;
        res.take(0).map_err(backend)
    }

    /// Update a single record addressed by `key_column = $id`, failing with
    /// `NotFound` when nothing matched.
    async fn update_one<V>(
        &self,
        table: &'static str,
        entity: &'static str,
        key_column: &'static str,
        id: String,
        set: &'static str,
        value: V,
    ) -> StorageResult<()>
    where
        V: Serialize + 'static,
    {
        let sql = format!("UPDATE {table} SET {set} WHERE {key_column} = $id RETURN {key_column}");
        let mut res = self
            .db
            .query(sql)
            .bind(("id", id.clone()))
            .bind(("value", value))
            .await
            .map_err(backend)?;
        let touched: Touched = res.take(0).map_err(backend)?;
        if touched.is_empty() {
            return Err(StorageError::not_found(entity, id));
        }
        Ok(())
    }

    /// Like [`Self::update_one`] but a missing record is not an error.
    async fn update_if_present<V>(
        &self,
        table: &'static str,
        key_column: &'static str,
        id: String,
        set: &'static str,
        value: V,
    ) -> StorageResult<()>
    where
        V: Serialize + 'static,
    {
        let sql = format!("UPDATE {table} SET {set} WHERE {key_column} = $id");
        self.db
            .query(sql)
            .bind(("id", id))
            .bind(("value", value))
            .await
            .and_then(|res| res.check())
            .map_err(backend)?;
        Ok(())
    }

    async fn replace<R>(
        &self,
        table: &'static str,
        entity: &'static str,
        key_column: &'static str,
        id: String,
        row: R,
    ) -> StorageResult<R>
    where
        R: Serialize + DeserializeOwned + 'static,
    {
        let sql = format!("UPDATE {table} CONTENT $row WHERE {key_column} = $id");
        let mut res = self
            .db
            .query(sql)
            .bind(("row", row))
            .bind(("id", id.clone()))
            .await
            .map_err(backend)?;
        let rows: Vec<R> = res.take(0).map_err(backend)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(entity, id))
    }

    async fn delete_one<R>(
        &self,
        table: &'static str,
        entity: &'static str,
        key_column: &'static str,
        id: String,
    ) -> StorageResult<()>
    where
        R: DeserializeOwned,
    {
        let sql = format!("DELETE {table} WHERE {key_column} = $id RETURN BEFORE");
        let deleted: Vec<R> = self.rows(sql, "id", id.clone()).await?;
        if deleted.is_empty() {
            return Err(StorageError::not_found(entity, id));
        }
        Ok(())
    }

    async fn increment_helpful<R>(
        &self,
        table: &'static str,
        entity: &'static str,
        key_column: &'static str,
        id: String,
    ) -> StorageResult<R>
    where
        R: DeserializeOwned,
    {
        let sql = format!("UPDATE {table} SET helpful_count += 1 WHERE {key_column} = $id");
        let rows: Vec<R> = self.rows(sql, "id", id.clone()).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(entity, id))
    }
}

#[async_trait]
impl RemedyStore for SurrealEntityStore {
    async fn create_remedy(&self, remedy: RemedyRecord) -> StorageResult<RemedyRecord> {
        debug!(remedy_id = %remedy.id, name = %remedy.name, "creating remedy");
        self.insert(
            "remedies",
            RemedyId::ENTITY,
            remedy.name.clone(),
            RemedyRow::from(&remedy),
        )
        .await?;
        Ok(remedy)
    }

    async fn get_remedy(&self, id: &RemedyId) -> StorageResult<Option<RemedyRecord>> {
        let rows: Vec<RemedyRow> = self
            .rows(
                "SELECT * FROM remedies WHERE remedy_id = $id".to_string(),
                "id",
                id.to_string(),
            )
            .await?;
        rows.into_iter().next().map(RemedyRecord::try_from).transpose()
    }

    async fn list_remedies(&self) -> StorageResult<Vec<RemedyRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM remedies ORDER BY created_at ASC")
            .await
            .map_err(backend)?;
        let rows: Vec<RemedyRow> = res.take(0).map_err(backend)?;
        convert_all(rows)
    }

    async fn find_remedies_by_symptom_names(
        &self,
        names: &[String],
    ) -> StorageResult<Vec<RemedyRecord>> {
        let rows: Vec<RemedyRow> = self
            .rows(
                "SELECT * FROM remedies WHERE symptoms[*].name CONTAINSANY $names ORDER BY created_at ASC"
                    .to_string(),
                "names",
                names.to_vec(),
            )
            .await?;
        convert_all(rows)
    }

    async fn update_remedy_stats(&self, id: &RemedyId, stats: RemedyStats) -> StorageResult<()> {
        let sql = "UPDATE remedies SET avg_rating = $avg, review_count = $count, \
                   updated_at = time::now() WHERE remedy_id = $id RETURN remedy_id";
        let mut res = self
            .db
            .query(sql)
            .bind(("id", id.to_string()))
            .bind(("avg", stats.avg_rating))
            .bind(("count", stats.review_count))
            .await
            .map_err(backend)?;
        let touched: Touched = res.take(0).map_err(backend)?;
        if touched.is_empty() {
            return Err(StorageError::not_found(RemedyId::ENTITY, id));
        }
        Ok(())
    }

    async fn add_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()> {
        self.update_one(
            "remedies",
            RemedyId::ENTITY,
            "remedy_id",
            id.to_string(),
            "review_ids = array::union(review_ids, [$value])",
            review.to_string(),
        )
        .await
    }

    async fn remove_remedy_review(&self, id: &RemedyId, review: &ReviewId) -> StorageResult<()> {
        self.update_if_present(
            "remedies",
            "remedy_id",
            id.to_string(),
            "review_ids -= $value",
            review.to_string(),
        )
        .await
    }

    async fn add_remedy_source(&self, id: &RemedyId, source: &SourceId) -> StorageResult<()> {
        self.update_one(
            "remedies",
            RemedyId::ENTITY,
            "remedy_id",
            id.to_string(),
            "source_ids = array::union(source_ids, [$value])",
            source.to_string(),
        )
        .await
    }
}

#[async_trait]
impl SourceStore for SurrealEntityStore {
    async fn create_source(&self, source: SourceRecord) -> StorageResult<SourceRecord> {
        debug!(source_id = %source.id, url = %source.url, "creating source");
        self.insert(
            "sources",
            SourceId::ENTITY,
            source.url.clone(),
            SourceRow::from(&source),
        )
        .await?;
        Ok(source)
    }

    async fn get_source(&self, id: &SourceId) -> StorageResult<Option<SourceRecord>> {
        let rows: Vec<SourceRow> = self
            .rows(
                "SELECT * FROM sources WHERE source_id = $id".to_string(),
                "id",
                id.to_string(),
            )
            .await?;
        rows.into_iter().next().map(SourceRecord::try_from).transpose()
    }

    async fn get_sources(&self, ids: &[SourceId]) -> StorageResult<Vec<SourceRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let rows: Vec<SourceRow> = self
            .rows(
                "SELECT * FROM sources WHERE source_id IN $ids".to_string(),
                "ids",
                keys,
            )
            .await?;
        let mut found: Vec<SourceRecord> = convert_all(rows)?;
        // Preserve the caller's order.
        found.sort_by_key(|s| ids.iter().position(|id| *id == s.id));
        Ok(found)
    }

    async fn add_source_remedy(&self, id: &SourceId, remedy: &RemedyId) -> StorageResult<()> {
        self.update_one(
            "sources",
            SourceId::ENTITY,
            "source_id",
            id.to_string(),
            "remedy_ids = array::union(remedy_ids, [$value])",
            remedy.to_string(),
        )
        .await
    }
}

#[async_trait]
impl ReviewStore for SurrealEntityStore {
    async fn create_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord> {
        debug!(review_id = %review.id, remedy_id = %review.remedy_id, "creating review");
        self.insert(
            "reviews",
            ReviewId::ENTITY,
            format!("{}/{}", review.author_id, review.remedy_id),
            ReviewRow::from(&review),
        )
        .await?;
        Ok(review)
    }

    async fn get_review(&self, id: &ReviewId) -> StorageResult<Option<ReviewRecord>> {
        let rows: Vec<ReviewRow> = self
            .rows(
                "SELECT * FROM reviews WHERE review_id = $id".to_string(),
                "id",
                id.to_string(),
            )
            .await?;
        rows.into_iter().next().map(ReviewRecord::try_from).transpose()
    }

    async fn update_review(&self, review: ReviewRecord) -> StorageResult<ReviewRecord> {
        let row = self
            .replace(
                "reviews",
                ReviewId::ENTITY,
                "review_id",
                review.id.to_string(),
                ReviewRow::from(&review),
            )
            .await?;
        ReviewRecord::try_from(row)
    }

    async fn delete_review(&self, id: &ReviewId) -> StorageResult<()> {
        self.delete_one::<ReviewRow>("reviews", ReviewId::ENTITY, "review_id", id.to_string())
            .await
    }

    async fn find_reviews_by_remedy(
        &self,
        remedy: &RemedyId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<ReviewRecord>> {
        let sql = format!(
            "SELECT * FROM reviews WHERE remedy_id = $remedy{} ORDER BY created_at ASC",
            status_clause(status)
        );
        let mut query = self.db.query(sql).bind(("remedy", remedy.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str()));
        }
        let mut res = query.await.map_err(backend)?;
        let rows: Vec<ReviewRow> = res.take(0).map_err(backend)?;
        convert_all(rows)
    }

    async fn find_review_by_author_and_remedy(
        &self,
        author: &UserId,
        remedy: &RemedyId,
    ) -> StorageResult<Option<ReviewRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM reviews WHERE author_id = $author AND remedy_id = $remedy")
            .bind(("author", author.to_string()))
            .bind(("remedy", remedy.to_string()))
            .await
            .map_err(backend)?;
        let rows: Vec<ReviewRow> = res.take(0).map_err(backend)?;
        rows.into_iter().next().map(ReviewRecord::try_from).transpose()
    }

    async fn increment_review_helpful(&self, id: &ReviewId) -> StorageResult<ReviewRecord> {
        let row: ReviewRow = self
            .increment_helpful("reviews", ReviewId::ENTITY, "review_id", id.to_string())
            .await?;
        ReviewRecord::try_from(row)
    }

    async fn add_review_comment(&self, id: &ReviewId, comment: &CommentId) -> StorageResult<()> {
        self.update_one(
            "reviews",
            ReviewId::ENTITY,
            "review_id",
            id.to_string(),
            "comment_ids = array::union(comment_ids, [$value])",
            comment.to_string(),
        )
        .await
    }

    async fn remove_review_comment(
        &self,
        id: &ReviewId,
        comment: &CommentId,
    ) -> StorageResult<()> {
        self.update_if_present(
            "reviews",
            "review_id",
            id.to_string(),
            "comment_ids -= $value",
            comment.to_string(),
        )
        .await
    }
}

#[async_trait]
impl CommentStore for SurrealEntityStore {
    async fn create_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord> {
        debug!(comment_id = %comment.id, review_id = %comment.review_id, "creating comment");
        self.insert(
            "comments",
            CommentId::ENTITY,
            comment.id.to_string(),
            CommentRow::from(&comment),
        )
        .await?;
        Ok(comment)
    }

    async fn get_comment(&self, id: &CommentId) -> StorageResult<Option<CommentRecord>> {
        let rows: Vec<CommentRow> = self
            .rows(
                "SELECT * FROM comments WHERE comment_id = $id".to_string(),
                "id",
                id.to_string(),
            )
            .await?;
        rows.into_iter().next().map(CommentRecord::try_from).transpose()
    }

    async fn update_comment(&self, comment: CommentRecord) -> StorageResult<CommentRecord> {
        let row = self
            .replace(
                "comments",
                CommentId::ENTITY,
                "comment_id",
                comment.id.to_string(),
                CommentRow::from(&comment),
            )
            .await?;
        CommentRecord::try_from(row)
    }

    async fn delete_comment(&self, id: &CommentId) -> StorageResult<()> {
        self.delete_one::<CommentRow>("comments", CommentId::ENTITY, "comment_id", id.to_string())
            .await
    }

    async fn find_comments_by_review(
        &self,
        review: &ReviewId,
        status: Option<ModerationStatus>,
    ) -> StorageResult<Vec<CommentRecord>> {
        let sql = format!(
            "SELECT * FROM comments WHERE review_id = $review{} ORDER BY created_at ASC",
            status_clause(status)
        );
        let mut query = self.db.query(sql).bind(("review", review.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str()));
        }
        let mut res = query.await.map_err(backend)?;
        let rows: Vec<CommentRow> = res.take(0).map_err(backend)?;
        convert_all(rows)
    }

    async fn increment_comment_helpful(&self, id: &CommentId) -> StorageResult<CommentRecord> {
        let row: CommentRow = self
            .increment_helpful("comments", CommentId::ENTITY, "comment_id", id.to_string())
            .await?;
        CommentRecord::try_from(row)
    }
}

#[async_trait]
impl UserStore for SurrealEntityStore {
    async fn create_user(&self, user: UserRecord) -> StorageResult<UserRecord> {
        debug!(user_id = %user.id, username = %user.username, "creating user");
        self.insert(
            "users",
            UserId::ENTITY,
            user.username.clone(),
            UserRow::from(&user),
        )
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<UserRecord>> {
        let rows: Vec<UserRow> = self
            .rows(
                "SELECT * FROM users WHERE user_id = $id".to_string(),
                "id",
                id.to_string(),
            )
            .await?;
        rows.into_iter().next().map(UserRecord::try_from).transpose()
    }

    async fn add_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()> {
        self.update_one(
            "users",
            UserId::ENTITY,
            "user_id",
            id.to_string(),
            "review_ids = array::union(review_ids, [$value])",
            review.to_string(),
        )
        .await
    }

    async fn remove_user_review(&self, id: &UserId, review: &ReviewId) -> StorageResult<()> {
        self.update_if_present(
            "users",
            "user_id",
            id.to_string(),
            "review_ids -= $value",
            review.to_string(),
        )
        .await
    }

    async fn add_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()> {
        self.update_one(
            "users",
            UserId::ENTITY,
            "user_id",
            id.to_string(),
            "comment_ids = array::union(comment_ids, [$value])",
            comment.to_string(),
        )
        .await
    }

    async fn remove_user_comment(&self, id: &UserId, comment: &CommentId) -> StorageResult<()> {
        self.update_if_present(
            "users",
            "user_id",
            id.to_string(),
            "comment_ids -= $value",
            comment.to_string(),
        )
        .await
    }
}
