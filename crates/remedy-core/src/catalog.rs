//! Catalog authoring: users, remedies, sources and the links between
//! remedies and sources.

use std::sync::Arc;

use remedy_state::{
    EntityStore, RemedyId, RemedyRecord, SourceId, SourceRecord, UserRecord,
};
use tracing::{info, instrument};

use crate::domain::{Actor, NewRemedy, NewSource, NewUser, RemedyError, Result};
use crate::moderation::authorize_privileged;

pub struct Catalog<S> {
    store: Arc<S>,
}

impl<S> Catalog<S>
where
    S: EntityStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an account. Usernames are unique.
    #[instrument(skip_all, fields(username = %input.username))]
    pub async fn register_user(&self, input: NewUser) -> Result<UserRecord> {
        input.validate()?;
        let user = self
            .store
            .create_user(UserRecord::new(input.username, input.email, input.role))
            .await?;
        info!(event = "user.registered", user_id = %user.id, role = %user.role);
        Ok(user)
    }

    /// Create a remedy, linking it to existing sources. Moderators only.
    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create_remedy(&self, actor: &Actor, input: NewRemedy) -> Result<RemedyRecord> {
        input.validate()?;
        for source_id in &input.source_ids {
            if self.store.get_source(source_id).await?.is_none() {
                return Err(RemedyError::not_found(SourceId::ENTITY, source_id));
            }
        }
        authorize_privileged(actor, "create remedies")?;

        let mut remedy = RemedyRecord::new(input.name, input.description);
        remedy.categories = input.categories;
        remedy.symptoms = input.symptoms;
        remedy.warnings = input.warnings;
        remedy.verified = input.verified;
        for source_id in input.source_ids {
            if !remedy.source_ids.contains(&source_id) {
                remedy.source_ids.push(source_id);
            }
        }

        let remedy = self.store.create_remedy(remedy).await?;
        for source_id in &remedy.source_ids {
            self.store.add_source_remedy(source_id, &remedy.id).await?;
        }
        info!(event = "remedy.created", remedy_id = %remedy.id, sources = remedy.source_ids.len());
        Ok(remedy)
    }

    /// Register a citation source. Moderators only; URLs are unique.
    #[instrument(skip_all, fields(url = %input.url))]
    pub async fn create_source(&self, actor: &Actor, input: NewSource) -> Result<SourceRecord> {
        input.validate()?;
        authorize_privileged(actor, "create sources")?;

        let mut source = SourceRecord::new(input.title, input.url, input.credibility_score);
        source.publication_date = input.publication_date;
        source.authors = input.authors;
        source.publisher = input.publisher;
        source.is_peer_reviewed = input.is_peer_reviewed;

        let source = self.store.create_source(source).await?;
        info!(event = "source.created", source_id = %source.id);
        Ok(source)
    }

    /// Link an existing source to an existing remedy, on both sides.
    pub async fn link_source(
        &self,
        actor: &Actor,
        remedy_id: &RemedyId,
        source_id: &SourceId,
    ) -> Result<RemedyRecord> {
        self.get_remedy(remedy_id).await?;
        if self.store.get_source(source_id).await?.is_none() {
            return Err(RemedyError::not_found(SourceId::ENTITY, source_id));
        }
        authorize_privileged(actor, "link sources")?;

        self.store.add_remedy_source(remedy_id, source_id).await?;
        self.store.add_source_remedy(source_id, remedy_id).await?;
        self.get_remedy(remedy_id).await
    }

    pub async fn get_remedy(&self, id: &RemedyId) -> Result<RemedyRecord> {
        self.store
            .get_remedy(id)
            .await?
            .ok_or_else(|| RemedyError::not_found(RemedyId::ENTITY, id))
    }

    pub async fn list_remedies(&self) -> Result<Vec<RemedyRecord>> {
        Ok(self.store.list_remedies().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_state::{MemoryEntityStore, Role, SourceStore, UserId};

    fn catalog() -> (Catalog<MemoryEntityStore>, Arc<MemoryEntityStore>) {
        let store = Arc::new(MemoryEntityStore::new());
        (Catalog::new(store.clone()), store)
    }

    #[tokio::test]
    async fn plain_users_cannot_author_catalog_entries() {
        let (catalog, _) = catalog();
        let user = Actor::user(UserId::new());
        let err = catalog
            .create_remedy(&user, NewRemedy::new("Ginger", "Tea"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Authorization(_)));
    }

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let (catalog, _) = catalog();
        let admin = Actor::admin(UserId::new());
        catalog
            .create_remedy(&admin, NewRemedy::new("Ginger", "Tea"))
            .await
            .unwrap();
        let err = catalog
            .create_remedy(&admin, NewRemedy::new("Ginger", "Capsules"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Conflict(_)));

        catalog
            .register_user(NewUser::new("ana", "ana@example.com", Role::User))
            .await
            .unwrap();
        let err = catalog
            .register_user(NewUser::new("ana", "other@example.com", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Conflict(_)));
    }

    #[tokio::test]
    async fn linking_maintains_both_sides() {
        let (catalog, store) = catalog();
        let moderator = Actor::moderator(UserId::new());
        let source = catalog
            .create_source(&moderator, NewSource::new("Trial", "https://t.example", 7))
            .await
            .unwrap();
        let remedy = catalog
            .create_remedy(&moderator, NewRemedy::new("Ginger", "Tea"))
            .await
            .unwrap();

        let linked = catalog
            .link_source(&moderator, &remedy.id, &source.id)
            .await
            .unwrap();
        assert_eq!(linked.source_ids, vec![source.id]);

        let source = store.get_source(&source.id).await.unwrap().unwrap();
        assert_eq!(source.remedy_ids, vec![remedy.id]);
    }

    #[tokio::test]
    async fn unknown_source_reference_is_not_found() {
        let (catalog, _) = catalog();
        let admin = Actor::admin(UserId::new());
        let err = catalog
            .create_remedy(
                &admin,
                NewRemedy::new("Ginger", "Tea").with_source(SourceId::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::NotFound { entity: "source", .. }));
    }
}
