use tracing::{
    debug,
    info,
    warn,
};

use super::cache::{
    Namespace,
    ReferenceCache,
};
use crate::{
    anki::{
        ContentStore,
        DeckId,
        ModelId,
        ModelSchema,
    },
    core::Result,
};

/// Resolves note-type names to ids. Unlike decks the cache goes first: a cached id
/// is only trusted while the model still exists and has enough fields, otherwise the
/// live listing is searched.
pub struct ModelResolver<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    cache: &'a mut ReferenceCache,
}

impl<'a, S: ContentStore + ?Sized> ModelResolver<'a, S> {
    pub fn new(store: &'a S, cache: &'a mut ReferenceCache) -> Self {
        Self { store, cache }
    }

    pub async fn resolve(&self, name: &str, min_fields: usize) -> Result<Option<ModelId>> {
        if let Some(cached) = self.cache.get(Namespace::Model, name).map(ModelId) {
            if self.still_usable(cached, min_fields).await? {
                debug!("Model '{}' resolved from cache as {}", name, cached);
                return Ok(Some(cached));
            }
            debug!("Cached model {} for '{}' is gone or too small", cached, name);
        }

        let found = self
            .store
            .list_models(min_fields)
            .await?
            .into_iter()
            .find(|model| model.name == name)
            .map(|model| model.id);
        if let Some(id) = found {
            debug!("Model '{}' found in listing as {}", name, id);
        }
        Ok(found)
    }

    async fn still_usable(&self, id: ModelId, min_fields: usize) -> Result<bool> {
        Ok(self
            .store
            .model_details(id)
            .await?
            .is_some_and(|(_, fields)| fields.len() >= min_fields))
    }

    /// Finds a model named `schema.name` with at least as many fields as the schema,
    /// creating it when none exists. `None` means the store declined to create it.
    pub async fn resolve_or_create(
        &mut self,
        schema: &ModelSchema,
        default_deck: Option<DeckId>,
    ) -> Result<Option<ModelId>> {
        if let Some(id) = self.resolve(&schema.name, schema.field_count()).await? {
            return Ok(Some(id));
        }

        let schema =
            ModelSchema { css: Some(schema.css_or_default().to_string()), ..schema.clone() };
        match self.store.create_model(&schema, default_deck).await? {
            Some(id) => {
                self.cache.put(Namespace::Model, &schema.name, id.0)?;
                info!(
                    "Created model '{}' with {} fields as {}",
                    schema.name,
                    schema.field_count(),
                    id
                );
                Ok(Some(id))
            }
            None => {
                warn!("Content store declined to create model '{}'", schema.name);
                Ok(None)
            }
        }
    }
}
