use tracing::warn;

use crate::{
    anki::{
        AnkiConnect,
        ContentStore,
        Deck,
        DeckId,
        DeckTarget,
        MediaKind,
        Model,
        ModelId,
        ModelRef,
        ModelSchema,
        PermissionStatus,
        Tags,
    },
    core::{
        BridgeConfig,
        Result,
    },
    reconcile::{
        remove_duplicates,
        submit_note,
        DeckResolver,
        ModelResolver,
        NoteRequest,
        ReferenceCache,
        SubmitOutcome,
    },
};

/// Entry point for hosts: one content store plus the reference cache for one region.
///
/// Check [`AnkiBridge::is_available`] before anything else in a fresh session.
pub struct AnkiBridge<S: ContentStore> {
    store: S,
    cache: ReferenceCache,
}

impl AnkiBridge<AnkiConnect> {
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let store = AnkiConnect::from_config(config)?;
        let cache = ReferenceCache::open(&config.cache_dir(), &config.cache_region)?;
        Ok(Self::new(store, cache))
    }
}

impl<S: ContentStore> AnkiBridge<S> {
    pub fn new(store: S, cache: ReferenceCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn is_available(&self) -> bool {
        self.store.is_available().await
    }

    pub fn permission_name(&self) -> &str {
        self.store.permission_name()
    }

    pub async fn request_permission(&self) -> Result<PermissionStatus> {
        self.store.request_permission().await
    }

    pub async fn deck_list(&self) -> Result<Vec<Deck>> {
        self.store.list_decks().await
    }

    pub async fn model_list(&self, min_fields: usize) -> Result<Vec<Model>> {
        self.store.list_models(min_fields).await
    }

    pub async fn field_list(&mut self, model: &ModelRef) -> Result<Option<Vec<String>>> {
        let id = match model {
            ModelRef::Id(id) => *id,
            ModelRef::Name(name) => match self.resolve_model(name, 0).await? {
                Some(id) => id,
                None => return Ok(None),
            },
        };
        self.store.model_field_names(id).await
    }

    pub async fn selected_deck_name(&self) -> Result<String> {
        self.store.selected_deck_name().await
    }

    pub async fn resolve_deck(&mut self, name: &str) -> Result<Option<DeckId>> {
        DeckResolver::new(&self.store, &mut self.cache).resolve(name).await
    }

    /// `None` only when the store declined to create the deck.
    pub async fn resolve_or_create_deck(&mut self, name: &str) -> Result<Option<DeckId>> {
        let target = DeckTarget::Named(name.to_string());
        DeckResolver::new(&self.store, &mut self.cache).resolve_or_create(&target).await
    }

    pub async fn resolve_model(
        &mut self,
        name: &str,
        min_fields: usize,
    ) -> Result<Option<ModelId>> {
        ModelResolver::new(&self.store, &mut self.cache).resolve(name, min_fields).await
    }

    pub async fn resolve_or_create_model(
        &mut self,
        schema: &ModelSchema,
        default_deck: Option<DeckId>,
    ) -> Result<Option<ModelId>> {
        ModelResolver::new(&self.store, &mut self.cache)
            .resolve_or_create(schema, default_deck)
            .await
    }

    pub async fn remove_duplicates(
        &self,
        fields: &mut Vec<Vec<String>>,
        tags: &mut Vec<Tags>,
        model: ModelId,
    ) -> Result<()> {
        remove_duplicates(&self.store, fields, tags, model).await
    }

    pub async fn submit_note(&mut self, request: &NoteRequest) -> Result<SubmitOutcome> {
        submit_note(&self.store, &mut self.cache, request).await
    }

    /// Uploads media and returns the reference to paste into a note field.
    pub async fn upload_media(
        &self,
        uri: &str,
        preferred_name: &str,
        kind: MediaKind,
    ) -> Result<Option<String>> {
        let stored = self.store.upload_media(uri, preferred_name, kind).await?;
        if stored.is_none() {
            warn!("Content store declined media upload from {}", uri);
        }
        Ok(stored.map(|filename| kind.field_reference(&filename)))
    }
}
