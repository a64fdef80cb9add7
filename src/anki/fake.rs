//! In-memory content store for tests. Records every call by name.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
};

use async_trait::async_trait;

use super::{
    ContentStore,
    Deck,
    DeckId,
    DuplicateMatches,
    MediaKind,
    Model,
    ModelId,
    ModelSchema,
    NoteId,
    Tags,
};
use crate::core::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct InsertedNote {
    pub model: ModelId,
    pub deck: Option<DeckId>,
    pub fields: Vec<String>,
    pub tags: Tags,
}

struct FakeModel {
    id: ModelId,
    name: String,
    fields: Vec<String>,
}

struct State {
    available: bool,
    next_id: u64,
    decks: Vec<Deck>,
    models: Vec<FakeModel>,
    created_models: Vec<(ModelSchema, Option<DeckId>)>,
    duplicates: DuplicateMatches,
    duplicate_keys: Vec<String>,
    notes: Vec<InsertedNote>,
    refuse_decks: bool,
    refuse_models: bool,
    refuse_notes: bool,
    calls: Vec<&'static str>,
}

/// Clones share state, so a test can keep a handle after moving one into a bridge.
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                available: true,
                next_id: 1000,
                decks: vec![Deck { id: DeckId(1), name: "Default".to_string() }],
                models: Vec::new(),
                created_models: Vec::new(),
                duplicates: DuplicateMatches::new(),
                duplicate_keys: Vec::new(),
                notes: Vec::new(),
                refuse_decks: false,
                refuse_models: false,
                refuse_notes: false,
                calls: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: &'static str) -> MutexGuard<'_, State> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    fn allocate(state: &mut State) -> u64 {
        state.next_id += 1;
        state.next_id
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    pub fn add_deck(&self, name: &str) -> DeckId {
        let mut state = self.state();
        let id = DeckId(Self::allocate(&mut state));
        state.decks.push(Deck { id, name: name.to_string() });
        id
    }

    pub fn rename_deck(&self, id: DeckId, name: &str) {
        let mut state = self.state();
        if let Some(deck) = state.decks.iter_mut().find(|deck| deck.id == id) {
            deck.name = name.to_string();
        }
    }

    pub fn delete_deck(&self, id: DeckId) {
        self.state().decks.retain(|deck| deck.id != id);
    }

    pub fn add_model(&self, name: &str, fields: &[&str]) -> ModelId {
        let mut state = self.state();
        let id = ModelId(Self::allocate(&mut state));
        state.models.push(FakeModel {
            id,
            name: name.to_string(),
            fields: fields.iter().map(|field| field.to_string()).collect(),
        });
        id
    }

    pub fn rename_model(&self, id: ModelId, name: &str) {
        let mut state = self.state();
        if let Some(model) = state.models.iter_mut().find(|model| model.id == id) {
            model.name = name.to_string();
        }
    }

    pub fn set_duplicates(&self, duplicates: DuplicateMatches) {
        self.state().duplicates = duplicates;
    }

    pub fn refuse_deck_creation(&self) {
        self.state().refuse_decks = true;
    }

    pub fn refuse_model_creation(&self) {
        self.state().refuse_models = true;
    }

    pub fn refuse_notes(&self) {
        self.state().refuse_notes = true;
    }

    pub fn calls_to(&self, call: &str) -> usize {
        self.state().calls.iter().filter(|recorded| **recorded == call).count()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn notes(&self) -> Vec<InsertedNote> {
        self.state().notes.clone()
    }

    pub fn created_models(&self) -> Vec<(ModelSchema, Option<DeckId>)> {
        self.state().created_models.clone()
    }

    pub fn duplicate_keys(&self) -> Vec<String> {
        self.state().duplicate_keys.clone()
    }
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn is_available(&self) -> bool {
        self.record("is_available").available
    }

    async fn list_decks(&self) -> Result<Vec<Deck>> {
        Ok(self.record("list_decks").decks.clone())
    }

    async fn list_models(&self, min_fields: usize) -> Result<Vec<Model>> {
        Ok(self
            .record("list_models")
            .models
            .iter()
            .filter(|model| model.fields.len() >= min_fields)
            .map(|model| Model { id: model.id, name: model.name.clone() })
            .collect())
    }

    async fn model_name(&self, id: ModelId) -> Result<Option<String>> {
        Ok(self
            .record("model_name")
            .models
            .iter()
            .find(|model| model.id == id)
            .map(|model| model.name.clone()))
    }

    async fn model_field_names(&self, id: ModelId) -> Result<Option<Vec<String>>> {
        Ok(self
            .record("model_field_names")
            .models
            .iter()
            .find(|model| model.id == id)
            .map(|model| model.fields.clone()))
    }

    async fn create_deck(&self, name: &str) -> Result<Option<DeckId>> {
        let mut state = self.record("create_deck");
        if state.refuse_decks {
            return Ok(None);
        }
        let id = DeckId(Self::allocate(&mut state));
        state.decks.push(Deck { id, name: name.to_string() });
        Ok(Some(id))
    }

    async fn create_model(
        &self,
        schema: &ModelSchema,
        default_deck: Option<DeckId>,
    ) -> Result<Option<ModelId>> {
        let mut state = self.record("create_model");
        if state.refuse_models {
            return Ok(None);
        }
        let id = ModelId(Self::allocate(&mut state));
        state.models.push(FakeModel {
            id,
            name: schema.name.clone(),
            fields: schema.fields.clone(),
        });
        state.created_models.push((schema.clone(), default_deck));
        Ok(Some(id))
    }

    async fn find_duplicate_notes(
        &self,
        _model: ModelId,
        keys: &[String],
    ) -> Result<DuplicateMatches> {
        let mut state = self.record("find_duplicate_notes");
        state.duplicate_keys = keys.to_vec();
        Ok(state.duplicates.clone())
    }

    async fn insert_note(
        &self,
        model: ModelId,
        deck: Option<DeckId>,
        fields: &[String],
        tags: &Tags,
    ) -> Result<Option<NoteId>> {
        let mut state = self.record("insert_note");
        if state.refuse_notes {
            return Ok(None);
        }
        let id = NoteId(Self::allocate(&mut state));
        state.notes.push(InsertedNote {
            model,
            deck,
            fields: fields.to_vec(),
            tags: tags.clone(),
        });
        Ok(Some(id))
    }

    async fn upload_media(
        &self,
        _uri: &str,
        preferred_name: &str,
        _kind: MediaKind,
    ) -> Result<Option<String>> {
        drop(self.record("upload_media"));
        Ok(Some(format!("{}_1", preferred_name)))
    }

    async fn selected_deck_name(&self) -> Result<String> {
        drop(self.record("selected_deck_name"));
        Ok("Default".to_string())
    }
}
