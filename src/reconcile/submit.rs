use std::{
    collections::HashSet,
    fmt,
};

use tracing::{
    info,
    warn,
};

use super::{
    cache::ReferenceCache,
    deck::DeckResolver,
    model::ModelResolver,
};
use crate::{
    anki::{
        ContentStore,
        DeckId,
        DeckTarget,
        ModelId,
        ModelSchema,
        NoteId,
        Tags,
    },
    core::{
        BridgeError,
        Result,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    NoteCreated(NoteId),
    DeckCreationFailed,
    ModelCreationFailed,
    NoteInsertFailed,
}

impl SubmitOutcome {
    /// Wire form understood by existing callers: the note id, or a failure code.
    pub fn code(&self) -> String {
        match self {
            SubmitOutcome::NoteCreated(id) => id.to_string(),
            SubmitOutcome::DeckCreationFailed => "FAILED_TO_CREATE_DECK".to_string(),
            SubmitOutcome::ModelCreationFailed => "FAILED_TO_CREATE_MODEL".to_string(),
            SubmitOutcome::NoteInsertFailed => "FAILED_TO_ADD_NOTE".to_string(),
        }
    }
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitOutcome::NoteCreated(id) => write!(f, "created note {}", id),
            SubmitOutcome::DeckCreationFailed => write!(f, "failed to create deck"),
            SubmitOutcome::ModelCreationFailed => write!(f, "failed to create model"),
            SubmitOutcome::NoteInsertFailed => write!(f, "failed to add note"),
        }
    }
}

/// A note plus everything needed to place it. Explicit ids bypass resolution and
/// are passed to the store untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRequest {
    pub deck: DeckTarget,
    pub deck_id: Option<DeckId>,
    pub model: ModelSchema,
    pub model_id: Option<ModelId>,
    pub values: Vec<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteRequest {
    pub fn new(model: ModelSchema, values: Vec<String>) -> Self {
        Self {
            deck: DeckTarget::UseDefault,
            deck_id: None,
            model,
            model_id: None,
            values,
            tags: None,
        }
    }

    pub fn in_deck(mut self, name: impl Into<String>) -> Self {
        self.deck = DeckTarget::Named(name.into());
        self
    }

    pub fn with_deck_id(mut self, id: DeckId) -> Self {
        self.deck_id = Some(id);
        self
    }

    pub fn with_model_id(mut self, id: ModelId) -> Self {
        self.model_id = Some(id);
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(invalid("a note needs at least one field value"));
        }
        // The store owns the schema of an explicit model id.
        if self.model_id.is_some() {
            return Ok(());
        }

        let fields = &self.model.fields;
        if fields.len() != self.values.len() {
            return Err(invalid(format!(
                "model and value fields must be the same length ({} fields, {} values)",
                fields.len(),
                self.values.len()
            )));
        }
        if fields.iter().any(|field| field.trim().is_empty()) {
            return Err(invalid("model field names must not be empty"));
        }
        let unique: HashSet<&String> = fields.iter().collect();
        if unique.len() != fields.len() {
            return Err(invalid("model field names must be unique"));
        }
        if self.model.templates.is_empty() {
            return Err(invalid("a model needs at least one card template"));
        }
        if self.model.templates.iter().any(|template| template.name.trim().is_empty()) {
            return Err(invalid("card template names must not be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> BridgeError {
    BridgeError::InvalidNote(reason.into())
}

/// Resolves (or creates) the deck and model for `request`, then inserts the note.
pub async fn submit_note<S: ContentStore + ?Sized>(
    store: &S,
    cache: &mut ReferenceCache,
    request: &NoteRequest,
) -> Result<SubmitOutcome> {
    request.validate()?;

    let deck = match request.deck_id {
        Some(id) => Some(id),
        None => {
            let resolved = DeckResolver::new(store, cache).resolve_or_create(&request.deck).await?;
            if resolved.is_none() && request.deck.name().is_some() {
                return Ok(SubmitOutcome::DeckCreationFailed);
            }
            resolved
        }
    };

    let model = match request.model_id {
        Some(id) => id,
        None => {
            let mut resolver = ModelResolver::new(store, cache);
            match resolver.resolve_or_create(&request.model, deck).await? {
                Some(id) => id,
                None => return Ok(SubmitOutcome::ModelCreationFailed),
            }
        }
    };

    let tags: Tags = request.tags.iter().flatten().cloned().collect();
    match store.insert_note(model, deck, &request.values, &tags).await? {
        Some(id) => {
            info!("Added note {} (model {}, deck {:?})", id, model, deck);
            Ok(SubmitOutcome::NoteCreated(id))
        }
        None => {
            warn!("Content store declined the note for model {}", model);
            Ok(SubmitOutcome::NoteInsertFailed)
        }
    }
}
