use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{
    info,
    warn,
};

use crate::core::Result;

pub mod api;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use api::AnkiConnect;
pub use types::{
    CardTemplate,
    Deck,
    DeckId,
    DeckTarget,
    DuplicateMatches,
    MediaKind,
    Model,
    ModelId,
    ModelRef,
    ModelSchema,
    NoteId,
    PermissionStatus,
    Tags,
    DEFAULT_CSS,
};

/// Capability string a host must grant before the store accepts writes.
pub const READ_WRITE_PERMISSION: &str = "com.ichi2.anki.permission.READ_WRITE_DATABASE";

/// The external content store. Everything is keyed by store-assigned ids; names are
/// only hints and may change underneath us.
///
/// `Ok(None)` means the store answered but declined or had nothing to report.
/// `Err` is reserved for transport failures and unreadable replies.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn is_available(&self) -> bool;

    fn permission_name(&self) -> &str {
        READ_WRITE_PERMISSION
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn list_decks(&self) -> Result<Vec<Deck>>;

    /// Models with at least `min_fields` fields, in store order.
    async fn list_models(&self, min_fields: usize) -> Result<Vec<Model>>;

    async fn model_name(&self, id: ModelId) -> Result<Option<String>>;

    async fn model_field_names(&self, id: ModelId) -> Result<Option<Vec<String>>>;

    /// Name and field names in one lookup. Absent when either is.
    async fn model_details(&self, id: ModelId) -> Result<Option<(String, Vec<String>)>> {
        let Some(name) = self.model_name(id).await? else {
            return Ok(None);
        };
        Ok(self.model_field_names(id).await?.map(|fields| (name, fields)))
    }

    async fn create_deck(&self, name: &str) -> Result<Option<DeckId>>;

    async fn create_model(
        &self,
        schema: &ModelSchema,
        default_deck: Option<DeckId>,
    ) -> Result<Option<ModelId>>;

    /// Keys are the first-field values of a candidate batch, by position.
    async fn find_duplicate_notes(&self, model: ModelId, keys: &[String])
        -> Result<DuplicateMatches>;

    /// `deck: None` places the note in the currently selected deck.
    async fn insert_note(
        &self,
        model: ModelId,
        deck: Option<DeckId>,
        fields: &[String],
        tags: &Tags,
    ) -> Result<Option<NoteId>>;

    /// Returns the filename the store saved the media under.
    async fn upload_media(
        &self,
        uri: &str,
        preferred_name: &str,
        kind: MediaKind,
    ) -> Result<Option<String>>;

    async fn selected_deck_name(&self) -> Result<String>;
}

/// Polls the store until it answers. Only for hosts that just launched the store;
/// nothing else in the crate retries.
pub async fn wait_available<S: ContentStore + ?Sized>(
    store: &S,
    wait_time: u64,
    max_attempts: u32,
) -> bool {
    for attempt in 1..=max_attempts {
        if store.is_available().await {
            info!("Content store is online");
            return true;
        }
        warn!(
            "Content store attempt {} of {} failed. Retrying in {} seconds...",
            attempt, max_attempts, wait_time
        );
        if attempt < max_attempts {
            sleep(Duration::from_secs(wait_time)).await;
        }
    }
    false
}
