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
        DeckTarget,
    },
    core::Result,
};

/// Resolves deck names to ids. The live listing is authoritative; the cache only
/// rescues decks we created that have since been renamed.
pub struct DeckResolver<'a, S: ContentStore + ?Sized> {
    store: &'a S,
    cache: &'a mut ReferenceCache,
}

impl<'a, S: ContentStore + ?Sized> DeckResolver<'a, S> {
    pub fn new(store: &'a S, cache: &'a mut ReferenceCache) -> Self {
        Self { store, cache }
    }

    pub async fn resolve(&self, name: &str) -> Result<Option<DeckId>> {
        let decks = self.store.list_decks().await?;

        let wanted = name.to_lowercase();
        if let Some(deck) = decks.iter().find(|deck| deck.name.to_lowercase() == wanted) {
            debug!("Deck '{}' found in listing as {}", name, deck.id);
            return Ok(Some(deck.id));
        }

        if let Some(cached) = self.cache.get(Namespace::Deck, name).map(DeckId) {
            match decks.iter().find(|deck| deck.id == cached) {
                Some(deck) => {
                    debug!(
                        "Deck '{}' resolved from cache as {} (now '{}')",
                        name, cached, deck.name
                    );
                    return Ok(Some(cached));
                }
                None => debug!("Cached deck {} for '{}' no longer exists", cached, name),
            }
        }

        Ok(None)
    }

    /// `UseDefault` short-circuits to `None` without touching the store. A named
    /// target yields `None` only when the store declined to create the deck.
    pub async fn resolve_or_create(&mut self, target: &DeckTarget) -> Result<Option<DeckId>> {
        let name = match target {
            DeckTarget::UseDefault => return Ok(None),
            DeckTarget::Named(name) => name,
        };

        if let Some(id) = self.resolve(name).await? {
            return Ok(Some(id));
        }

        match self.store.create_deck(name).await? {
            Some(id) => {
                self.cache.put(Namespace::Deck, name, id.0)?;
                info!("Created deck '{}' as {}", name, id);
                Ok(Some(id))
            }
            None => {
                warn!("Content store declined to create deck '{}'", name);
                Ok(None)
            }
        }
    }
}
