use tracing::debug;

use crate::{
    anki::{
        ContentStore,
        DuplicateMatches,
        ModelId,
        Tags,
    },
    core::Result,
};

/// The value duplicates are keyed on: the first field of a record, or empty when it has none.
fn duplicate_key(fields: &[String]) -> String {
    fields.first().cloned().unwrap_or_default()
}

/// Drops every candidate the store already holds a note for, keeping `fields` and
/// `tags` aligned and in their original relative order.
///
/// # Panics
///
/// When `fields` and `tags` differ in length, or when the store reports a duplicate
/// at a position outside the batch.
pub async fn remove_duplicates<S: ContentStore + ?Sized>(
    store: &S,
    fields: &mut Vec<Vec<String>>,
    tags: &mut Vec<Tags>,
    model: ModelId,
) -> Result<()> {
    assert_eq!(
        fields.len(),
        tags.len(),
        "field and tag batches must be aligned ({} fields, {} tag sets)",
        fields.len(),
        tags.len()
    );
    if fields.is_empty() {
        return Ok(());
    }

    let keys: Vec<String> = fields.iter().map(|record| duplicate_key(record)).collect();
    let matches = store.find_duplicate_notes(model, &keys).await?;
    let before = fields.len();
    strip_duplicates(fields, tags, &matches);
    debug!("Removed {} of {} candidates as duplicates", before - fields.len(), before);
    Ok(())
}

/// Removes the positions flagged in `matches` from both batches in one forward pass.
pub fn strip_duplicates<F, T>(fields: &mut Vec<F>, tags: &mut Vec<T>, matches: &DuplicateMatches) {
    assert_eq!(fields.len(), tags.len(), "field and tag batches must be aligned");

    if let Some((last, _)) = matches.last_key_value() {
        assert!(
            *last < fields.len(),
            "duplicate index {} outside batch of {}",
            last,
            fields.len()
        );
    }

    let flagged: Vec<usize> = matches
        .iter()
        .filter(|(_, notes)| !notes.is_empty())
        .map(|(index, _)| *index)
        .collect();
    if flagged.is_empty() {
        return;
    }

    retain_unflagged(fields, &flagged);
    retain_unflagged(tags, &flagged);
}

/// `flagged` must be ascending. `Vec::retain` visits every element once, in order.
fn retain_unflagged<T>(items: &mut Vec<T>, flagged: &[usize]) {
    let mut index = 0;
    let mut next_flag = 0;
    items.retain(|_| {
        let drop = flagged.get(next_flag) == Some(&index);
        if drop {
            next_flag += 1;
        }
        index += 1;
        !drop
    });
}
