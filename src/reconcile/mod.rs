//! Maps caller-chosen deck and model names onto content store ids, and keeps
//! already-known notes out of new batches.

pub mod cache;
pub mod deck;
pub mod duplicates;
pub mod model;
pub mod submit;

pub use cache::{
    Namespace,
    ReferenceCache,
};
pub use deck::DeckResolver;
pub use duplicates::{
    remove_duplicates,
    strip_duplicates,
};
pub use model::ModelResolver;
pub use submit::{
    submit_note,
    NoteRequest,
    SubmitOutcome,
};
