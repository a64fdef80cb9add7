use std::{
    collections::{
        BTreeMap,
        BTreeSet,
    },
    fmt,
};

use serde::{
    Deserialize,
    Serialize,
};

macro_rules! store_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

store_id!(DeckId);
store_id!(ModelId);
store_id!(NoteId);

pub type Tags = BTreeSet<String>;

/// Sparse mapping from candidate position to the existing notes it collides with.
pub type DuplicateMatches = BTreeMap<usize, Vec<NoteId>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
}

/// Where a note should land: the store's currently selected deck, or a deck by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckTarget {
    UseDefault,
    Named(String),
}

impl DeckTarget {
    pub fn name(&self) -> Option<&str> {
        match self {
            DeckTarget::UseDefault => None,
            DeckTarget::Named(name) => Some(name.as_str()),
        }
    }
}

impl From<Option<String>> for DeckTarget {
    fn from(name: Option<String>) -> Self {
        name.map_or(DeckTarget::UseDefault, DeckTarget::Named)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub name: String,
    pub question_format: String,
    pub answer_format: String,
}

impl CardTemplate {
    pub fn new(
        name: impl Into<String>,
        question_format: impl Into<String>,
        answer_format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            question_format: question_format.into(),
            answer_format: answer_format.into(),
        }
    }
}

pub const DEFAULT_CSS: &str = ".card {
 font-family: arial;
 font-size: 20px;
 text-align: center;
 color: black;
 background-color: white;
}
";

/// Everything needed to create a custom note type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: Option<String>,
}

impl ModelSchema {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn css_or_default(&self) -> &str {
        self.css.as_deref().unwrap_or(DEFAULT_CSS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRef {
    Id(ModelId),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Audio,
}

impl MediaKind {
    /// Formats a stored media filename so it can be dropped into a note field.
    pub fn field_reference(&self, filename: &str) -> String {
        match self {
            MediaKind::Image => format!("<img src=\"{}\" />", filename),
            MediaKind::Audio => format!("[sound:{}]", filename),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}
