use std::{
    collections::HashMap,
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream,
    StreamExt,
    TryStreamExt,
};
use reqwest::Client;
use serde::{
    de::DeserializeOwned,
    Deserialize,
    Serialize,
};
use serde_json::{
    json,
    Value,
};
use tracing::{
    debug,
    warn,
};

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
    PermissionStatus,
    Tags,
};
use crate::core::{
    BridgeConfig,
    BridgeError,
    Result,
};

/// Anki gives the collection's built-in deck this id.
const DEFAULT_DECK_ID: DeckId = DeckId(1);
const DEFAULT_DECK_NAME: &str = "Default";
/// In-flight `findNotes` requests during a duplicate check.
const DUPLICATE_LOOKUPS_IN_FLIGHT: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn unwrap_result(self, action: &str) -> Option<T> {
        if let Some(error) = &self.error {
            warn!("AnkiConnect {} error: {}", action, error);
        }
        self.result
    }
}

#[derive(Debug, Deserialize)]
struct FieldRecord {
    name: String,
    #[serde(default)]
    ord: u32,
}

#[derive(Debug, Deserialize)]
struct ModelRecord {
    id: u64,
    name: String,
    #[serde(default)]
    flds: Vec<FieldRecord>,
}

impl ModelRecord {
    fn field_names(&self) -> Vec<String> {
        let mut fields: Vec<&FieldRecord> = self.flds.iter().collect();
        fields.sort_by_key(|field| field.ord);
        fields.into_iter().map(|field| field.name.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
struct CreatedModel {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct PermissionReply {
    permission: PermissionStatus,
}

/// Client for the AnkiConnect add-on's JSON-over-HTTP API.
pub struct AnkiConnect {
    client: Client,
    url: String,
    version: u8,
    key: Option<String>,
}

impl AnkiConnect {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::from_config(&BridgeConfig { anki_connect_url: url.into(), ..Default::default() })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.anki_connect_url.clone(),
            version: config.api_version,
            key: config.api_key.clone(),
        })
    }

    async fn make_request<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<ApiResponse<T>> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.insert("version".to_string(), Value::Number(self.version.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }
        if let Some(key) = &self.key {
            body.insert("key".to_string(), Value::String(key.clone()));
        }

        debug!("AnkiConnect request: {}", action);
        let response: ApiResponse<T> =
            self.client.post(&self.url).json(&body).send().await?.json().await?;

        Ok(response)
    }

    pub async fn version(&self) -> Result<u32> {
        let response: ApiResponse<u32> = self.make_request("version", None).await?;
        Ok(response.unwrap_result("version").unwrap_or_default())
    }

    async fn names_and_ids(&self, action: &str) -> Result<Vec<(String, u64)>> {
        let response: ApiResponse<serde_json::Map<String, Value>> =
            self.make_request(action, None).await?;
        named_ids(response.unwrap_result(action).unwrap_or_default())
    }

    async fn model_records(&self, ids: &[u64]) -> Result<Vec<ModelRecord>> {
        let params = json!({ "modelIds": ids });
        let response: ApiResponse<Vec<ModelRecord>> =
            self.make_request("findModelsById", Some(params)).await?;
        Ok(response.unwrap_result("findModelsById").unwrap_or_default())
    }

    async fn model_record(&self, id: ModelId) -> Result<Option<ModelRecord>> {
        Ok(self.model_records(&[id.0]).await?.into_iter().next())
    }

    async fn find_note_ids(&self, query: &str) -> Result<Vec<NoteId>> {
        let params = json!({ "query": query });
        let response: ApiResponse<Vec<u64>> = self.make_request("findNotes", Some(params)).await?;
        let notes = response.unwrap_result("findNotes").unwrap_or_default();
        Ok(notes.into_iter().map(NoteId).collect())
    }
}

#[async_trait]
impl ContentStore for AnkiConnect {
    async fn is_available(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                debug!("AnkiConnect is online. Version: {}", version);
                version > 0
            }
            Err(err) => {
                debug!("AnkiConnect is unreachable: {}", err);
                false
            }
        }
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        let response: ApiResponse<PermissionReply> =
            self.make_request("requestPermission", None).await?;
        Ok(response
            .unwrap_result("requestPermission")
            .map_or(PermissionStatus::Denied, |reply| reply.permission))
    }

    async fn list_decks(&self) -> Result<Vec<Deck>> {
        Ok(self
            .names_and_ids("deckNamesAndIds")
            .await?
            .into_iter()
            .map(|(name, id)| Deck { id: DeckId(id), name })
            .collect())
    }

    async fn list_models(&self, min_fields: usize) -> Result<Vec<Model>> {
        let listing = self.names_and_ids("modelNamesAndIds").await?;
        if listing.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = listing.iter().map(|(_, id)| *id).collect();
        let field_counts: HashMap<u64, usize> = self
            .model_records(&ids)
            .await?
            .into_iter()
            .map(|record| (record.id, record.flds.len()))
            .collect();

        Ok(listing
            .into_iter()
            .filter(|(_, id)| field_counts.get(id).is_some_and(|count| *count >= min_fields))
            .map(|(name, id)| Model { id: ModelId(id), name })
            .collect())
    }

    async fn model_name(&self, id: ModelId) -> Result<Option<String>> {
        Ok(self.model_record(id).await?.map(|record| record.name))
    }

    async fn model_field_names(&self, id: ModelId) -> Result<Option<Vec<String>>> {
        Ok(self.model_record(id).await?.map(|record| record.field_names()))
    }

    async fn model_details(&self, id: ModelId) -> Result<Option<(String, Vec<String>)>> {
        Ok(self.model_record(id).await?.map(|record| {
            let fields = record.field_names();
            (record.name, fields)
        }))
    }

    async fn create_deck(&self, name: &str) -> Result<Option<DeckId>> {
        let params = json!({ "deck": name });
        let response: ApiResponse<u64> = self.make_request("createDeck", Some(params)).await?;
        Ok(response.unwrap_result("createDeck").map(DeckId))
    }

    async fn create_model(
        &self,
        schema: &ModelSchema,
        default_deck: Option<DeckId>,
    ) -> Result<Option<ModelId>> {
        if let Some(deck) = default_deck {
            debug!("AnkiConnect cannot bind model '{}' to deck {}; ignoring", schema.name, deck);
        }

        let templates: Vec<Value> = schema
            .templates
            .iter()
            .map(|template| {
                json!({
                    "Name": template.name,
                    "Front": template.question_format,
                    "Back": template.answer_format,
                })
            })
            .collect();
        let params = json!({
            "modelName": schema.name,
            "inOrderFields": schema.fields,
            "css": schema.css_or_default(),
            "isCloze": false,
            "cardTemplates": templates,
        });

        let response: ApiResponse<CreatedModel> =
            self.make_request("createModel", Some(params)).await?;
        Ok(response.unwrap_result("createModel").map(|model| ModelId(model.id)))
    }

    async fn find_duplicate_notes(
        &self,
        model: ModelId,
        keys: &[String],
    ) -> Result<DuplicateMatches> {
        let fields = self.model_field_names(model).await?.unwrap_or_default();
        let Some(first_field) = fields.into_iter().next() else {
            warn!("Model {} has no fields to check duplicates against", model);
            return Ok(DuplicateMatches::new());
        };

        let found: Vec<(usize, Vec<NoteId>)> = stream::iter(0..keys.len())
            .map(|index| {
                let query = duplicate_query(model, &first_field, &keys[index]);
                async move { self.find_note_ids(&query).await.map(|notes| (index, notes)) }
            })
            .buffered(DUPLICATE_LOOKUPS_IN_FLIGHT)
            .try_collect()
            .await?;

        Ok(found.into_iter().filter(|(_, notes)| !notes.is_empty()).collect())
    }

    async fn insert_note(
        &self,
        model: ModelId,
        deck: Option<DeckId>,
        fields: &[String],
        tags: &Tags,
    ) -> Result<Option<NoteId>> {
        let Some(record) = self.model_record(model).await? else {
            warn!("Model {} does not exist; cannot add note", model);
            return Ok(None);
        };
        // Trailing fields a model gained since the caller's schema are left empty.
        let field_names = record.field_names();
        if fields.len() > field_names.len() {
            warn!(
                "Model {} has {} fields but the note has {} values",
                model,
                field_names.len(),
                fields.len()
            );
            return Ok(None);
        }

        let deck_name = match deck {
            None => self.selected_deck_name().await?,
            Some(id) => match self.list_decks().await?.into_iter().find(|deck| deck.id == id) {
                Some(deck) => deck.name,
                None => {
                    warn!("Deck {} does not exist; cannot add note", id);
                    return Ok(None);
                }
            },
        };

        let note_fields: serde_json::Map<String, Value> = field_names
            .into_iter()
            .zip(fields.iter())
            .map(|(name, value)| (name, Value::String(value.clone())))
            .collect();
        let params = json!({
            "note": {
                "deckName": deck_name,
                "modelName": record.name,
                "fields": note_fields,
                "tags": tags,
                "options": { "allowDuplicate": true },
            }
        });

        let response: ApiResponse<u64> = self.make_request("addNote", Some(params)).await?;
        Ok(response.unwrap_result("addNote").map(NoteId))
    }

    async fn upload_media(
        &self,
        uri: &str,
        preferred_name: &str,
        kind: MediaKind,
    ) -> Result<Option<String>> {
        let (source_key, source) = media_source(uri);
        let mut params = json!({
            "filename": preferred_name,
            "deleteExisting": false,
        });
        params[source_key] = Value::String(source);

        debug!("Uploading {:?} media from {}", kind, uri);
        let response: ApiResponse<String> =
            self.make_request("storeMediaFile", Some(params)).await?;
        Ok(response.unwrap_result("storeMediaFile"))
    }

    async fn selected_deck_name(&self) -> Result<String> {
        Ok(self
            .list_decks()
            .await?
            .into_iter()
            .find(|deck| deck.id == DEFAULT_DECK_ID)
            .map_or_else(|| DEFAULT_DECK_NAME.to_string(), |deck| deck.name))
    }
}

fn named_ids(map: serde_json::Map<String, Value>) -> Result<Vec<(String, u64)>> {
    map.into_iter()
        .map(|(name, id)| match id.as_u64() {
            Some(id) => Ok((name, id)),
            None => Err(BridgeError::Store(format!("'{}' has a non-numeric id: {}", name, id))),
        })
        .collect()
}

fn escape_search(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Anki search matching notes of `model` whose `field` equals `value` exactly.
fn duplicate_query(model: ModelId, field: &str, value: &str) -> String {
    let field = escape_search(field).replace(':', "\\:");
    format!("mid:{} \"{}:{}\"", model, field, escape_search(value))
}

fn media_source(uri: &str) -> (&'static str, String) {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        ("url", uri.to_string())
    } else if let Some(path) = uri.strip_prefix("file://") {
        ("path", path.to_string())
    } else {
        ("path", uri.to_string())
    }
}
