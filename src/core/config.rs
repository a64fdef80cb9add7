use std::path::PathBuf;

use serde::{
    Deserialize,
    Serialize,
};

use crate::persistence::{
    get_app_data_dir,
    load_json_or_default,
};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub anki_connect_url: String,
    pub api_version: u8,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Region the reference cache lives under, so several profiles can share a data dir.
    pub cache_region: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            anki_connect_url: "http://localhost:8765/".to_string(),
            api_version: 6,
            api_key: None,
            request_timeout_secs: 30,
            cache_region: "references".to_string(),
            data_dir: None,
        }
    }
}

impl BridgeConfig {
    pub fn load() -> Self {
        load_json_or_default(CONFIG_FILE)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(get_app_data_dir)
    }
}
