use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Reference cache I/O error: {0}")]
    CacheIo(Box<std::io::Error>),

    #[error("Reference cache format error: {0}")]
    CacheFormat(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(Box<reqwest::Error>),

    #[error("Content store returned an unexpected reply: {0}")]
    Store(String),

    #[error("Invalid cache region '{0}'")]
    InvalidRegion(String),

    #[error("Invalid note: {0}")]
    InvalidNote(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(error: std::io::Error) -> Self {
        BridgeError::CacheIo(Box::new(error))
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(error: reqwest::Error) -> Self {
        BridgeError::Transport(Box::new(error))
    }
}

impl BridgeError {
    /// Whether the failure came from the local reference cache rather than the content store.
    pub fn is_local_storage(&self) -> bool {
        matches!(self, BridgeError::CacheIo(_) | BridgeError::CacheFormat(_))
    }
}
