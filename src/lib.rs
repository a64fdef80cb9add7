pub mod anki;
pub mod bridge;
pub mod core;
pub mod persistence;
pub mod reconcile;

pub use bridge::AnkiBridge;
pub use crate::core::{
    BridgeConfig,
    BridgeError,
    Result,
};
