pub mod config;
pub mod errors;

pub use config::BridgeConfig;
pub use errors::{
    BridgeError,
    Result,
};
