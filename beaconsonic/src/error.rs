//! Error types for BeaconSonic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Catalog parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Invalid beacon state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, BeaconError>;
