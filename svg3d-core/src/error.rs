//! Error types for scene rendering and mesh loading

use thiserror::Error;

/// Result type for scene-level operations
pub type Result<T> = std::result::Result<T, RenderError>;

/// Scene-level failures that abort a render
#[derive(Error, Debug)]
pub enum RenderError {
    /// Camera position equals its look-at target, so there is no view direction.
    #[error("degenerate camera: position and lookAt coincide")]
    DegenerateCamera,

    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    #[error("invalid box #{index}: {reason}")]
    InvalidBox { index: usize, reason: String },

    #[error("invalid render options: {0}")]
    InvalidOptions(String),

    #[error("malformed scene document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures while fetching or decoding an external mesh
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch {source_id}: {reason}")]
    Fetch { source_id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("STL error: {0}")]
    Stl(String),

    #[error("OBJ error: {0}")]
    Obj(String),

    #[error("3MF error: {0}")]
    ThreeMf(String),

    #[error("unsupported mesh source: {0}")]
    Unsupported(String),
}
