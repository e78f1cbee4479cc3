/// Central error types for the capture/edit engine
///
/// One enum covers the whole taxonomy: camera access, device discovery,
/// image decode/encode, the external AI collaborators and persistence.
/// Best-effort stages (enhancement, device classification, watermarking)
/// absorb these locally and log; user-intentional actions propagate them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Camera access was denied by the platform or the user
    #[error("Camera access denied: {0}")]
    Permission(String),

    /// No usable video input device exists
    #[error("No camera device available: {0}")]
    DeviceNotFound(String),

    /// Fetching or decoding an image source failed
    #[error("Image load failed: {0}")]
    ImageLoad(String),

    /// JPEG serialization of a raster failed
    #[error("Image encode failed: {0}")]
    Encode(String),

    /// The enhancement/edit collaborator failed or returned garbage
    #[error("AI service error: {0}")]
    AiService(String),

    /// The photo store rejected a save or update
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A second edit was requested while one is still in flight
    #[error("an edit is already being processed")]
    EditInProgress,

    /// An operation was invoked in a state that cannot honor it
    #[error("invalid state for {operation}: {state}")]
    InvalidState { operation: String, state: String },
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageLoad(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::ImageLoad(format!("invalid base64 payload: {}", err))
    }
}

/// Type alias for Results using the engine's Error
pub type Result<T> = std::result::Result<T, Error>;
