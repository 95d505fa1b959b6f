use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollageError {
    #[error("Invalid collage input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode image {index}: {reason}")]
    DecodeError { index: usize, reason: String },

    #[error("Failed to encode collage: {0}")]
    EncodeError(String),
}
