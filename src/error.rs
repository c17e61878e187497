/// Error types for the chat client core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message too long: {len} chars (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("Message content is empty")]
    EmptyContent,

    #[error("No conversation selected")]
    MissingTarget,

    #[error("File too large: {len} bytes (max {max})")]
    UploadTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ChatError>;
