//! Error types for nudge

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A required field is missing or malformed; no external call was made
    #[error("{0}")]
    Validation(String),

    /// The text-generation service failed or returned nothing usable
    #[error("AI error: {0}")]
    Ai(String),

    /// The AI response parsed but did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The store rejected a write; the same save may be attempted again
    #[error("Save failed: {0}")]
    Persistence(String),

    #[error("Another request is still in progress")]
    Busy,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether a failed save can be retried without touching the workflow
    pub fn is_retryable_save(&self) -> bool {
        matches!(self, Error::Persistence(_) | Error::Pool(_))
    }

    /// True for failures of the external text generator, including
    /// responses that could not be shape-checked
    pub fn is_ai_failure(&self) -> bool {
        matches!(self, Error::Ai(_) | Error::InvalidData(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
