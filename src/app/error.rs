use thiserror::Error;

use crate::config::ConfigError;
use crate::mutation::{MutationKey, MutationKind};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Remote service rejected the request: {0}")]
    Remote(String),

    #[error("{}", .kind.failure_notice())]
    MutationFailed {
        kind: MutationKind,
        #[source]
        source: Box<FeedError>,
    },

    #[error("Another change to {0} is still in progress")]
    MutationInFlight(MutationKey),

    #[error("Failed to load notifications: {0}")]
    Load(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl FeedError {
    /// Message suitable for a transient failure notice.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Load(message) | FeedError::Remote(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
