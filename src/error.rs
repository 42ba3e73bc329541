//! Error type shared by the service clients, the map layer and the UI.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Everything that can go wrong talking to the hosted services or the map library.
///
/// None of these are fatal to the process: every variant ends up as a string in
/// one region of the UI while the rest of the window stays interactive.
#[derive(Debug, Error)]
pub enum AppError {
    /// Transport-level failure (DNS, TLS, connection reset, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// A payload could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NoSession,

    /// A required environment setting is absent.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// The map library did not become available in time.
    #[error("map library load timed out after {0} ms")]
    LibraryTimeout(u128),

    /// The map library load handshake or widget construction failed.
    #[error("map initialization failed: {0}")]
    MapInit(String),

    /// A tile or icon image could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl AppError {
    /// Short message for inline display next to the control that failed.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status of an [`AppError::Api`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn api(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            status,
            message: message.into(),
        }
    }
}
