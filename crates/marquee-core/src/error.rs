//! Error types for Marquee Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Engine errors
    #[error("Segmented playback is not supported in this environment")]
    Unsupported,

    #[error("Failed to create adaptive engine: {0}")]
    EngineCreate(String),

    // Source errors
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    // Element errors
    #[error("Playback rejected by element: {0}")]
    PlaybackRejected(String),

    // Environment errors (fullscreen, picture-in-picture)
    #[error("Environment request failed: {0}")]
    Environment(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an environment error
    pub fn environment(msg: impl Into<String>) -> Self {
        Error::Environment(msg.into())
    }

    /// Returns true if retrying the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PlaybackRejected(_) | Error::Environment(_))
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unsupported => "UNSUPPORTED",
            Error::EngineCreate(_) => "ENGINE_CREATE",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::PlaybackRejected(_) => "PLAYBACK_REJECTED",
            Error::Environment(_) => "ENVIRONMENT",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

/// Snapshot-facing error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Network-level failure (manifest or segment transport)
    Network,
    /// Decode or media pipeline failure
    Media,
    /// Neither the engine nor the element can play the source
    Unsupported,
    /// Any other fatal failure
    FatalOther,
}

impl ErrorKind {
    /// Stable code for logs
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Media => "MEDIA",
            ErrorKind::Unsupported => "UNSUPPORTED",
            ErrorKind::FatalOther => "FATAL_OTHER",
        }
    }

    /// Whether an in-place recovery action exists for this kind
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Media)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Media => write!(f, "media"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::FatalOther => write!(f, "fatal-other"),
        }
    }
}

/// Error shown by the control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn media(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Media, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FatalOther, message)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        match err {
            Error::Unsupported => ErrorInfo::unsupported(err.to_string()),
            _ => ErrorInfo::fatal(err.to_string()),
        }
    }
}
