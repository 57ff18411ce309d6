//! Adaptive streaming engine seam
//!
//! Manifest parsing and segment transport live inside the engine. The
//! controller only needs construction, the load/attach calls, the two
//! recovery primitives and teardown.

use crate::config::EngineConfig;
use crate::element::MediaElement;
use crate::events::SignalSink;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Engine error category as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorCategory {
    Network,
    Media,
    Other,
}

impl std::fmt::Display for EngineErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorCategory::Network => write!(f, "network"),
            EngineErrorCategory::Media => write!(f, "media"),
            EngineErrorCategory::Other => write!(f, "other"),
        }
    }
}

/// Error reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub category: EngineErrorCategory,
    pub fatal: bool,
    pub details: String,
}

impl EngineError {
    pub fn fatal(category: EngineErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn non_fatal(category: EngineErrorCategory, details: impl Into<String>) -> Self {
        Self {
            category,
            fatal: false,
            details: details.into(),
        }
    }
}

/// Events the engine posts through its sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ManifestParsed { levels: usize },
    Error(EngineError),
}

/// One engine instance
pub trait AdaptiveEngine: Send {
    /// Start fetching the manifest at `url`
    fn load_source(&mut self, url: &str);

    /// Bind engine output to the element
    fn attach_media(&mut self, element: &mut dyn MediaElement);

    /// Resume loading after a network failure
    fn start_load(&mut self);

    /// Attempt in-place media pipeline recovery
    fn recover_media_error(&mut self);

    /// Release all engine resources
    fn destroy(&mut self);
}

/// Constructs engines and answers the runtime-support check
pub trait EngineFactory: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Create an engine that reports through `sink`
    fn create(&self, config: &EngineConfig, sink: SignalSink) -> Result<Box<dyn AdaptiveEngine>>;
}
