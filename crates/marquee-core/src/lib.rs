//! Marquee Core - playback state controller for embeddable video surfaces
//!
//! This crate owns everything between a native media element and a control
//! surface:
//! - Source classification (segmented HLS vs progressive files)
//! - Adaptive engine binding with bounded error recovery
//! - A single immutable playback snapshot, replaced on every change
//! - Intents (play/pause, seek, skip, volume, fullscreen, picture-in-picture)
//! - Time formatting for the control bar
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Marquee Core                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Source    │  │    Engine    │  │    Media     │           │
//! │  │  Classifier  │  │   Adapter    │  │   Element    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │ signals            │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Playback   │ ◄── intents                  │
//! │                    │ Controller  │                              │
//! │                    └──────┬──────┘                              │
//! │                           │ watch                               │
//! │                    ┌──────┴──────┐                              │
//! │                    │  Snapshot   │ ──► control surface          │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod source;
pub mod time;
pub mod buffered;
pub mod element;
pub mod engine;
pub mod events;
pub mod adapter;
pub mod controller;
#[cfg(feature = "sim")]
pub mod sim;

pub use error::{Error, ErrorInfo, ErrorKind, Result};
pub use types::*;
pub use config::{EngineConfig, PlayerConfig};
pub use source::{classify, source_from_query, PlaybackSource, PlaybackStrategy, SourceHint};
pub use time::{format_time, parse_time};
pub use element::{Environment, MediaElement, MediaErrorCode, MediaEvent};
pub use engine::{AdaptiveEngine, EngineError, EngineErrorCategory, EngineEvent, EngineFactory};
pub use events::{Origin, Signal, SignalSink, Tagged};
pub use adapter::EngineAdapter;
pub use controller::PlaybackController;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Marquee Core initialized");
}
