//! Host seams: the native playback element and its environment
//!
//! The controller never touches a rendering environment directly. A host
//! (browser binding, desktop shell, the in-memory `sim` host) implements
//! these traits and forwards element events through a [`SignalSink`].

use crate::events::SignalSink;
use crate::types::TimeRange;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Events the native element reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    TimeUpdate,
    /// More data buffered
    Progress,
    Seeked,
    DurationChange,
    LoadedMetadata,
    Play,
    Pause,
    VolumeChange,
    Error { code: MediaErrorCode },
}

/// HTML `MediaError` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
}

impl MediaErrorCode {
    /// Map a numeric `MediaError.code`
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(MediaErrorCode::Aborted),
            2 => Some(MediaErrorCode::Network),
            3 => Some(MediaErrorCode::Decode),
            4 => Some(MediaErrorCode::SrcNotSupported),
            _ => None,
        }
    }
}

/// Handle returned by a listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Native playback element.
///
/// Commands mirror the standard media element. Getters return the element's
/// own view; `duration` is NaN until metadata is known. Implementations clamp
/// `set_current_time` to the seekable range themselves.
pub trait MediaElement: Send {
    /// Register the event listener set for one binding generation
    fn subscribe(&mut self, sink: SignalSink) -> ListenerId;

    /// Remove a listener set; unknown ids are ignored
    fn unsubscribe(&mut self, id: ListenerId);

    /// Assign a source URL directly
    fn set_source(&mut self, url: &str);

    /// Drop the current source and reload the empty element
    fn clear_source(&mut self);

    /// Native format capability check
    fn can_play_type(&self, mime: &str) -> bool;

    /// Begin playback; the element confirms with a `Play` event
    fn play(&mut self) -> Result<()>;

    /// Pause playback; the element confirms with a `Pause` event
    fn pause(&mut self);

    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn duration(&self) -> f64;
    fn buffered(&self) -> Vec<TimeRange>;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
}

/// Document-level capabilities around the element.
///
/// Fullscreen is requested on the element's container so overlays stay
/// visible.
#[async_trait]
pub trait Environment: Send + Sync {
    fn is_fullscreen(&self) -> bool;

    async fn request_fullscreen(&self) -> Result<()>;

    async fn exit_fullscreen(&self) -> Result<()>;

    /// Register a fullscreen-change listener; the sink posts `FullscreenChanged`
    fn on_fullscreen_change(&self, sink: SignalSink) -> ListenerId;

    fn remove_fullscreen_listener(&self, id: ListenerId);

    fn is_picture_in_picture(&self) -> bool;

    async fn request_picture_in_picture(&self) -> Result<()>;

    async fn exit_picture_in_picture(&self) -> Result<()>;
}
