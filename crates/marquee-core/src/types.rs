//! Core types for Marquee

use crate::error::ErrorInfo;
use crate::source::PlaybackStrategy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binding generation.
///
/// Bumped on every source change; signals tagged with an older generation
/// are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A buffered time range in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Player state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Initial state, no source attached
    Idle,
    /// Source classified, binding or assignment in progress
    Loading,
    /// Metadata known, playback not started
    Ready,
    /// Element reported `play`
    Playing,
    /// Element reported `pause`
    Paused,
    /// Unrecoverable error for the current source
    Errored,
}

impl PlayerState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlayerState) -> bool {
        use PlayerState::*;
        matches!(
            (self, target),
            // Any source change restarts loading, stop returns to idle
            (_, Loading) | (_, Idle) |
            // From Loading
            (Loading, Ready) | (Loading, Playing) | (Loading, Paused) | (Loading, Errored) |
            // From Ready
            (Ready, Playing) | (Ready, Paused) | (Ready, Errored) |
            // From Playing
            (Playing, Paused) | (Playing, Errored) |
            // From Paused
            (Paused, Playing) | (Paused, Errored)
        )
    }

    /// Ready or one of its sub-states
    pub fn is_ready(&self) -> bool {
        matches!(self, PlayerState::Ready | PlayerState::Playing | PlayerState::Paused)
    }

    /// A source is attached and not errored
    pub fn has_source(&self) -> bool {
        !matches!(self, PlayerState::Idle | PlayerState::Errored)
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerState::Idle => write!(f, "idle"),
            PlayerState::Loading => write!(f, "loading"),
            PlayerState::Ready => write!(f, "ready"),
            PlayerState::Playing => write!(f, "playing"),
            PlayerState::Paused => write!(f, "paused"),
            PlayerState::Errored => write!(f, "errored"),
        }
    }
}

/// UI-facing playback state.
///
/// Replaced whole on every change; the control surface renders from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub state: PlayerState,
    pub strategy: Option<PlaybackStrategy>,
    pub is_playing: bool,
    pub current_time: f64,
    /// `None` until the element reports metadata
    pub duration: Option<f64>,
    pub buffered_end: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    pub error: Option<ErrorInfo>,
    pub controls_visible: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            state: PlayerState::Idle,
            strategy: None,
            is_playing: false,
            current_time: 0.0,
            duration: None,
            buffered_end: 0.0,
            volume: 1.0,
            is_muted: false,
            is_fullscreen: false,
            error: None,
            controls_visible: true,
        }
    }
}

impl PlaybackSnapshot {
    /// Copy with the per-source fields reset for a new load attempt
    pub fn reset_for_load(&self, strategy: PlaybackStrategy) -> Self {
        Self {
            state: PlayerState::Loading,
            strategy: Some(strategy),
            is_playing: false,
            current_time: 0.0,
            duration: None,
            buffered_end: 0.0,
            error: None,
            ..self.clone()
        }
    }

    /// Copy with no source attached
    pub fn reset_idle(&self) -> Self {
        Self {
            state: PlayerState::Idle,
            strategy: None,
            is_playing: false,
            current_time: 0.0,
            duration: None,
            buffered_end: 0.0,
            error: None,
            ..self.clone()
        }
    }

    /// Playback progress in `[0, 1]`, zero while duration is unknown
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d.is_finite() && d > 0.0 => (self.current_time / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Volume the control surface should draw
    pub fn effective_volume(&self) -> f64 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(PlayerState::Idle.can_transition_to(PlayerState::Loading));
        assert!(PlayerState::Loading.can_transition_to(PlayerState::Ready));
        assert!(PlayerState::Ready.can_transition_to(PlayerState::Playing));
        assert!(PlayerState::Playing.can_transition_to(PlayerState::Paused));
        assert!(PlayerState::Errored.can_transition_to(PlayerState::Loading));

        assert!(!PlayerState::Idle.can_transition_to(PlayerState::Playing));
        assert!(!PlayerState::Errored.can_transition_to(PlayerState::Playing));
        assert!(!PlayerState::Idle.can_transition_to(PlayerState::Errored));
    }

    #[test]
    fn test_reset_keeps_user_settings() {
        let snapshot = PlaybackSnapshot {
            state: PlayerState::Playing,
            is_playing: true,
            current_time: 42.0,
            duration: Some(60.0),
            volume: 0.4,
            is_muted: true,
            is_fullscreen: true,
            ..Default::default()
        };

        let reset = snapshot.reset_for_load(PlaybackStrategy::Progressive);
        assert_eq!(reset.state, PlayerState::Loading);
        assert!(!reset.is_playing);
        assert_eq!(reset.current_time, 0.0);
        assert_eq!(reset.duration, None);
        assert_eq!(reset.volume, 0.4);
        assert!(reset.is_muted);
        assert!(reset.is_fullscreen);
    }

    #[test]
    fn test_progress_and_effective_volume() {
        let snapshot = PlaybackSnapshot {
            current_time: 15.0,
            duration: Some(60.0),
            volume: 0.7,
            is_muted: true,
            ..Default::default()
        };
        assert_eq!(snapshot.progress(), 0.25);
        assert_eq!(snapshot.effective_volume(), 0.0);
        assert_eq!(PlaybackSnapshot::default().progress(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(PlaybackSnapshot::default()).unwrap();
        assert_eq!(json["isPlaying"], false);
        assert_eq!(json["bufferedEnd"], 0.0);
        assert!(json["duration"].is_null());
        assert_eq!(json["controlsVisible"], true);
    }
}
