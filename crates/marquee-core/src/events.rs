//! Signal plumbing between the host and the controller
//!
//! Element listeners, engine callbacks and async intent completions all post
//! into one ordered queue through a [`SignalSink`]. Every sink carries the
//! origin it was created for, so the controller can drop signals from a
//! binding generation that has already been replaced.

use crate::element::MediaEvent;
use crate::engine::EngineEvent;
use crate::types::Generation;
use tokio::sync::mpsc;

/// Where a signal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Element listener or engine of one binding generation
    Binding(Generation),
    /// Element-wide listener registered for the controller's lifetime.
    /// Only volume changes are taken from it.
    Element,
    /// Document-level listener that outlives source changes
    Document,
}

/// Intents whose result arrives asynchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncIntent {
    EnterFullscreen,
    ExitFullscreen,
    EnterPictureInPicture,
    ExitPictureInPicture,
}

impl std::fmt::Display for AsyncIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AsyncIntent::EnterFullscreen => write!(f, "enter_fullscreen"),
            AsyncIntent::ExitFullscreen => write!(f, "exit_fullscreen"),
            AsyncIntent::EnterPictureInPicture => write!(f, "enter_pip"),
            AsyncIntent::ExitPictureInPicture => write!(f, "exit_pip"),
        }
    }
}

/// Something the controller folds into the snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Media(MediaEvent),
    Engine(EngineEvent),
    FullscreenChanged,
    IntentSettled {
        intent: AsyncIntent,
        result: std::result::Result<(), String>,
    },
}

/// A signal with its origin
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    pub origin: Origin,
    pub signal: Signal,
}

/// Cloneable handle for posting signals to a controller
#[derive(Debug, Clone)]
pub struct SignalSink {
    origin: Origin,
    tx: mpsc::UnboundedSender<Tagged>,
}

impl SignalSink {
    pub(crate) fn new(origin: Origin, tx: mpsc::UnboundedSender<Tagged>) -> Self {
        Self { origin, tx }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Post a signal. Returns false once the controller is gone.
    pub fn emit(&self, signal: Signal) -> bool {
        self.tx
            .send(Tagged {
                origin: self.origin,
                signal,
            })
            .is_ok()
    }

    pub fn media(&self, event: MediaEvent) -> bool {
        self.emit(Signal::Media(event))
    }

    pub fn engine(&self, event: EngineEvent) -> bool {
        self.emit(Signal::Engine(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_origin() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = SignalSink::new(Origin::Binding(Generation(3)), tx);

        assert!(sink.media(MediaEvent::Play));
        let document = SignalSink::new(Origin::Document, sink.tx.clone());
        assert!(document.emit(Signal::FullscreenChanged));
        assert_eq!(document.origin(), Origin::Document);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.origin, Origin::Binding(Generation(3)));
        assert_eq!(first.signal, Signal::Media(MediaEvent::Play));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.origin, Origin::Document);
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = SignalSink::new(Origin::Document, tx);
        drop(rx);
        assert!(!sink.emit(Signal::FullscreenChanged));
    }
}
