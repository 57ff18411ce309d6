//! Adaptive Engine Adapter
//!
//! Binds one engine instance to the element for one binding generation and
//! turns engine errors into the snapshot error taxonomy:
//!
//! | Engine category (fatal) | Kind        | Recovery                     |
//! |-------------------------|-------------|------------------------------|
//! | network                 | network     | `start_load`                 |
//! | media                   | media       | `recover_media_error`        |
//! | other                   | fatal-other | teardown, no further attempt |
//!
//! Non-fatal errors are logged and otherwise ignored. Recovery attempts are
//! capped per binding; past the cap the binding is torn down.

use crate::config::{EngineConfig, PlayerConfig};
use crate::element::MediaElement;
use crate::engine::{AdaptiveEngine, EngineError, EngineErrorCategory, EngineFactory};
use crate::error::{Error, ErrorInfo, ErrorKind};
use crate::events::SignalSink;
use crate::source::PlaybackSource;
use crate::types::Generation;
use tracing::{debug, error, info, warn};

/// Exclusive engine attachment for one generation
pub struct EngineBinding {
    generation: Generation,
    engine: Option<Box<dyn AdaptiveEngine>>,
    recovery_attempts: u32,
    max_recovery_attempts: u32,
}

/// What happened to an engine error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Non-fatal, or the binding is already torn down
    Ignored,
    /// A recovery action was issued
    Recovering { kind: ErrorKind, attempt: u32 },
    /// Unrecoverable; the binding has been torn down
    Terminal(ErrorInfo),
}

impl EngineBinding {
    fn new(generation: Generation, engine: Box<dyn AdaptiveEngine>, max_recovery_attempts: u32) -> Self {
        Self {
            generation,
            engine: Some(engine),
            recovery_attempts: 0,
            max_recovery_attempts,
        }
    }

    /// Engine still owned and not destroyed
    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    /// Release the engine. Idempotent.
    pub fn detach(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
            info!(generation = %self.generation, "Engine binding released");
        }
    }

    /// Classify an engine error and run the matching recovery action
    pub fn handle_error(&mut self, err: &EngineError) -> ErrorDisposition {
        if !err.fatal {
            warn!(
                generation = %self.generation,
                category = %err.category,
                details = %err.details,
                "Non-fatal engine error"
            );
            return ErrorDisposition::Ignored;
        }

        if !self.is_active() {
            debug!(generation = %self.generation, "Engine error after teardown ignored");
            return ErrorDisposition::Ignored;
        }

        let kind = match err.category {
            EngineErrorCategory::Network => ErrorKind::Network,
            EngineErrorCategory::Media => ErrorKind::Media,
            EngineErrorCategory::Other => ErrorKind::FatalOther,
        };

        if !kind.is_recoverable() {
            error!(generation = %self.generation, details = %err.details, "Fatal engine error");
            self.detach();
            return ErrorDisposition::Terminal(ErrorInfo::fatal("Fatal error occurred"));
        }

        if self.recovery_attempts >= self.max_recovery_attempts {
            error!(
                generation = %self.generation,
                kind = %kind,
                attempts = self.recovery_attempts,
                details = %err.details,
                "Recovery attempts exhausted"
            );
            self.detach();
            return ErrorDisposition::Terminal(ErrorInfo::new(
                kind,
                format!("{} (recovery failed after {} attempts)", kind_message(kind), self.recovery_attempts),
            ));
        }

        self.recovery_attempts += 1;
        let attempt = self.recovery_attempts;
        warn!(
            generation = %self.generation,
            kind = %kind,
            attempt,
            details = %err.details,
            "Fatal engine error, recovering"
        );

        if let Some(engine) = self.engine.as_mut() {
            match kind {
                ErrorKind::Network => engine.start_load(),
                _ => engine.recover_media_error(),
            }
        }

        ErrorDisposition::Recovering { kind, attempt }
    }
}

impl Drop for EngineBinding {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBinding")
            .field("generation", &self.generation)
            .field("active", &self.is_active())
            .field("recovery_attempts", &self.recovery_attempts)
            .finish()
    }
}

fn kind_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Network => "Network error occurred",
        ErrorKind::Media => "Media error occurred",
        ErrorKind::Unsupported => "Playback is not supported",
        ErrorKind::FatalOther => "Fatal error occurred",
    }
}

/// Result of an attach attempt
#[derive(Debug)]
pub enum AttachOutcome {
    /// Engine constructed and bound to the element
    Bound(EngineBinding),
    /// Engine unavailable; the element plays the manifest natively
    Native,
    /// Neither path can play the source
    Unsupported(ErrorInfo),
}

/// Constructs and configures engine bindings
pub struct EngineAdapter {
    factory: Box<dyn EngineFactory>,
    engine_config: EngineConfig,
    native_mime: String,
    max_recovery_attempts: u32,
}

impl EngineAdapter {
    pub fn new(factory: Box<dyn EngineFactory>, config: &PlayerConfig) -> Self {
        Self {
            factory,
            engine_config: config.engine.clone(),
            native_mime: config.native_segmented_mime.clone(),
            max_recovery_attempts: config.max_recovery_attempts,
        }
    }

    /// Bind a segmented source to the element.
    ///
    /// Falls back to native playback when the engine is unsupported but the
    /// element can play the manifest type itself.
    pub fn attach(
        &self,
        source: &PlaybackSource,
        element: &mut dyn MediaElement,
        sink: SignalSink,
        generation: Generation,
    ) -> AttachOutcome {
        if self.factory.is_supported() {
            match self.factory.create(&self.engine_config, sink) {
                Ok(mut engine) => {
                    engine.load_source(&source.url);
                    engine.attach_media(element);
                    info!(%generation, url = %source.url, "Engine bound");
                    return AttachOutcome::Bound(EngineBinding::new(
                        generation,
                        engine,
                        self.max_recovery_attempts,
                    ));
                }
                Err(e) => {
                    warn!(%generation, error = %e, code = e.error_code(), "Engine construction failed");
                }
            }
        }

        if element.can_play_type(&self.native_mime) {
            info!(%generation, url = %source.url, "Using native segmented playback");
            element.set_source(&source.url);
            return AttachOutcome::Native;
        }

        let err = Error::Unsupported;
        warn!(%generation, url = %source.url, code = err.error_code(), "Segmented playback unsupported");
        AttachOutcome::Unsupported(ErrorInfo::from(&err))
    }

    /// Release a binding. Idempotent.
    pub fn detach(&self, binding: &mut EngineBinding) {
        binding.detach();
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::events::{Origin, Tagged};
    use crate::sim::{SimulatedElement, SimulatedEngineFactory};
    use tokio::sync::mpsc;

    fn sink(generation: Generation) -> (SignalSink, mpsc::UnboundedReceiver<Tagged>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSink::new(Origin::Binding(generation), tx), rx)
    }

    fn bound(factory: &SimulatedEngineFactory, config: &PlayerConfig) -> EngineBinding {
        let adapter = EngineAdapter::new(Box::new(factory.clone()), config);
        let mut element = SimulatedElement::new();
        let (sink, _rx) = sink(Generation(1));
        match adapter.attach(&PlaybackSource::auto("stream.m3u8"), &mut element, sink, Generation(1)) {
            AttachOutcome::Bound(binding) => binding,
            other => panic!("expected binding, got {:?}", other),
        }
    }

    #[test]
    fn test_attach_loads_and_binds() {
        let factory = SimulatedEngineFactory::new();
        let binding = bound(&factory, &PlayerConfig::default());

        assert!(binding.is_active());
        assert_eq!(factory.created(), 1);
        let engine = factory.engine(0).unwrap();
        assert_eq!(engine.url.as_deref(), Some("stream.m3u8"));
        assert!(engine.attached);
    }

    #[test]
    fn test_native_fallback() {
        let factory = SimulatedEngineFactory::unsupported();
        let adapter = EngineAdapter::new(Box::new(factory.clone()), &PlayerConfig::default());
        let mut element = SimulatedElement::with_native_types(&["application/vnd.apple.mpegurl"]);
        let handle = element.handle();
        let (sink, _rx) = sink(Generation(1));

        let outcome = adapter.attach(&PlaybackSource::auto("a.m3u8"), &mut element, sink, Generation(1));
        assert!(matches!(outcome, AttachOutcome::Native));
        assert_eq!(factory.created(), 0);
        assert_eq!(handle.src().as_deref(), Some("a.m3u8"));
    }

    #[test]
    fn test_unsupported() {
        let factory = SimulatedEngineFactory::unsupported();
        let adapter = EngineAdapter::new(Box::new(factory), &PlayerConfig::default());
        let mut element = SimulatedElement::new();
        let (sink, _rx) = sink(Generation(1));

        match adapter.attach(&PlaybackSource::auto("a.m3u8"), &mut element, sink, Generation(1)) {
            AttachOutcome::Unsupported(info) => assert_eq!(info.kind, ErrorKind::Unsupported),
            other => panic!("expected unsupported, got {:?}", other),
        }
    }

    #[test]
    fn test_detach_idempotent() {
        let factory = SimulatedEngineFactory::new();
        let mut binding = bound(&factory, &PlayerConfig::default());

        binding.detach();
        binding.detach();
        drop(binding);

        assert_eq!(factory.engine(0).unwrap().destroy_calls, 1);
    }

    #[test]
    fn test_non_fatal_ignored() {
        let factory = SimulatedEngineFactory::new();
        let mut binding = bound(&factory, &PlayerConfig::default());

        let err = EngineError::non_fatal(EngineErrorCategory::Network, "fragLoadTimeOut");
        assert_eq!(binding.handle_error(&err), ErrorDisposition::Ignored);
        assert_eq!(binding.recovery_attempts(), 0);
        assert_eq!(factory.engine(0).unwrap().start_loads, 0);
    }

    #[test]
    fn test_network_recovery_until_cap() {
        let factory = SimulatedEngineFactory::new();
        let mut binding = bound(&factory, &PlayerConfig::default());
        let err = EngineError::fatal(EngineErrorCategory::Network, "manifestLoadError");

        for attempt in 1..=3 {
            assert_eq!(
                binding.handle_error(&err),
                ErrorDisposition::Recovering { kind: ErrorKind::Network, attempt }
            );
        }
        match binding.handle_error(&err) {
            ErrorDisposition::Terminal(info) => assert_eq!(info.kind, ErrorKind::Network),
            other => panic!("expected terminal, got {:?}", other),
        }

        let engine = factory.engine(0).unwrap();
        assert_eq!(engine.start_loads, 3);
        assert_eq!(engine.destroy_calls, 1);
        assert!(!binding.is_active());
        assert_eq!(binding.handle_error(&err), ErrorDisposition::Ignored);
    }

    #[test]
    fn test_media_recovery() {
        let factory = SimulatedEngineFactory::new();
        let mut binding = bound(&factory, &PlayerConfig::default());

        let err = EngineError::fatal(EngineErrorCategory::Media, "bufferAppendError");
        assert_eq!(
            binding.handle_error(&err),
            ErrorDisposition::Recovering { kind: ErrorKind::Media, attempt: 1 }
        );
        assert_eq!(factory.engine(0).unwrap().media_recoveries, 1);
    }

    #[test]
    fn test_other_fatal_tears_down() {
        let factory = SimulatedEngineFactory::new();
        let mut binding = bound(&factory, &PlayerConfig::default());

        let err = EngineError::fatal(EngineErrorCategory::Other, "internalException");
        match binding.handle_error(&err) {
            ErrorDisposition::Terminal(info) => assert_eq!(info.kind, ErrorKind::FatalOther),
            other => panic!("expected terminal, got {:?}", other),
        }
        assert!(!binding.is_active());
        assert_eq!(factory.engine(0).unwrap().start_loads, 0);
    }
}
