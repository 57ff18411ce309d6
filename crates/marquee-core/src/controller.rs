//! Playback Controller - owns the snapshot and the engine binding
//!
//! Coordinates:
//! - Source classification and the teardown-then-rebind lifecycle
//! - Folding element, engine and document signals into the snapshot
//! - Intents issued by the control surface
//! - Discarding signals from superseded binding generations
//!
//! The controller never predicts element state. Intents issue element
//! commands and the snapshot follows from the events (or getter reads) that
//! come back.

use crate::{
    adapter::{AttachOutcome, EngineAdapter, EngineBinding, ErrorDisposition},
    buffered,
    config::PlayerConfig,
    element::{Environment, ListenerId, MediaElement, MediaErrorCode, MediaEvent},
    engine::{EngineEvent, EngineFactory},
    error::ErrorInfo,
    events::{AsyncIntent, Origin, Signal, SignalSink, Tagged},
    source::{PlaybackSource, PlaybackStrategy, SourceHint},
    types::*,
    Result,
};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Listener registration and engine binding for one generation.
/// Released as a unit.
struct BindingScope {
    generation: Generation,
    listener: ListenerId,
    binding: Option<EngineBinding>,
}

impl BindingScope {
    fn release(mut self, element: &mut dyn MediaElement) {
        element.unsubscribe(self.listener);
        if let Some(mut binding) = self.binding.take() {
            binding.detach();
        }
        debug!(generation = %self.generation, "Binding scope released");
    }
}

/// Playback controller for one mounted player
pub struct PlaybackController {
    /// Instance ID for logs
    id: SessionId,
    config: PlayerConfig,
    element: Box<dyn MediaElement>,
    environment: Arc<dyn Environment>,
    adapter: EngineAdapter,
    /// Current binding generation
    generation: Generation,
    source: Option<PlaybackSource>,
    scope: Option<BindingScope>,
    /// Element-wide listener; volume changes arrive even without a source
    element_listener: ListenerId,
    fullscreen_listener: ListenerId,
    /// Working copy; published through `snapshot_tx`
    snapshot: PlaybackSnapshot,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    /// Snapshot replacements published so far
    revision: u64,
    signal_tx: mpsc::UnboundedSender<Tagged>,
    signal_rx: mpsc::UnboundedReceiver<Tagged>,
}

impl PlaybackController {
    /// Create a controller bound to one element
    pub fn new(
        config: PlayerConfig,
        mut element: Box<dyn MediaElement>,
        environment: Arc<dyn Environment>,
        factory: Box<dyn EngineFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let fullscreen_listener =
            environment.on_fullscreen_change(SignalSink::new(Origin::Document, signal_tx.clone()));

        element.set_volume(config.initial_volume);
        let element_listener =
            element.subscribe(SignalSink::new(Origin::Element, signal_tx.clone()));

        let snapshot = PlaybackSnapshot {
            volume: element.volume().clamp(0.0, 1.0),
            is_muted: element.muted(),
            is_fullscreen: environment.is_fullscreen(),
            controls_visible: config.controls_visible,
            ..Default::default()
        };
        let (snapshot_tx, _) = watch::channel(snapshot.clone());

        let id = SessionId::new();
        info!(session_id = %id, "Playback controller created");

        Ok(Self {
            id,
            adapter: EngineAdapter::new(factory, &config),
            config,
            element,
            environment,
            generation: Generation::default(),
            source: None,
            scope: None,
            element_listener,
            fullscreen_listener,
            snapshot,
            snapshot_tx,
            revision: 0,
            signal_tx,
            signal_rx,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Current binding generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn source(&self) -> Option<&PlaybackSource> {
        self.source.as_ref()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Number of snapshot replacements published since creation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Subscribe to snapshot replacements
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Sink for document-level signals posted by the host
    pub fn document_sink(&self) -> SignalSink {
        SignalSink::new(Origin::Document, self.signal_tx.clone())
    }

    /// Whether an engine is currently bound to the element
    pub fn has_engine_binding(&self) -> bool {
        self.binding().map(|b| b.is_active()).unwrap_or(false)
    }

    /// Recovery attempts spent by the current binding
    pub fn recovery_attempts(&self) -> u32 {
        self.binding().map(|b| b.recovery_attempts()).unwrap_or(0)
    }

    fn binding(&self) -> Option<&EngineBinding> {
        self.scope.as_ref().and_then(|s| s.binding.as_ref())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load a new source.
    ///
    /// Tears down the previous binding scope, classifies the source, then
    /// either binds an engine or assigns the URL to the element. An empty URL
    /// behaves like [`stop`](Self::stop). Setting the source that is already
    /// loaded leaves the binding alone. Returns the current generation.
    #[instrument(skip(self, url), fields(session_id = %self.id))]
    pub fn set_source(&mut self, url: impl Into<String>, hint: SourceHint) -> Generation {
        let source = PlaybackSource::new(url, hint);
        if source.url.trim().is_empty() {
            debug!("Empty source, stopping");
            self.stop();
            return self.generation;
        }

        if self.source.as_ref() == Some(&source) && self.snapshot.state.has_source() {
            debug!(url = %source.url, "Source unchanged, keeping binding");
            return self.generation;
        }

        let strategy = source.strategy();
        self.teardown();

        let generation = self.generation;
        info!(%generation, url = %source.url, %strategy, from = %self.snapshot.state, "Loading source");
        self.snapshot = self.snapshot.reset_for_load(strategy);

        let sink = SignalSink::new(Origin::Binding(generation), self.signal_tx.clone());
        let listener = self.element.subscribe(sink.clone());
        let mut scope = BindingScope {
            generation,
            listener,
            binding: None,
        };

        let mut failure = None;
        match strategy {
            PlaybackStrategy::Segmented => {
                match self.adapter.attach(&source, self.element.as_mut(), sink, generation) {
                    AttachOutcome::Bound(binding) => scope.binding = Some(binding),
                    AttachOutcome::Native => {}
                    AttachOutcome::Unsupported(info) => failure = Some(info),
                }
            }
            PlaybackStrategy::Progressive => self.element.set_source(&source.url),
        }

        self.scope = Some(scope);
        self.source = Some(source);
        if let Some(info) = failure {
            self.fail(info);
        }
        self.commit();
        generation
    }

    /// Drop the current source and return to idle
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn stop(&mut self) {
        if self.snapshot.state == PlayerState::Idle && self.scope.is_none() {
            return;
        }
        info!(generation = %self.generation, "Stopping playback");
        self.teardown();
        self.source = None;
        self.snapshot = self.snapshot.reset_idle();
        self.commit();
    }

    /// Release the current engine binding without touching the snapshot.
    ///
    /// Safe to call repeatedly and on a controller that never loaded anything.
    pub fn detach(&mut self) {
        if let Some(binding) = self.scope.as_mut().and_then(|s| s.binding.as_mut()) {
            self.adapter.detach(binding);
        }
    }

    /// Release the scope, clear the element and move to a fresh generation
    fn teardown(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.release(self.element.as_mut());
        }
        self.element.clear_source();
        self.generation = self.generation.next();
    }

    // =========================================================================
    // Signal folding
    // =========================================================================

    /// Fold every queued signal; returns how many were processed.
    ///
    /// With coalescing on, the batch produces a single snapshot replacement.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(tagged) = self.signal_rx.try_recv() {
            self.fold(tagged);
            processed += 1;
            if !self.config.coalesce_time_updates {
                self.commit();
            }
        }
        if processed > 0 {
            self.commit();
        }
        processed
    }

    /// Fold one signal and publish the result
    pub fn handle(&mut self, tagged: Tagged) {
        self.fold(tagged);
        self.commit();
    }

    fn fold(&mut self, tagged: Tagged) {
        let volume_change = tagged.signal == Signal::Media(MediaEvent::VolumeChange);
        match tagged.origin {
            Origin::Binding(generation) if generation != self.generation => {
                debug!(
                    stale = %generation,
                    current = %self.generation,
                    signal = ?tagged.signal,
                    "Discarding signal from superseded generation"
                );
                return;
            }
            // Volume belongs to the element-wide listener
            Origin::Binding(_) if volume_change => return,
            Origin::Element if !volume_change => return,
            _ => {}
        }

        match tagged.signal {
            Signal::Media(event) => self.fold_media(event),
            Signal::Engine(event) => self.fold_engine(event),
            Signal::FullscreenChanged => {
                self.snapshot.is_fullscreen = self.environment.is_fullscreen();
            }
            Signal::IntentSettled { intent, result } => match result {
                Ok(()) => debug!(%intent, "Request completed"),
                Err(message) => warn!(%intent, error = %message, "Request failed"),
            },
        }
    }

    fn fold_media(&mut self, event: MediaEvent) {
        let state = self.snapshot.state;

        // Volume is element-wide; everything else belongs to a live source
        if !state.has_source() && event != MediaEvent::VolumeChange {
            return;
        }

        match event {
            MediaEvent::TimeUpdate | MediaEvent::Progress | MediaEvent::Seeked => {
                self.sync_position();
            }
            MediaEvent::DurationChange | MediaEvent::LoadedMetadata => {
                self.snapshot.duration = known_duration(self.element.duration());
                self.sync_position();
                let usable = event == MediaEvent::LoadedMetadata || self.snapshot.duration.is_some();
                if state == PlayerState::Loading && usable {
                    self.transition(PlayerState::Ready);
                }
            }
            MediaEvent::Play => {
                self.snapshot.is_playing = true;
                self.transition(PlayerState::Playing);
            }
            MediaEvent::Pause => {
                self.snapshot.is_playing = false;
                if state.is_ready() {
                    self.transition(PlayerState::Paused);
                }
            }
            MediaEvent::VolumeChange => self.sync_volume(),
            MediaEvent::Error { code } => self.fold_element_error(code),
        }
    }

    fn fold_element_error(&mut self, code: MediaErrorCode) {
        if self.has_engine_binding() {
            debug!(?code, "Element error while engine bound, engine reports it");
            return;
        }

        let info = match code {
            MediaErrorCode::Aborted => {
                debug!("Element load aborted");
                return;
            }
            MediaErrorCode::Network => ErrorInfo::network("Network error occurred"),
            MediaErrorCode::Decode => ErrorInfo::media("Media error occurred"),
            MediaErrorCode::SrcNotSupported => ErrorInfo::unsupported("Source format is not supported"),
        };
        self.fail(info);
    }

    fn fold_engine(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ManifestParsed { levels } => {
                info!(generation = %self.generation, levels, "Manifest parsed");
            }
            EngineEvent::Error(err) => {
                let Some(binding) = self.scope.as_mut().and_then(|s| s.binding.as_mut()) else {
                    debug!(details = %err.details, "Engine error without binding ignored");
                    return;
                };
                match binding.handle_error(&err) {
                    ErrorDisposition::Ignored | ErrorDisposition::Recovering { .. } => {}
                    ErrorDisposition::Terminal(info) => self.fail(info),
                }
            }
        }
    }

    fn fail(&mut self, info: ErrorInfo) {
        warn!(generation = %self.generation, kind = %info.kind, code = info.kind.code(), message = %info.message, "Playback errored");
        self.snapshot.error = Some(info);
        self.snapshot.is_playing = false;
        self.transition(PlayerState::Errored);
    }

    fn transition(&mut self, target: PlayerState) {
        let current = self.snapshot.state;
        if current == target {
            return;
        }
        if !current.can_transition_to(target) {
            warn!(from = %current, to = %target, "Ignoring invalid state transition");
            return;
        }
        self.snapshot.state = target;
        info!(from = %current, to = %target, generation = %self.generation, "State transition");
    }

    /// Read position and buffered ranges back from the element
    fn sync_position(&mut self) {
        let mut position = self.element.current_time();
        if !position.is_finite() || position < 0.0 {
            position = 0.0;
        }
        if let Some(duration) = self.snapshot.duration {
            position = position.min(duration);
        }
        self.snapshot.current_time = position;
        self.snapshot.buffered_end = buffered::buffered_end(&self.element.buffered(), position);
    }

    /// Read volume and mute flag back from the element
    fn sync_volume(&mut self) {
        let volume = self.element.volume();
        if volume.is_finite() {
            self.snapshot.volume = volume.clamp(0.0, 1.0);
        }
        self.snapshot.is_muted = self.element.muted();
    }

    /// Publish the working copy if it differs from the last replacement
    fn commit(&mut self) {
        let next = self.snapshot.clone();
        let published = self.snapshot_tx.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
        if published {
            self.revision += 1;
        }
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Toggle play/pause. The snapshot changes when the element confirms.
    pub fn play_pause(&mut self) {
        if !self.snapshot.state.has_source() {
            debug!(state = %self.snapshot.state, "play_pause without playable source");
            return;
        }

        if self.snapshot.is_playing {
            self.element.pause();
        } else if let Err(e) = self.element.play() {
            warn!(
                error = %e,
                code = e.error_code(),
                recoverable = e.is_recoverable(),
                "Play request rejected"
            );
        }
    }

    /// Seek to an absolute position; the element clamps it
    pub fn seek(&mut self, seconds: f64) {
        if !self.snapshot.state.has_source() {
            return;
        }
        if !seconds.is_finite() {
            warn!(seconds, "Ignoring non-finite seek target");
            return;
        }
        self.element.set_current_time(seconds);
        self.sync_position();
        self.commit();
    }

    pub fn skip_backward(&mut self) {
        self.skip(-self.config.skip_interval_secs);
    }

    pub fn skip_forward(&mut self) {
        self.skip(self.config.skip_interval_secs);
    }

    fn skip(&mut self, offset: f64) {
        if !self.snapshot.state.has_source() {
            return;
        }
        let upper = self.snapshot.duration.unwrap_or(f64::INFINITY);
        let target = (self.element.current_time() + offset).clamp(0.0, upper);
        if !target.is_finite() {
            warn!(offset, "Element position unknown, skip ignored");
            return;
        }
        debug!(offset, target, "Skipping");
        self.element.set_current_time(target);
        self.sync_position();
        self.commit();
    }

    /// Set the volume.
    ///
    /// Zero volume mutes; raising the volume while muted unmutes. Explicit
    /// mute toggles never touch the stored volume.
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            warn!(volume, "Ignoring non-finite volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.element.set_volume(volume);
        if volume == 0.0 {
            self.element.set_muted(true);
        } else if self.element.muted() {
            self.element.set_muted(false);
        }
        self.sync_volume();
        self.commit();
    }

    /// Flip the mute flag, leaving the volume as is
    pub fn toggle_mute(&mut self) {
        let muted = self.element.muted();
        self.element.set_muted(!muted);
        self.sync_volume();
        self.commit();
    }

    /// Written by the control surface; the controller has no policy of its own
    pub fn set_controls_visible(&mut self, visible: bool) {
        self.snapshot.controls_visible = visible;
        self.commit();
    }

    /// Request or exit fullscreen on the element's container.
    ///
    /// `is_fullscreen` follows the document's fullscreen-change signal, not
    /// the request result. Returns `None` outside a tokio runtime.
    pub fn toggle_fullscreen(&mut self) -> Option<JoinHandle<()>> {
        let environment = Arc::clone(&self.environment);
        if self.snapshot.is_fullscreen {
            self.dispatch(AsyncIntent::ExitFullscreen, async move {
                environment.exit_fullscreen().await
            })
        } else {
            self.dispatch(AsyncIntent::EnterFullscreen, async move {
                environment.request_fullscreen().await
            })
        }
    }

    /// Enter or leave picture-in-picture. Failures are logged only.
    pub fn toggle_picture_in_picture(&mut self) -> Option<JoinHandle<()>> {
        let environment = Arc::clone(&self.environment);
        if environment.is_picture_in_picture() {
            self.dispatch(AsyncIntent::ExitPictureInPicture, async move {
                environment.exit_picture_in_picture().await
            })
        } else {
            self.dispatch(AsyncIntent::EnterPictureInPicture, async move {
                environment.request_picture_in_picture().await
            })
        }
    }

    /// Run an async request and post its outcome back tagged with the
    /// generation it was issued under
    fn dispatch<F>(&self, intent: AsyncIntent, request: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(%intent, "No async runtime, request dropped");
                return None;
            }
        };

        let sink = SignalSink::new(Origin::Binding(self.generation), self.signal_tx.clone());
        debug!(%intent, generation = %self.generation, "Dispatching request");
        Some(runtime.spawn(async move {
            let result = request.await.map_err(|e| e.to_string());
            sink.emit(Signal::IntentSettled { intent, result });
        }))
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(scope) = self.scope.take() {
            scope.release(self.element.as_mut());
        }
        self.element.unsubscribe(self.element_listener);
        self.environment.remove_fullscreen_listener(self.fullscreen_listener);
    }
}

/// NaN (or negative) means metadata is not known yet
fn known_duration(duration: f64) -> Option<f64> {
    if duration.is_nan() || duration < 0.0 {
        None
    } else {
        Some(duration)
    }
}
