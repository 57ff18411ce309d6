//! In-memory host for headless runs and tests
//!
//! Implements the element, engine and environment seams with shared state
//! behind handles, so a driver can both hand the objects to a controller and
//! keep poking at them (advance time, inject engine failures, inspect calls).

use crate::{
    config::EngineConfig,
    element::{Environment, ListenerId, MediaElement, MediaErrorCode, MediaEvent},
    engine::{AdaptiveEngine, EngineError, EngineEvent, EngineFactory},
    events::{Signal, SignalSink},
    types::TimeRange,
    Error, Result,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Seconds of data the simulated element keeps buffered ahead
const BUFFER_AHEAD_SECS: f64 = 10.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Element
// =============================================================================

#[derive(Debug)]
struct ElementState {
    src: Option<String>,
    current_time: f64,
    duration: f64,
    buffered: Vec<TimeRange>,
    volume: f64,
    muted: bool,
    paused: bool,
    reject_play: bool,
    native_types: Vec<String>,
    listeners: Vec<(ListenerId, SignalSink)>,
    sinks_seen: Vec<SignalSink>,
    next_listener: u64,
    source_assignments: usize,
    clears: usize,
}

impl ElementState {
    fn emit(&self, event: MediaEvent) {
        for (_, sink) in &self.listeners {
            sink.media(event);
        }
    }

    fn reset_media(&mut self) {
        self.current_time = 0.0;
        self.duration = f64::NAN;
        self.buffered.clear();
        self.paused = true;
    }
}

/// Simulated native element
pub struct SimulatedElement {
    inner: Arc<Mutex<ElementState>>,
}

/// Driver-side handle sharing state with a [`SimulatedElement`]
#[derive(Clone)]
pub struct SimElementHandle {
    inner: Arc<Mutex<ElementState>>,
}

impl SimulatedElement {
    pub fn new() -> Self {
        Self::with_native_types(&[])
    }

    /// Element that natively plays the given MIME types
    pub fn with_native_types(types: &[&str]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ElementState {
                src: None,
                current_time: 0.0,
                duration: f64::NAN,
                buffered: Vec::new(),
                volume: 1.0,
                muted: false,
                paused: true,
                reject_play: false,
                native_types: types.iter().map(|t| t.to_string()).collect(),
                listeners: Vec::new(),
                sinks_seen: Vec::new(),
                next_listener: 0,
                source_assignments: 0,
                clears: 0,
            })),
        }
    }

    pub fn handle(&self) -> SimElementHandle {
        SimElementHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SimulatedElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for SimulatedElement {
    fn subscribe(&mut self, sink: SignalSink) -> ListenerId {
        let mut state = lock(&self.inner);
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.sinks_seen.push(sink.clone());
        state.listeners.push((id, sink));
        id
    }

    fn unsubscribe(&mut self, id: ListenerId) {
        lock(&self.inner).listeners.retain(|(listener, _)| *listener != id);
    }

    fn set_source(&mut self, url: &str) {
        let mut state = lock(&self.inner);
        state.src = Some(url.to_string());
        state.source_assignments += 1;
        state.reset_media();
    }

    fn clear_source(&mut self) {
        let mut state = lock(&self.inner);
        state.src = None;
        state.clears += 1;
        state.reset_media();
    }

    fn can_play_type(&self, mime: &str) -> bool {
        lock(&self.inner).native_types.iter().any(|t| t == mime)
    }

    fn play(&mut self) -> Result<()> {
        let mut state = lock(&self.inner);
        if state.src.is_none() {
            return Err(Error::PlaybackRejected("no source".to_string()));
        }
        if state.reject_play {
            return Err(Error::PlaybackRejected("autoplay blocked".to_string()));
        }
        if state.paused {
            state.paused = false;
            state.emit(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = lock(&self.inner);
        if !state.paused {
            state.paused = true;
            state.emit(MediaEvent::Pause);
        }
    }

    fn current_time(&self) -> f64 {
        lock(&self.inner).current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut state = lock(&self.inner);
        let upper = if state.duration.is_nan() { f64::INFINITY } else { state.duration };
        state.current_time = seconds.clamp(0.0, upper);
        state.emit(MediaEvent::Seeked);
        state.emit(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> f64 {
        lock(&self.inner).duration
    }

    fn buffered(&self) -> Vec<TimeRange> {
        lock(&self.inner).buffered.clone()
    }

    fn volume(&self) -> f64 {
        lock(&self.inner).volume
    }

    fn set_volume(&mut self, volume: f64) {
        let mut state = lock(&self.inner);
        let volume = volume.clamp(0.0, 1.0);
        if state.volume != volume {
            state.volume = volume;
            state.emit(MediaEvent::VolumeChange);
        }
    }

    fn muted(&self) -> bool {
        lock(&self.inner).muted
    }

    fn set_muted(&mut self, muted: bool) {
        let mut state = lock(&self.inner);
        if state.muted != muted {
            state.muted = muted;
            state.emit(MediaEvent::VolumeChange);
        }
    }
}

impl SimElementHandle {
    pub fn src(&self) -> Option<String> {
        lock(&self.inner).src.clone()
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.inner).paused
    }

    pub fn current_time(&self) -> f64 {
        lock(&self.inner).current_time
    }

    pub fn volume(&self) -> f64 {
        lock(&self.inner).volume
    }

    pub fn muted(&self) -> bool {
        lock(&self.inner).muted
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Direct source assignments, including those made by engines
    pub fn source_assignments(&self) -> usize {
        lock(&self.inner).source_assignments
    }

    pub fn clears(&self) -> usize {
        lock(&self.inner).clears
    }

    /// Every sink ever subscribed, oldest first
    pub fn sinks_seen(&self) -> Vec<SignalSink> {
        lock(&self.inner).sinks_seen.clone()
    }

    pub fn set_reject_play(&self, reject: bool) {
        lock(&self.inner).reject_play = reject;
    }

    /// Report metadata with the given duration
    pub fn load_metadata(&self, duration: f64) {
        let mut state = lock(&self.inner);
        state.duration = duration;
        state.emit(MediaEvent::DurationChange);
        state.emit(MediaEvent::LoadedMetadata);
    }

    /// Advance playback while playing; pauses at the end like a real element
    pub fn advance(&self, seconds: f64) {
        let mut state = lock(&self.inner);
        if state.paused {
            return;
        }
        let upper = if state.duration.is_nan() { f64::INFINITY } else { state.duration };
        state.current_time = (state.current_time + seconds).min(upper);
        let buffered_to = (state.current_time + BUFFER_AHEAD_SECS).min(upper);
        state.buffered = vec![TimeRange::new(0.0, buffered_to)];
        state.emit(MediaEvent::TimeUpdate);
        state.emit(MediaEvent::Progress);
        if state.current_time >= upper {
            state.paused = true;
            state.emit(MediaEvent::Pause);
        }
    }

    /// Replace the buffered ranges and report progress
    pub fn set_buffered(&self, ranges: Vec<TimeRange>) {
        let mut state = lock(&self.inner);
        state.buffered = ranges;
        state.emit(MediaEvent::Progress);
    }

    /// Volume change made outside the controller (OS mixer, keyboard)
    pub fn set_external_volume(&self, volume: f64, muted: bool) {
        let mut state = lock(&self.inner);
        state.volume = volume.clamp(0.0, 1.0);
        state.muted = muted;
        state.emit(MediaEvent::VolumeChange);
    }

    pub fn fail(&self, code: MediaErrorCode) {
        lock(&self.inner).emit(MediaEvent::Error { code });
    }

    /// Emit an arbitrary event to the current listeners
    pub fn emit(&self, event: MediaEvent) {
        lock(&self.inner).emit(event);
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Calls observed on one simulated engine
#[derive(Debug, Clone, Default)]
pub struct SimEngineRecord {
    pub config: EngineConfig,
    pub url: Option<String>,
    pub attached: bool,
    pub start_loads: u32,
    pub media_recoveries: u32,
    pub destroy_calls: u32,
    sink: Option<SignalSink>,
}

#[derive(Debug)]
struct FactoryState {
    supported: bool,
    fail_create: bool,
    manifest_levels: usize,
    engines: Vec<SimEngineRecord>,
}

/// Engine factory recording every engine it creates
#[derive(Clone)]
pub struct SimulatedEngineFactory {
    inner: Arc<Mutex<FactoryState>>,
}

impl SimulatedEngineFactory {
    pub fn new() -> Self {
        Self::with_support(true, false)
    }

    /// Runtime-support check fails
    pub fn unsupported() -> Self {
        Self::with_support(false, false)
    }

    /// Support check passes but construction fails
    pub fn failing() -> Self {
        Self::with_support(true, true)
    }

    fn with_support(supported: bool, fail_create: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FactoryState {
                supported,
                fail_create,
                manifest_levels: 3,
                engines: Vec::new(),
            })),
        }
    }

    pub fn created(&self) -> usize {
        lock(&self.inner).engines.len()
    }

    pub fn engine(&self, index: usize) -> Option<SimEngineRecord> {
        lock(&self.inner).engines.get(index).cloned()
    }

    /// Index of the most recently created engine
    pub fn latest(&self) -> Option<usize> {
        self.created().checked_sub(1)
    }

    /// Post an engine error through the given engine's sink
    pub fn inject_error(&self, index: usize, error: EngineError) -> bool {
        self.post(index, EngineEvent::Error(error))
    }

    pub fn post(&self, index: usize, event: EngineEvent) -> bool {
        let sink = lock(&self.inner)
            .engines
            .get(index)
            .and_then(|e| e.sink.clone());
        sink.map(|s| s.engine(event)).unwrap_or(false)
    }
}

impl Default for SimulatedEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for SimulatedEngineFactory {
    fn is_supported(&self) -> bool {
        lock(&self.inner).supported
    }

    fn create(&self, config: &EngineConfig, sink: SignalSink) -> Result<Box<dyn AdaptiveEngine>> {
        let mut state = lock(&self.inner);
        if state.fail_create {
            return Err(Error::EngineCreate("simulated construction failure".to_string()));
        }
        let origin = sink.origin();
        state.engines.push(SimEngineRecord {
            config: config.clone(),
            sink: Some(sink),
            ..Default::default()
        });
        let index = state.engines.len() - 1;
        debug!(index, ?origin, "Simulated engine created");
        Ok(Box::new(SimulatedEngine {
            index,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct SimulatedEngine {
    index: usize,
    inner: Arc<Mutex<FactoryState>>,
}

impl SimulatedEngine {
    fn with_record<R>(&self, f: impl FnOnce(&mut SimEngineRecord) -> R) -> Option<R> {
        lock(&self.inner).engines.get_mut(self.index).map(f)
    }
}

impl AdaptiveEngine for SimulatedEngine {
    fn load_source(&mut self, url: &str) {
        self.with_record(|r| r.url = Some(url.to_string()));
    }

    fn attach_media(&mut self, element: &mut dyn MediaElement) {
        let levels = lock(&self.inner).manifest_levels;
        let attached = self.with_record(|r| {
            r.attached = true;
            (r.url.clone(), r.sink.clone())
        });
        if let Some((url, sink)) = attached {
            if let Some(url) = url {
                element.set_source(&format!("blob:marquee/{}", url));
            }
            if let Some(sink) = sink {
                sink.engine(EngineEvent::ManifestParsed { levels });
            }
        }
    }

    fn start_load(&mut self) {
        self.with_record(|r| r.start_loads += 1);
    }

    fn recover_media_error(&mut self) {
        self.with_record(|r| r.media_recoveries += 1);
    }

    fn destroy(&mut self) {
        self.with_record(|r| r.destroy_calls += 1);
    }
}

// =============================================================================
// Environment
// =============================================================================

#[derive(Debug, Default)]
struct EnvironmentState {
    fullscreen: bool,
    picture_in_picture: bool,
    deny_fullscreen: bool,
    deny_picture_in_picture: bool,
    listeners: Vec<(ListenerId, SignalSink)>,
    next_listener: u64,
}

impl EnvironmentState {
    fn notify_fullscreen(&self) {
        for (_, sink) in &self.listeners {
            sink.emit(Signal::FullscreenChanged);
        }
    }
}

/// Simulated document: fullscreen and picture-in-picture
#[derive(Clone, Default)]
pub struct SimulatedEnvironment {
    inner: Arc<Mutex<EnvironmentState>>,
}

impl SimulatedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_fullscreen(&self, deny: bool) {
        lock(&self.inner).deny_fullscreen = deny;
    }

    pub fn deny_picture_in_picture(&self, deny: bool) {
        lock(&self.inner).deny_picture_in_picture = deny;
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// User left fullscreen without going through the controller
    pub fn user_exit_fullscreen(&self) {
        let mut state = lock(&self.inner);
        state.fullscreen = false;
        state.notify_fullscreen();
    }
}

#[async_trait]
impl Environment for SimulatedEnvironment {
    fn is_fullscreen(&self) -> bool {
        lock(&self.inner).fullscreen
    }

    async fn request_fullscreen(&self) -> Result<()> {
        let mut state = lock(&self.inner);
        if state.deny_fullscreen {
            return Err(Error::environment("fullscreen request denied"));
        }
        if !state.fullscreen {
            state.fullscreen = true;
            state.notify_fullscreen();
        }
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<()> {
        let mut state = lock(&self.inner);
        if state.fullscreen {
            state.fullscreen = false;
            state.notify_fullscreen();
        }
        Ok(())
    }

    fn on_fullscreen_change(&self, sink: SignalSink) -> ListenerId {
        let mut state = lock(&self.inner);
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state.listeners.push((id, sink));
        id
    }

    fn remove_fullscreen_listener(&self, id: ListenerId) {
        lock(&self.inner).listeners.retain(|(listener, _)| *listener != id);
    }

    fn is_picture_in_picture(&self) -> bool {
        lock(&self.inner).picture_in_picture
    }

    async fn request_picture_in_picture(&self) -> Result<()> {
        let mut state = lock(&self.inner);
        if state.deny_picture_in_picture {
            return Err(Error::environment("picture-in-picture not supported"));
        }
        state.picture_in_picture = true;
        Ok(())
    }

    async fn exit_picture_in_picture(&self) -> Result<()> {
        lock(&self.inner).picture_in_picture = false;
        Ok(())
    }
}
