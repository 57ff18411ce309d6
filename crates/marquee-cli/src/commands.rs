//! CLI command implementations

use crate::output::print_output;
use marquee_core::sim::{SimulatedElement, SimulatedEngineFactory, SimulatedEnvironment};
use marquee_core::{
    classify as classify_source, config::NATIVE_HLS_MIME, format_time, EngineError,
    EngineErrorCategory, PlaybackController, PlaybackSnapshot, PlaybackStrategy, PlayerConfig,
    PlayerState, SourceHint,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Sources bundled with the demo page
const SAMPLES: &[(&str, &str)] = &[
    ("Mux test stream (HLS)", "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8"),
    (
        "Big Buck Bunny (MP4)",
        "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4",
    ),
];

/// Upper bound on one-second ticks in a simulated session
const MAX_TICKS: u64 = 600;

#[derive(Serialize)]
struct Classification<'a> {
    url: &'a str,
    hint: SourceHint,
    strategy: PlaybackStrategy,
}

impl fmt::Display for Classification<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.url, self.strategy)
    }
}

/// Classify a source URL
pub fn classify(url: &str, hint: &str, format: &str) -> anyhow::Result<()> {
    let hint: SourceHint = hint.parse()?;
    let report = Classification {
        url,
        hint,
        strategy: classify_source(url, hint),
    };
    print_output(&report, format);
    Ok(())
}

#[derive(Serialize)]
struct FormattedTime {
    seconds: f64,
    display: String,
}

impl fmt::Display for FormattedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Format a position for display
pub fn format(seconds: f64, format: &str) {
    let report = FormattedTime {
        seconds,
        display: format_time(seconds),
    };
    print_output(&report, format);
}

#[derive(Serialize)]
struct Sample {
    name: &'static str,
    url: &'static str,
    strategy: PlaybackStrategy,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<24} {:<12} {}", self.name, self.strategy, self.url)
    }
}

/// List bundled sample sources
pub fn samples(format: &str) {
    for &(name, url) in SAMPLES {
        let sample = Sample {
            name,
            url,
            strategy: classify_source(url, SourceHint::Auto),
        };
        print_output(&sample, format);
    }
}

/// Options for a simulated session
pub struct SimulateOptions {
    pub hint: String,
    pub config: Option<PathBuf>,
    pub network_failures: u32,
    pub duration: f64,
    pub no_engine: bool,
    pub native: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Step<'a> {
    step: &'a str,
    generation: u64,
    recovery_attempts: u32,
    snapshot: PlaybackSnapshot,
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.snapshot;
        let duration = s.duration.map(format_time).unwrap_or_else(|| "--:--".to_string());
        write!(
            f,
            "{:<10} {:<8} {} / {}  buffered {}  vol {:>3.0}%",
            self.step,
            s.state,
            format_time(s.current_time),
            duration,
            format_time(s.buffered_end),
            s.effective_volume() * 100.0,
        )?;
        if s.is_fullscreen {
            write!(f, "  fullscreen")?;
        }
        if self.recovery_attempts > 0 {
            write!(f, "  recoveries {}", self.recovery_attempts)?;
        }
        if let Some(error) = &s.error {
            write!(f, "  error: {}", error)?;
        }
        Ok(())
    }
}

/// Print the snapshot if the controller published a new one
fn report(
    step: &str,
    controller: &PlaybackController,
    rx: &mut watch::Receiver<PlaybackSnapshot>,
    format: &str,
) {
    if !rx.has_changed().unwrap_or(false) {
        return;
    }
    let snapshot = rx.borrow_and_update().clone();
    let record = Step {
        step,
        generation: controller.generation().0,
        recovery_attempts: controller.recovery_attempts(),
        snapshot,
    };
    print_output(&record, format);
}

/// One-second ticks needed to play `duration` to the end, capped
fn tick_limit(duration: f64) -> u64 {
    if duration.is_finite() {
        (duration.ceil() as u64).saturating_add(1).min(MAX_TICKS)
    } else {
        MAX_TICKS
    }
}

/// Run a headless playback session on the simulated host
pub async fn simulate(url: &str, options: SimulateOptions, format: &str) -> anyhow::Result<()> {
    anyhow::ensure!(options.duration > 0.0, "duration must be positive");
    let hint: SourceHint = options.hint.parse()?;

    let config = match &options.config {
        Some(path) => PlayerConfig::from_file(path)?,
        None => PlayerConfig::default(),
    };

    let element = if options.native {
        SimulatedElement::with_native_types(&[NATIVE_HLS_MIME])
    } else {
        SimulatedElement::new()
    };
    let media = element.handle();
    let factory = if options.no_engine {
        SimulatedEngineFactory::unsupported()
    } else {
        SimulatedEngineFactory::new()
    };

    let mut controller = PlaybackController::new(
        config,
        Box::new(element),
        Arc::new(SimulatedEnvironment::new()),
        Box::new(factory.clone()),
    )?;
    let mut rx = controller.subscribe();
    info!(session_id = %controller.id(), url, "Starting simulated session");

    controller.set_source(url, hint);
    report("load", &controller, &mut rx, format);
    controller.pump();
    report("attach", &controller, &mut rx, format);

    for _ in 0..options.network_failures {
        match factory.latest() {
            Some(index) if controller.has_engine_binding() => {
                factory.inject_error(
                    index,
                    EngineError::fatal(EngineErrorCategory::Network, "manifestLoadError"),
                );
            }
            _ => {
                warn!("No engine bound, network failure not injected");
                break;
            }
        }
        controller.pump();
        report("net-error", &controller, &mut rx, format);
    }

    if controller.snapshot().state == PlayerState::Errored {
        controller.stop();
        report("stop", &controller, &mut rx, format);
        return Ok(());
    }

    media.load_metadata(options.duration);
    controller.pump();
    report("metadata", &controller, &mut rx, format);

    controller.play_pause();
    controller.pump();
    report("play", &controller, &mut rx, format);

    if let Some(request) = controller.toggle_fullscreen() {
        request.await?;
        controller.pump();
        report("fullscreen", &controller, &mut rx, format);
    }

    for _ in 0..tick_limit(options.duration) {
        if media.is_paused() {
            break;
        }
        media.advance(1.0);
        controller.pump();
        report("tick", &controller, &mut rx, format);
    }

    controller.stop();
    report("stop", &controller, &mut rx, format);
    Ok(())
}
