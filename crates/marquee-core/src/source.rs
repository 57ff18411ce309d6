//! Source classification
//!
//! Decides whether a source is played through the adaptive engine
//! (segmented manifest) or assigned straight to the element (progressive).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

/// Manifest suffixes that select segmented playback
const SEGMENTED_SUFFIXES: &[&str] = &[".m3u8", ".m3u"];

/// Query parameter carrying the source URL on a hosting page
pub const DEFAULT_SOURCE_PARAM: &str = "video";

/// Concrete playback strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStrategy {
    /// Adaptive-bitrate manifest played through the engine
    Segmented,
    /// Single media file assigned directly to the element
    Progressive,
}

impl std::fmt::Display for PlaybackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStrategy::Segmented => write!(f, "segmented"),
            PlaybackStrategy::Progressive => write!(f, "progressive"),
        }
    }
}

/// Caller-supplied type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHint {
    Segmented,
    Progressive,
    #[default]
    Auto,
}

impl SourceHint {
    /// The strategy this hint forces, if any
    pub fn strategy(&self) -> Option<PlaybackStrategy> {
        match self {
            SourceHint::Segmented => Some(PlaybackStrategy::Segmented),
            SourceHint::Progressive => Some(PlaybackStrategy::Progressive),
            SourceHint::Auto => None,
        }
    }
}

impl FromStr for SourceHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "segmented" | "hls" => Ok(SourceHint::Segmented),
            "progressive" | "mp4" => Ok(SourceHint::Progressive),
            "auto" | "" => Ok(SourceHint::Auto),
            other => Err(Error::InvalidSource(format!("unknown source hint '{}'", other))),
        }
    }
}

/// A source value; immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSource {
    pub url: String,
    pub hint: SourceHint,
}

impl PlaybackSource {
    pub fn new(url: impl Into<String>, hint: SourceHint) -> Self {
        Self {
            url: url.into(),
            hint,
        }
    }

    pub fn auto(url: impl Into<String>) -> Self {
        Self::new(url, SourceHint::Auto)
    }

    pub fn strategy(&self) -> PlaybackStrategy {
        classify(&self.url, self.hint)
    }
}

/// Classify a source URL.
///
/// An explicit hint always wins. Otherwise a manifest suffix on the URL path
/// (query and fragment ignored, case-insensitive) selects segmented playback.
pub fn classify(url: &str, hint: SourceHint) -> PlaybackStrategy {
    if let Some(strategy) = hint.strategy() {
        return strategy;
    }

    if has_manifest_suffix(url) {
        PlaybackStrategy::Segmented
    } else {
        PlaybackStrategy::Progressive
    }
}

fn has_manifest_suffix(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        // Relative or malformed: strip query and fragment by hand
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };

    SEGMENTED_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Read a source URL from a hosting page's query string.
///
/// Returns the percent-decoded value of `param`, or `None` when the page URL
/// does not parse or the parameter is missing or empty.
pub fn source_from_query(page_url: &str, param: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == param)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_segmented() {
        assert_eq!(
            classify("https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8", SourceHint::Auto),
            PlaybackStrategy::Segmented
        );
        assert_eq!(classify("stream.m3u8", SourceHint::Auto), PlaybackStrategy::Segmented);
        assert_eq!(classify("LIVE/INDEX.M3U8", SourceHint::Auto), PlaybackStrategy::Segmented);
    }

    #[test]
    fn test_detect_segmented_with_query() {
        assert_eq!(
            classify("https://cdn.example.com/master.m3u8?token=abc#t=10", SourceHint::Auto),
            PlaybackStrategy::Segmented
        );
        assert_eq!(classify("master.m3u8?token=abc", SourceHint::Auto), PlaybackStrategy::Segmented);
    }

    #[test]
    fn test_detect_progressive() {
        assert_eq!(classify("clip.mp4", SourceHint::Auto), PlaybackStrategy::Progressive);
        assert_eq!(
            classify("https://cdn.example.com/video.webm?src=list.m3u8", SourceHint::Auto),
            PlaybackStrategy::Progressive
        );
        assert_eq!(classify("", SourceHint::Auto), PlaybackStrategy::Progressive);
    }

    #[test]
    fn test_manifest_name_in_query_is_not_segmented() {
        assert_eq!(classify("video.webm?src=list.m3u8", SourceHint::Auto), PlaybackStrategy::Progressive);
        assert_eq!(classify("/media/clip.mp4#list.m3u8", SourceHint::Auto), PlaybackStrategy::Progressive);
    }

    #[test]
    fn test_hint_wins() {
        for url in ["clip.mp4", "stream.m3u8", "", "not a url at all"] {
            assert_eq!(classify(url, SourceHint::Segmented), PlaybackStrategy::Segmented);
            assert_eq!(classify(url, SourceHint::Progressive), PlaybackStrategy::Progressive);
        }
    }

    #[test]
    fn test_classify_is_stable() {
        let source = PlaybackSource::auto("https://example.com/a.m3u8");
        assert_eq!(source.strategy(), source.strategy());
    }

    #[test]
    fn test_hint_from_str() {
        assert_eq!("hls".parse::<SourceHint>().unwrap(), SourceHint::Segmented);
        assert_eq!("MP4".parse::<SourceHint>().unwrap(), SourceHint::Progressive);
        assert_eq!("auto".parse::<SourceHint>().unwrap(), SourceHint::Auto);
        assert!("dash".parse::<SourceHint>().is_err());
    }

    #[test]
    fn test_source_from_query() {
        let page = "https://player.example.com/?video=https%3A%2F%2Fcdn.example.com%2Fa.m3u8";
        assert_eq!(
            source_from_query(page, DEFAULT_SOURCE_PARAM).as_deref(),
            Some("https://cdn.example.com/a.m3u8")
        );
        assert_eq!(source_from_query("https://player.example.com/", "video"), None);
        assert_eq!(source_from_query("https://player.example.com/?video=", "video"), None);
        assert_eq!(source_from_query("not a url", "video"), None);
    }
}
