//! Display formatting for playback positions

/// Format elapsed seconds for display.
///
/// `M:SS` below one hour, `H:MM:SS` from one hour up. Fractions are
/// truncated. NaN, infinite and negative inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Parse a display string produced by [`format_time`] back into seconds.
///
/// Accepts `M:SS`, `MM:SS` and `H:MM:SS`. Returns `None` for anything else.
pub fn parse_time(display: &str) -> Option<f64> {
    let parts: Vec<&str> = display.trim().split(':').collect();

    let fields: Vec<u64> = parts
        .iter()
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                p.parse().ok()
            }
        })
        .collect::<Option<_>>()?;

    let (hours, minutes, seconds) = match fields.as_slice() {
        [m, s] => (0, *m, *s),
        [h, m, s] if *m < 60 => (*h, *m, *s),
        _ => return None,
    };

    if seconds >= 60 {
        return None;
    }

    Some((hours * 3600 + minutes * 60 + seconds) as f64)
}
