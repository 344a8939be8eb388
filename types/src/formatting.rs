//! Centralized label formatting.
//!
//! Every user-visible string the engine writes into the host document goes
//! through this module so the badge, the toggle control and the CLI report
//! agree on wording.

use crate::WatchSignal;

/// Text of the toggle control when watched cards are hidden.
pub const LABEL_HIDDEN: &str = "Watched: hidden";

/// Text of the toggle control when watched cards are dimmed.
pub const LABEL_DIMMED: &str = "Watched: dimmed";

/// Base text of the dimmed-card badge.
pub const BADGE_TEXT: &str = "Watched";

/// Format a ratio in `[0, 1]` as a whole percentage.
///
/// # Examples
/// ```
/// use seen_types::formatting::format_pct;
/// assert_eq!(format_pct(0.85), "85%");
/// assert_eq!(format_pct(1.0), "100%");
/// assert_eq!(format_pct(0.004), "0%");
/// ```
pub fn format_pct(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Label of the toggle control for the given mode.
///
/// # Examples
/// ```
/// use seen_types::formatting::toggle_label;
/// assert_eq!(toggle_label(true), "Watched: hidden");
/// assert_eq!(toggle_label(false), "Watched: dimmed");
/// ```
pub fn toggle_label(enabled: bool) -> &'static str {
    if enabled { LABEL_HIDDEN } else { LABEL_DIMMED }
}

/// Tooltip of the toggle control.
///
/// # Examples
/// ```
/// use seen_types::formatting::threshold_title;
/// assert_eq!(threshold_title(0.8), "Threshold 80%");
/// ```
pub fn threshold_title(threshold: f64) -> String {
    format!("Threshold {}", format_pct(threshold))
}

/// Badge text for a watched card.
///
/// A measured ratio is appended; a presence-only signal shows the bare text.
///
/// # Examples
/// ```
/// use seen_types::WatchSignal;
/// use seen_types::formatting::badge_label;
/// assert_eq!(badge_label(&WatchSignal::Ratio(0.85)), "Watched · 85%");
/// assert_eq!(badge_label(&WatchSignal::SeenMarker), "Watched");
/// ```
pub fn badge_label(signal: &WatchSignal) -> String {
    match signal {
        WatchSignal::Ratio(r) => format!("{} · {}", BADGE_TEXT, format_pct(*r)),
        WatchSignal::SeenMarker | WatchSignal::Unknown => BADGE_TEXT.to_string(),
    }
}

/// Short description of a signal for reports and logs.
///
/// # Examples
/// ```
/// use seen_types::WatchSignal;
/// use seen_types::formatting::describe_signal;
/// assert_eq!(describe_signal(&WatchSignal::Ratio(0.3)), "30%");
/// assert_eq!(describe_signal(&WatchSignal::SeenMarker), "seen");
/// assert_eq!(describe_signal(&WatchSignal::Unknown), "-");
/// ```
pub fn describe_signal(signal: &WatchSignal) -> String {
    match signal {
        WatchSignal::Ratio(r) => format_pct(*r),
        WatchSignal::SeenMarker => "seen".to_string(),
        WatchSignal::Unknown => "-".to_string(),
    }
}

/// Truncate a string to `max_chars`, adding "..." if truncated.
///
/// # Examples
/// ```
/// use seen_types::formatting::truncate;
/// assert_eq!(truncate("short", 10), "short");
/// assert_eq!(truncate("this is a very long title", 10), "this is...");
/// ```
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
