use serde::{Deserialize, Serialize};

/// Consumption evidence recovered from one card.
///
/// Computed fresh on every pass and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WatchSignal {
    /// No progress affordance found.
    Unknown,
    /// Measured fraction, always within `[0, 1]`.
    Ratio(f64),
    /// A progress affordance exists but carries no readable fraction.
    SeenMarker,
}

impl WatchSignal {
    /// Build a ratio signal, clamping into `[0, 1]`.
    ///
    /// Non-finite input yields `None` so callers can move on to the next source.
    pub fn ratio(value: f64) -> Option<Self> {
        value.is_finite().then(|| Self::Ratio(value.clamp(0.0, 1.0)))
    }

    /// Whether this signal counts as watched at the given threshold.
    ///
    /// The comparison is inclusive: a ratio equal to the threshold is watched.
    pub fn is_watched(&self, threshold: f64) -> bool {
        match self {
            Self::Unknown => false,
            Self::Ratio(r) => *r >= threshold,
            Self::SeenMarker => true,
        }
    }
}

/// Presentation applied to a card's target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    Normal,
    Hidden,
    Dimmed,
}

impl VisualState {
    /// Value stored in the marker attribute. `Normal` carries no marker.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::Hidden => Some("hide"),
            Self::Dimmed => Some("dim"),
        }
    }

    /// Inverse of [`VisualState::marker`]; unknown values yield `None`.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "hide" => Some(Self::Hidden),
            "dim" => Some(Self::Dimmed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Hidden => "hidden",
            Self::Dimmed => "dimmed",
        }
    }
}

impl std::fmt::Display for VisualState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
