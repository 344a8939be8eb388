//! User settings as persisted by the settings store.
//!
//! Every field deserializes on its own: a missing or malformed value falls
//! back to that field's default without discarding the rest of the record.

use std::ops::RangeInclusive;

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum progress ratio at which a card counts as watched.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Grid column count used by the layout rule when nothing is stored.
pub const DEFAULT_GRID_COLUMNS: u8 = 4;

/// Accepted grid column counts.
pub const GRID_COLUMNS_RANGE: RangeInclusive<u8> = 4..=8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// `true` hides watched cards, `false` dims them.
    #[serde(deserialize_with = "lenient_enabled")]
    pub enabled: bool,

    /// Inclusive ratio in `[0, 1]`.
    #[serde(deserialize_with = "lenient_threshold")]
    pub threshold: f64,

    /// Only consumed by the stylesheet.
    #[serde(deserialize_with = "lenient_grid_columns")]
    pub grid_columns: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: DEFAULT_THRESHOLD,
            grid_columns: DEFAULT_GRID_COLUMNS,
        }
    }
}

impl Settings {
    /// Copy with `enabled` inverted.
    pub fn toggled(self) -> Self {
        Self {
            enabled: !self.enabled,
            ..self
        }
    }

    /// Copy with a new threshold, clamped into `[0, 1]`.
    ///
    /// Non-finite input keeps the default threshold.
    pub fn with_threshold(self, threshold: f64) -> Self {
        Self {
            threshold: normalize_threshold(threshold),
            ..self
        }
    }

    /// Copy with a new grid column count, clamped into [`GRID_COLUMNS_RANGE`].
    pub fn with_grid_columns(self, columns: i64) -> Self {
        Self {
            grid_columns: normalize_grid_columns(columns),
            ..self
        }
    }

    /// Re-apply every range rule, e.g. after a struct literal built in code.
    pub fn normalized(self) -> Self {
        Self {
            enabled: self.enabled,
            threshold: normalize_threshold(self.threshold),
            grid_columns: normalize_grid_columns(i64::from(self.grid_columns)),
        }
    }
}

fn normalize_threshold(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        DEFAULT_THRESHOLD
    }
}

fn normalize_grid_columns(value: i64) -> u8 {
    let min = i64::from(*GRID_COLUMNS_RANGE.start());
    let max = i64::from(*GRID_COLUMNS_RANGE.end());
    // Clamped into 4..=8, so the narrowing cast cannot truncate.
    value.clamp(min, max) as u8
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient field decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Whatever shape a stored value happens to have.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Int(n) => Some(*n as f64),
            Loose::Float(f) => Some(*f),
            Loose::Text(s) => s.trim().parse::<f64>().ok(),
            Loose::Bool(_) | Loose::Other(_) => None,
        }
    }
}

fn lenient_enabled<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let value = match Loose::deserialize(de)? {
        Loose::Bool(b) => b,
        Loose::Int(n) => n != 0,
        Loose::Float(f) => f != 0.0 && !f.is_nan(),
        Loose::Text(s) => s.trim().parse::<bool>().unwrap_or(false),
        Loose::Other(_) => false,
    };
    Ok(value)
}

fn lenient_threshold<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = Loose::deserialize(de)?
        .as_f64()
        .map(normalize_threshold)
        .unwrap_or(DEFAULT_THRESHOLD);
    Ok(value)
}

fn lenient_grid_columns<'de, D: Deserializer<'de>>(de: D) -> Result<u8, D::Error> {
    let value = Loose::deserialize(de)?
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| normalize_grid_columns(f.round() as i64))
        .unwrap_or(DEFAULT_GRID_COLUMNS);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.threshold, 0.8);
        assert_eq!(settings.grid_columns, 4);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = Settings {
            enabled: true,
            threshold: 0.65,
            grid_columns: 6,
        };
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("gridColumns = 6"));
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_malformed_field_keeps_other_fields() {
        let toml = r#"
enabled = true
threshold = "not a number"
gridColumns = 7
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.threshold, DEFAULT_THRESHOLD);
        assert_eq!(settings.grid_columns, 7);
    }

    #[test]
    fn test_numeric_string_threshold_is_accepted() {
        let settings: Settings = toml::from_str(r#"threshold = "0.5""#).unwrap();
        assert_eq!(settings.threshold, 0.5);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let toml = r#"
threshold = 1.7
gridColumns = 12
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.threshold, 1.0);
        assert_eq!(settings.grid_columns, 8);

        let settings: Settings = toml::from_str("threshold = -3\ngridColumns = 1").unwrap();
        assert_eq!(settings.threshold, 0.0);
        assert_eq!(settings.grid_columns, 4);
    }

    #[test]
    fn test_wrong_type_enabled_defaults_to_false() {
        let settings: Settings = toml::from_str("enabled = [1, 2]").unwrap();
        assert!(!settings.enabled);

        let settings: Settings = toml::from_str(r#"enabled = "true""#).unwrap();
        assert!(settings.enabled);
    }

    #[test]
    fn test_builders_clamp() {
        let settings = Settings::default().with_threshold(f64::NAN);
        assert_eq!(settings.threshold, DEFAULT_THRESHOLD);
        assert_eq!(Settings::default().with_threshold(2.0).threshold, 1.0);
        assert_eq!(Settings::default().with_grid_columns(100).grid_columns, 8);
        assert!(Settings::default().toggled().enabled);
    }

    #[test]
    fn test_normalized() {
        let raw = Settings {
            enabled: true,
            threshold: -0.5,
            grid_columns: 0,
        };
        let settings = raw.normalized();
        assert_eq!(settings.threshold, 0.0);
        assert_eq!(settings.grid_columns, 4);
        assert!(settings.enabled);
    }
}
