//! Shared types for seen
//!
//! Plain data shared between the engine and its front ends: persisted
//! settings, the per-card watch signal and visual state, and the label
//! formatting used by the badge and the toggle control.

pub mod formatting;
mod settings;
mod state;

pub use settings::{
    DEFAULT_GRID_COLUMNS, DEFAULT_THRESHOLD, GRID_COLUMNS_RANGE, Settings,
};
pub use state::{VisualState, WatchSignal};
