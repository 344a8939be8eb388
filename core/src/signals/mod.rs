//! Watch-signal extraction
//!
//! A card's consumption progress is never exposed directly; it has to be
//! recovered from whichever visual affordance the host happens to render.
//! Extraction is a fixed, ordered chain of independent sources:
//!
//! ```text
//!  progress bar  ──►  ARIA progressbar  ──►  presence marker  ──►  Unknown
//!  (transform,        ((now-min)/            (resume overlay,
//!   % width,           (max-min))             progress view,
//!   px ratio)                                 bare indicator)
//! ```
//!
//! The first source that produces a signal wins. Sources never fail: a missing
//! element or an unparseable number just hands over to the next source.

mod sources;

use seen_types::WatchSignal;

use crate::dom::{Inspect, NodeId};
use crate::selectors::HostSelectors;

pub use sources::{aria_ratio, presence_marker, progress_bar_ratio, transform_scale_x};

/// One step of the extraction chain.
pub type Source = fn(&dyn Inspect, &HostSelectors, NodeId) -> Option<WatchSignal>;

/// The chain, in strict priority order.
pub const SOURCES: [(&str, Source); 3] = [
    ("progress_bar", progress_bar_ratio),
    ("aria_progressbar", aria_ratio),
    ("presence", presence_marker),
];

/// Recover the watch signal of one card.
///
/// Pure and read-only; safe to call any number of times.
pub fn extract(doc: &dyn Inspect, selectors: &HostSelectors, card: NodeId) -> WatchSignal {
    for (name, source) in SOURCES {
        if let Some(signal) = source(doc, selectors, card) {
            tracing::trace!(%card, source = name, ?signal, "Watch signal extracted");
            return signal;
        }
    }
    WatchSignal::Unknown
}
