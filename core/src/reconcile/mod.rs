//! State reconciliation
//!
//! Maps a card's watch signal onto one [`VisualState`] and makes the card's
//! target element show exactly that state.
//!
//! The marker attribute is the single source of truth for what a previous
//! pass applied. Switching states first removes precisely what the recorded
//! state implies, then installs the new one. Re-applying the recorded state
//! only repairs pieces the host may have stripped, so a steady page sees no
//! writes at all.


use seen_types::formatting::badge_label;
use seen_types::{Settings, VisualState, WatchSignal};

use crate::dom::{Compound, DomError, Inspect, Mutate, NodeId, Selector};
use crate::selectors::HostSelectors;

/// Attribute recording the applied state on the target element.
pub const MARKER_ATTR: &str = "data-seen-state";

pub const HIDDEN_CLASS: &str = "seen-hidden";
pub const DIMMED_CLASS: &str = "seen-dimmed";
pub const BADGE_CLASS: &str = "seen-badge";

/// Marks the generated badge node.
pub const BADGE_ATTR: &str = "data-seen-badge";

/// Marks a thumbnail whose `position` was set by the engine. The value is the
/// declaration it replaced (`static`), or empty when there was none.
pub const ANCHOR_ATTR: &str = "data-seen-anchor";

/// Decision rule: watched cards are hidden in hide mode and dimmed otherwise.
pub fn decide(signal: &WatchSignal, settings: &Settings) -> VisualState {
    if !signal.is_watched(settings.threshold) {
        VisualState::Normal
    } else if settings.enabled {
        VisualState::Hidden
    } else {
        VisualState::Dimmed
    }
}

/// Element that receives the presentation markers for `card`.
///
/// The nearest grid-item ancestor (or the card itself when it is one), so
/// host wrappers and padding disappear along with the card.
pub fn target_of(doc: &dyn Inspect, selectors: &HostSelectors, card: NodeId) -> NodeId {
    doc.closest(card, &selectors.grid_item).unwrap_or(card)
}

/// What the marker attribute says about the target.
#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    Nothing,
    State(VisualState),
    /// A marker value this version does not know; clear every marker kind.
    Foreign,
}

fn recorded(doc: &dyn Inspect, target: NodeId) -> Recorded {
    match doc.attribute(target, MARKER_ATTR) {
        None => Recorded::Nothing,
        Some(marker) => VisualState::from_marker(marker).map_or(Recorded::Foreign, Recorded::State),
    }
}

/// Decide and apply the state for one card.
///
/// Fails only when a node vanished mid-apply; callers skip the card for this
/// pass and it is re-evaluated on the next one.
pub fn reconcile<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    card: NodeId,
    signal: &WatchSignal,
    settings: &Settings,
) -> Result<VisualState, DomError> {
    if !doc.contains(card) {
        return Err(DomError::NodeMissing(card));
    }
    let target = target_of(&*doc, selectors, card);
    let state = decide(signal, settings);

    match recorded(&*doc, target) {
        Recorded::State(current) if current == state => {
            install(doc, selectors, card, target, state, signal)?;
        }
        Recorded::Nothing if state == VisualState::Normal => {}
        previous => {
            clear(doc, target, &previous)?;
            install(doc, selectors, card, target, state, signal)?;
            tracing::trace!(%card, %target, ?previous, %state, "Card state changed");
        }
    }
    Ok(state)
}

/// Remove exactly the markers the recorded state implies.
fn clear<D: Mutate>(doc: &mut D, target: NodeId, recorded: &Recorded) -> Result<(), DomError> {
    let (hidden, dimmed) = match recorded {
        Recorded::Nothing => (false, false),
        Recorded::State(VisualState::Normal) => (false, false),
        Recorded::State(VisualState::Hidden) => (true, false),
        Recorded::State(VisualState::Dimmed) => (false, true),
        Recorded::Foreign => (true, true),
    };
    if hidden {
        doc.remove_class(target, HIDDEN_CLASS)?;
    }
    if dimmed {
        doc.remove_class(target, DIMMED_CLASS)?;
        for badge in doc.query_all(target, &badge_selector()) {
            doc.remove_node(badge)?;
        }
        for anchor in doc.query_all_inclusive(target, &anchor_selector()) {
            let prior = doc
                .attribute(anchor, ANCHOR_ATTR)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            doc.set_style_property(anchor, "position", prior.as_deref())?;
            doc.remove_attribute(anchor, ANCHOR_ATTR)?;
        }
    }
    doc.remove_attribute(target, MARKER_ATTR)?;
    Ok(())
}

/// Install the markers of `state`, writing only what is missing.
fn install<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    card: NodeId,
    target: NodeId,
    state: VisualState,
    signal: &WatchSignal,
) -> Result<(), DomError> {
    match state {
        VisualState::Normal => return Ok(()),
        VisualState::Hidden => {
            doc.add_class(target, HIDDEN_CLASS)?;
        }
        VisualState::Dimmed => {
            doc.add_class(target, DIMMED_CLASS)?;
            ensure_badge(doc, selectors, card, target, signal)?;
        }
    }
    if let Some(marker) = state.marker() {
        doc.set_attribute(target, MARKER_ATTR, marker)?;
    }
    Ok(())
}

/// Exactly one badge inside the thumbnail region, on a positioned ancestor.
fn ensure_badge<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    card: NodeId,
    target: NodeId,
    signal: &WatchSignal,
) -> Result<(), DomError> {
    let thumbnail = doc.query(card, &selectors.thumbnail).unwrap_or(card);

    let position = doc.inline_style(thumbnail, "position");
    if position.as_deref().is_none_or(|p| p.eq_ignore_ascii_case("static")) {
        // The anchor remembers the declaration it replaced, empty for none.
        if doc.attribute(thumbnail, ANCHOR_ATTR).is_none() {
            doc.set_attribute(thumbnail, ANCHOR_ATTR, position.as_deref().unwrap_or_default())?;
        }
        doc.set_style_property(thumbnail, "position", Some("relative"))?;
    }

    let mut badges = doc.query_all(target, &badge_selector()).into_iter();
    let badge = match badges.next() {
        Some(existing) if doc.parent(existing) == Some(thumbnail) => existing,
        Some(misplaced) => {
            // The thumbnail was re-rendered elsewhere; start over.
            doc.remove_node(misplaced)?;
            new_badge(doc, thumbnail)?
        }
        None => new_badge(doc, thumbnail)?,
    };
    for extra in badges {
        doc.remove_node(extra)?;
    }
    doc.set_text(badge, &badge_label(signal))?;
    Ok(())
}

fn new_badge<D: Mutate>(doc: &mut D, thumbnail: NodeId) -> Result<NodeId, DomError> {
    let badge = doc.append_element(thumbnail, "div")?;
    doc.set_attribute(badge, "class", BADGE_CLASS)?;
    doc.set_attribute(badge, BADGE_ATTR, "")?;
    Ok(badge)
}

fn badge_selector() -> Selector {
    Compound::any().with_attr(BADGE_ATTR).into()
}

fn anchor_selector() -> Selector {
    Compound::any().with_attr(ANCHOR_ATTR).into()
}
