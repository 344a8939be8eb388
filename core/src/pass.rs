//! One reconciliation pass over the whole document.
//!
//! A pass ensures the stylesheet, reconciles every card against the settings
//! it was handed, and makes sure the toggle control exists and reflects those
//! settings. Nothing inside a pass aborts it: per-card failures are skipped
//! and counted.

use std::collections::HashSet;

use seen_types::{Settings, VisualState, WatchSignal};
use serde::Serialize;

use crate::dom::{DomError, Inspect, Mutate, NodeId};
use crate::reconcile::{reconcile, target_of};
use crate::selectors::HostSelectors;
use crate::settings::SettingsRead;
use crate::signals::extract;
use crate::styles::ensure_stylesheet;
use crate::toggle::{Placement, find_control, mount_floating, mount_in_toolbar, render_control};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// First pass after start.
    Bootstrap,
    /// Quiet period elapsed after one or more triggers.
    Debounced,
    /// Immediately after a toggle.
    Toggle,
}

/// Result for one reconciled card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardReport {
    pub card: NodeId,
    pub target: NodeId,
    pub tag: String,
    pub title: String,
    pub signal: WatchSignal,
    pub state: VisualState,
}

/// Where the toggle control stands after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "node", rename_all = "snake_case")]
pub enum ControlStatus {
    /// Already present; label refreshed if needed.
    Rendered(NodeId),
    /// Created during this pass.
    Mounted(NodeId),
    /// Toolbar placement requested but the toolbar does not exist yet.
    AwaitingToolbar,
    /// The control could not be written this pass.
    Failed,
}

/// What one pass did to the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassOutput {
    pub cards: Vec<CardReport>,
    /// Cards that vanished or failed mid-apply.
    pub skipped: usize,
    pub control: ControlStatus,
}

impl PassOutput {
    pub fn count(&self, state: VisualState) -> usize {
        self.cards.iter().filter(|c| c.state == state).count()
    }
}

/// A finished pass, as published to observers of the watcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub seq: u64,
    pub kind: PassKind,
    pub settings: Settings,
    /// Set when the settings store failed and a fallback was used.
    pub settings_fault: Option<String>,
    #[serde(flatten)]
    pub output: PassOutput,
}

impl PassReport {
    pub fn new(seq: u64, kind: PassKind, read: SettingsRead, output: PassOutput) -> Self {
        Self {
            seq,
            kind,
            settings: read.settings,
            settings_fault: read.fault,
            output,
        }
    }
}

/// Run one full pass under an exclusive borrow of the document.
pub fn run_pass<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    settings: &Settings,
    placement: Placement,
) -> PassOutput {
    if let Err(e) = ensure_stylesheet(doc, selectors, settings) {
        tracing::warn!(error = %e, "Could not write stylesheet");
    }
    let (cards, skipped) = reconcile_all(doc, selectors, settings);
    let control = ensure_control(doc, selectors, settings, placement);
    PassOutput {
        cards,
        skipped,
        control,
    }
}

/// Reconcile every card, once per target, in document order.
pub fn reconcile_all<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    settings: &Settings,
) -> (Vec<CardReport>, usize) {
    let cards = doc.query_all(doc.root(), &selectors.cards);
    let mut seen_targets = HashSet::with_capacity(cards.len());
    let mut reports = Vec::with_capacity(cards.len());
    let mut skipped = 0;

    for card in cards {
        if !doc.contains(card) {
            tracing::debug!(%card, "Card vanished before reconcile, skipping");
            skipped += 1;
            continue;
        }
        let target = target_of(&*doc, selectors, card);
        // Nested container shapes share a target; the outermost card decides.
        if !seen_targets.insert(target) {
            continue;
        }
        let signal = extract(&*doc, selectors, card);
        match reconcile(doc, selectors, card, &signal, settings) {
            Ok(state) => reports.push(CardReport {
                card,
                target,
                tag: doc.tag(card).unwrap_or_default().to_string(),
                title: doc
                    .query(card, &selectors.title)
                    .map(|title| doc.text_content(title).trim().to_string())
                    .unwrap_or_default(),
                signal,
                state,
            }),
            Err(DomError::NodeMissing(node)) => {
                tracing::debug!(%card, %node, "Node vanished mid-apply, skipping card");
                skipped += 1;
            }
            Err(e) => {
                tracing::warn!(%card, error = %e, "Card reconcile failed");
                skipped += 1;
            }
        }
    }
    (reports, skipped)
}

fn ensure_control<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    settings: &Settings,
    placement: Placement,
) -> ControlStatus {
    let result = match find_control(&*doc) {
        Some(control) => render_control(doc, control, settings).map(|_| ControlStatus::Rendered(control)),
        None => match placement {
            Placement::Floating => mount_floating(doc, settings).map(ControlStatus::Mounted),
            Placement::Toolbar => match doc.query(doc.root(), &selectors.toolbar) {
                Some(toolbar) => mount_in_toolbar(doc, toolbar, settings).map(ControlStatus::Mounted),
                None => Ok(ControlStatus::AwaitingToolbar),
            },
        },
    };
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not write toggle control");
        ControlStatus::Failed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::reconcile::MARKER_ATTR;
    use crate::selectors::host;

    const HOME: &str = r#"<html><head/><body>
  <ytd-masthead><div id="end"/></ytd-masthead>
  <ytd-rich-grid-renderer>
    <ytd-rich-item-renderer>
      <ytd-rich-grid-media><ytd-thumbnail><div id="progress" style="width: 85%"/></ytd-thumbnail></ytd-rich-grid-media>
    </ytd-rich-item-renderer>
    <ytd-rich-item-renderer>
      <ytd-rich-grid-media><ytd-thumbnail><div role="progressbar" aria-valuenow="30"/></ytd-thumbnail></ytd-rich-grid-media>
    </ytd-rich-item-renderer>
    <ytd-rich-item-renderer>
      <ytd-rich-grid-media><ytd-thumbnail><img src="a.jpg"/></ytd-thumbnail></ytd-rich-grid-media>
    </ytd-rich-item-renderer>
  </ytd-rich-grid-renderer>
</body></html>"#;

    #[test]
    fn test_nested_cards_reconciled_once_per_target() {
        let mut doc = Document::parse(HOME).unwrap();
        let output = run_pass(&mut doc, host(), &Settings::default(), Placement::Toolbar);

        assert_eq!(output.cards.len(), 3);
        assert_eq!(output.skipped, 0);
        assert!(output.cards.iter().all(|c| c.tag == "ytd-rich-item-renderer"));
        assert_eq!(output.count(VisualState::Dimmed), 1);
        assert_eq!(output.count(VisualState::Normal), 2);
        assert_eq!(output.cards[0].signal, WatchSignal::Ratio(0.85));
        assert_eq!(output.cards[1].signal, WatchSignal::Ratio(0.3));
        assert_eq!(output.cards[2].signal, WatchSignal::Unknown);
    }

    #[test]
    fn test_pass_mounts_and_then_renders_control() {
        let mut doc = Document::parse(HOME).unwrap();
        let first = run_pass(&mut doc, host(), &Settings::default(), Placement::Toolbar);
        let ControlStatus::Mounted(control) = first.control else {
            panic!("expected a mounted control, got {:?}", first.control);
        };

        let second = run_pass(&mut doc, host(), &Settings::default().toggled(), Placement::Toolbar);
        assert_eq!(second.control, ControlStatus::Rendered(control));
        assert_eq!(doc.attribute(control, "aria-pressed"), Some("true"));
        assert_eq!(second.count(VisualState::Hidden), 1);
    }

    #[test]
    fn test_toolbar_placement_waits_without_toolbar() {
        let mut doc = Document::parse("<html><body><ytd-video-renderer/></body></html>").unwrap();
        let output = run_pass(&mut doc, host(), &Settings::default(), Placement::Toolbar);
        assert_eq!(output.control, ControlStatus::AwaitingToolbar);
        assert_eq!(find_control(&doc), None);

        let output = run_pass(&mut doc, host(), &Settings::default(), Placement::Floating);
        assert!(matches!(output.control, ControlStatus::Mounted(_)));
    }

    #[test]
    fn test_second_pass_is_write_free() {
        let mut doc = Document::parse(HOME).unwrap();
        let settings = Settings::default();
        run_pass(&mut doc, host(), &settings, Placement::Toolbar);
        let mutations = doc.mutation_count();
        let markup = doc.to_markup();

        run_pass(&mut doc, host(), &settings, Placement::Toolbar);
        assert_eq!(doc.mutation_count(), mutations);
        assert_eq!(doc.to_markup(), markup);
    }

    #[test]
    fn test_markers_land_on_grid_items() {
        let mut doc = Document::parse(HOME).unwrap();
        let output = run_pass(&mut doc, host(), &Settings::default().toggled(), Placement::Floating);
        let hidden = &output.cards[0];
        assert_eq!(hidden.card, hidden.target);
        assert_eq!(doc.attribute(hidden.target, MARKER_ATTR), Some("hide"));
    }

    /// A document whose writes to one node fail as if it had just vanished.
    struct Vanishing {
        doc: Document,
        gone: NodeId,
    }

    impl Vanishing {
        fn check(&self, node: NodeId) -> Result<(), DomError> {
            if node == self.gone {
                Err(DomError::NodeMissing(node))
            } else {
                Ok(())
            }
        }
    }

    impl Inspect for Vanishing {
        fn root(&self) -> NodeId {
            self.doc.root()
        }
        fn contains(&self, node: NodeId) -> bool {
            self.doc.contains(node)
        }
        fn tag(&self, node: NodeId) -> Option<&str> {
            self.doc.tag(node)
        }
        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.doc.parent(node)
        }
        fn children(&self, node: NodeId) -> Vec<NodeId> {
            self.doc.children(node)
        }
        fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
            self.doc.attribute(node, name)
        }
        fn text_content(&self, node: NodeId) -> String {
            self.doc.text_content(node)
        }
        fn rendered_width(&self, node: NodeId) -> Option<f64> {
            self.doc.rendered_width(node)
        }
    }

    impl Mutate for Vanishing {
        fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<bool, DomError> {
            self.check(node)?;
            self.doc.set_attribute(node, name, value)
        }
        fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<bool, DomError> {
            self.check(node)?;
            self.doc.remove_attribute(node, name)
        }
        fn insert_element(&mut self, parent: NodeId, index: usize, tag: &str) -> Result<NodeId, DomError> {
            self.check(parent)?;
            self.doc.insert_element(parent, index, tag)
        }
        fn set_text(&mut self, node: NodeId, text: &str) -> Result<bool, DomError> {
            self.check(node)?;
            self.doc.set_text(node, text)
        }
        fn remove_node(&mut self, node: NodeId) -> Result<(), DomError> {
            self.check(node)?;
            self.doc.remove_node(node)
        }
    }

    #[test]
    fn test_vanished_card_is_skipped_not_fatal() {
        let doc = Document::parse(
            r#"<html><head/><body>
  <ytd-video-renderer><div id="progress" style="width: 90%"/></ytd-video-renderer>
  <ytd-video-renderer><div id="progress" style="width: 95%"/></ytd-video-renderer>
  <ytd-video-renderer><div id="progress" style="width: 100%"/></ytd-video-renderer>
</body></html>"#,
        )
        .unwrap();
        let cards = doc.query_all(doc.root(), &host().cards);
        let mut doc = Vanishing { doc, gone: cards[1] };

        let output = run_pass(&mut doc, host(), &Settings::default().toggled(), Placement::Floating);

        assert_eq!(output.skipped, 1);
        assert_eq!(output.cards.len(), 2);
        assert_eq!(output.cards[0].card, cards[0]);
        assert_eq!(output.cards[1].card, cards[2]);
        assert_eq!(output.count(VisualState::Hidden), 2);
        assert_eq!(doc.attribute(cards[0], MARKER_ATTR), Some("hide"));
        assert_eq!(doc.attribute(cards[1], MARKER_ATTR), None);
        assert_eq!(doc.attribute(cards[2], MARKER_ATTR), Some("hide"));
        assert!(matches!(output.control, ControlStatus::Mounted(_)));
    }

    #[test]
    fn test_report_serializes_flat() {
        let mut doc = Document::parse(HOME).unwrap();
        let output = run_pass(&mut doc, host(), &Settings::default(), Placement::Floating);
        let read = SettingsRead {
            settings: Settings::default(),
            fault: None,
        };
        let report = PassReport::new(7, PassKind::Bootstrap, read, output);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["seq"], 7);
        assert_eq!(json["kind"], "bootstrap");
        assert_eq!(json["cards"].as_array().unwrap().len(), 3);
        assert_eq!(json["control"]["status"], "mounted");
        assert_eq!(json["settings"]["gridColumns"], 4);
    }
}
