//! Injected stylesheet
//!
//! One `<style>` node carries every rule the engine relies on. It is created
//! once and only rewritten when the settings it depends on change.

use std::fmt::Write as _;

use seen_types::Settings;

use crate::dom::{DomError, Inspect, Mutate, NodeId};
use crate::reconcile::{BADGE_CLASS, DIMMED_CLASS, HIDDEN_CLASS};
use crate::selectors::HostSelectors;
use crate::toggle::{PILL_CLASS, TOGGLE_ID};

/// Id of the injected stylesheet node.
pub const STYLE_ID: &str = "seen-style";

const TOGGLE_RULES: &str = "\
  position: fixed;
  bottom: 16px;
  right: 16px;
  z-index: 999999;
  padding: 10px 12px;
  border-radius: 999px;
  border: 1px solid rgba(255,255,255,0.25);
  background: rgba(0,0,0,0.85);
  color: white;
  cursor: pointer;
  font-size: 12px;
  font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif;
  box-shadow: 0 6px 20px rgba(0,0,0,0.35);";

/// Full stylesheet text for the given settings.
pub fn stylesheet(settings: &Settings) -> String {
    let mut css = String::new();
    let _ = writeln!(css, ".{HIDDEN_CLASS} {{ display: none !important; }}");
    let _ = writeln!(css, ".{DIMMED_CLASS} {{ opacity: 0.35; transition: opacity 120ms ease-in; }}");
    let _ = writeln!(css, ".{DIMMED_CLASS}:hover {{ opacity: 1; }}");
    let _ = writeln!(
        css,
        ".{BADGE_CLASS} {{ position: absolute; top: 6px; left: 6px; z-index: 2; \
         padding: 2px 6px; border-radius: 4px; background: rgba(0,0,0,0.8); \
         color: white; font-size: 11px; pointer-events: none; }}"
    );
    let _ = writeln!(css, "#{TOGGLE_ID} {{\n{TOGGLE_RULES}\n}}");
    let _ = writeln!(
        css,
        "#{TOGGLE_ID}.{PILL_CLASS} {{ position: static; margin: 0 8px; box-shadow: none; }}"
    );
    let _ = writeln!(
        css,
        "ytd-rich-grid-renderer {{ --ytd-rich-grid-items-per-row: {} !important; }}",
        settings.grid_columns
    );
    // Loaded pages trim surrounding whitespace from text.
    css.truncate(css.trim_end().len());
    css
}

/// Create the stylesheet if absent, refresh its text if stale.
///
/// Returns the node and whether anything was written.
pub fn ensure_stylesheet<D: Mutate>(
    doc: &mut D,
    selectors: &HostSelectors,
    settings: &Settings,
) -> Result<(NodeId, bool), DomError> {
    let css = stylesheet(settings);
    if let Some(existing) = doc.element_by_id(STYLE_ID) {
        let changed = doc.text_content(existing) != css && doc.set_text(existing, &css)?;
        return Ok((existing, changed));
    }

    let parent = doc
        .query(doc.root(), &selectors.head)
        .unwrap_or_else(|| doc.document_element());
    let node = doc.append_element(parent, "style")?;
    doc.set_attribute(node, "id", STYLE_ID)?;
    doc.set_text(node, &css)?;
    tracing::debug!(%node, "Stylesheet injected");
    Ok((node, true))
}
