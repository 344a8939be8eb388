//! Toggle control
//!
//! The single control switching between hide-mode and dim-mode. It is either
//! a pill inserted at the front of the host toolbar, or a floating button
//! appended to the document element when no toolbar placement is wanted.

use std::time::Duration;

use seen_types::Settings;
use seen_types::formatting::{threshold_title, toggle_label};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::dom::{DomError, Inspect, Mutate, NodeId};
use crate::selectors::HostSelectors;

/// Id of the control element.
pub const TOGGLE_ID: &str = "seen-toggle";

/// Extra class of the toolbar variant.
pub const PILL_CLASS: &str = "seen-toggle--pill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Inside the host toolbar, once it exists.
    #[default]
    Toolbar,
    /// Fixed-position button, mounted immediately.
    Floating,
}

pub fn find_control(doc: &dyn Inspect) -> Option<NodeId> {
    doc.element_by_id(TOGGLE_ID)
}

/// Bring label, `aria-pressed` and title in line with `settings`.
///
/// Returns whether anything was written.
pub fn render_control<D: Mutate>(
    doc: &mut D,
    control: NodeId,
    settings: &Settings,
) -> Result<bool, DomError> {
    let pressed = if settings.enabled { "true" } else { "false" };
    let mut changed = doc.set_text(control, toggle_label(settings.enabled))?;
    changed |= doc.set_attribute(control, "aria-pressed", pressed)?;
    changed |= doc.set_attribute(control, "title", &threshold_title(settings.threshold))?;
    Ok(changed)
}

fn create_control<D: Mutate>(
    doc: &mut D,
    parent: NodeId,
    index: usize,
    settings: &Settings,
) -> Result<NodeId, DomError> {
    let control = doc.insert_element(parent, index, "button")?;
    doc.set_attribute(control, "id", TOGGLE_ID)?;
    doc.set_attribute(control, "type", "button")?;
    render_control(doc, control, settings)?;
    Ok(control)
}

/// Append the floating button to the document element.
pub fn mount_floating<D: Mutate>(doc: &mut D, settings: &Settings) -> Result<NodeId, DomError> {
    let parent = doc.document_element();
    create_control(doc, parent, usize::MAX, settings)
}

/// Insert the pill as the first child of `toolbar`.
pub fn mount_in_toolbar<D: Mutate>(
    doc: &mut D,
    toolbar: NodeId,
    settings: &Settings,
) -> Result<NodeId, DomError> {
    let control = create_control(doc, toolbar, 0, settings)?;
    doc.add_class(control, PILL_CLASS)?;
    Ok(control)
}

/// Poll until the toolbar insertion point exists, giving up after `limit`.
///
/// The document lock is only held for each individual lookup.
pub async fn wait_for_toolbar<D: Inspect + Send + Sync>(
    doc: &RwLock<D>,
    selectors: &HostSelectors,
    limit: Duration,
    poll: Duration,
) -> Option<NodeId> {
    let search = async {
        loop {
            {
                let guard = doc.read().await;
                if let Some(toolbar) = guard.query(guard.root(), &selectors.toolbar) {
                    return toolbar;
                }
            }
            tokio::time::sleep(poll).await;
        }
    };
    tokio::time::timeout(limit, search).await.ok()
}
