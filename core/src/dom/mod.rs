//! Document capabilities
//!
//! The host document is owned by someone else and may be replaced at any
//! time. The engine only ever talks to it through two capabilities:
//!
//! - [`Inspect`]: read-only lookups (selector queries, attributes, inline
//!   styles, rendered widths)
//! - [`Mutate`]: class/attribute/child edits
//!
//! [`Document`] is the in-memory implementation used by the CLI and by tests.
//! Every mutating call reports whether it actually changed anything, which is
//! what lets the reconciler stay write-free in steady state.

mod document;
pub mod markup;
mod selector;
pub mod style;

use std::fmt;

use thiserror::Error;

pub use document::Document;
pub use selector::{Compound, Selector, SelectorError};

/// Handle to a node inside a document.
///
/// Handles are only meaningful for the document that issued them and are
/// never reused once the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("node {0} is no longer in the document")]
    NodeMissing(NodeId),

    #[error("node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("the document root cannot be removed")]
    RootRemoval,
}

// ─────────────────────────────────────────────────────────────────────────────
// Inspect
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view of a document.
pub trait Inspect {
    /// The document node. Never an element, never removed.
    fn root(&self) -> NodeId;

    /// Whether the node is still attached to this document.
    fn contains(&self, node: NodeId) -> bool;

    /// Element tag name, `None` for text/document nodes or missing nodes.
    fn tag(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Element children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Concatenated text of all descendant text nodes.
    fn text_content(&self, node: NodeId) -> String;

    /// Laid-out width in CSS pixels, when the document knows one.
    fn rendered_width(&self, node: NodeId) -> Option<f64>;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    /// Value of one declaration from the element's inline `style` attribute.
    fn inline_style(&self, node: NodeId, property: &str) -> Option<String> {
        let declarations = self.attribute(node, "style")?;
        style::declaration(declarations, property).map(str::to_string)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Element descendants of `scope` in document order, excluding `scope`.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// `querySelectorAll` semantics: descendants only, document order.
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&node| selector.matches(self, node))
            .collect()
    }

    fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&node| selector.matches(self, node))
    }

    /// Like [`Inspect::query_all`] but `scope` itself is a candidate too.
    fn query_all_inclusive(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        if selector.matches(self, scope) {
            out.push(scope);
        }
        out.extend(self.query_all(scope, selector));
        out
    }

    /// Nearest ancestor-or-self matching the selector.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if selector.matches(self, candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    /// The outermost element (`<html>` for a page), or the root itself.
    fn document_element(&self) -> NodeId {
        self.children(self.root())
            .into_iter()
            .next()
            .unwrap_or_else(|| self.root())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutate
// ─────────────────────────────────────────────────────────────────────────────

/// Write access to a document.
///
/// Every method returns whether the document changed so callers can avoid
/// redundant writes.
pub trait Mutate: Inspect {
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<bool, DomError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<bool, DomError>;

    /// Insert a new element as child number `index` (clamped to the end).
    fn insert_element(&mut self, parent: NodeId, index: usize, tag: &str)
    -> Result<NodeId, DomError>;

    /// Replace all children of `node` with a single text node.
    fn set_text(&mut self, node: NodeId, text: &str) -> Result<bool, DomError>;

    /// Detach and drop `node` with its subtree.
    fn remove_node(&mut self, node: NodeId) -> Result<(), DomError>;

    fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        self.insert_element(parent, usize::MAX, tag)
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> Result<bool, DomError> {
        if !self.contains(node) {
            return Err(DomError::NodeMissing(node));
        }
        if self.has_class(node, class) {
            return Ok(false);
        }
        // Appended verbatim so `remove_class` can splice it back out.
        let list = match self.attribute(node, "class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &list)
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> Result<bool, DomError> {
        if !self.contains(node) {
            return Err(DomError::NodeMissing(node));
        }
        if !self.has_class(node, class) {
            return Ok(false);
        }
        let remaining = without_class(self.attribute(node, "class").unwrap_or_default(), class);
        if remaining.is_empty() {
            self.remove_attribute(node, "class")
        } else {
            self.set_attribute(node, "class", &remaining)
        }
    }

    /// Set (`Some`) or remove (`None`) one inline style declaration.
    fn set_style_property(
        &mut self,
        node: NodeId,
        property: &str,
        value: Option<&str>,
    ) -> Result<bool, DomError> {
        if !self.contains(node) {
            return Err(DomError::NodeMissing(node));
        }
        let current = self.attribute(node, "style").unwrap_or_default();
        let updated = style::with_declaration(current, property, value);
        if updated == current {
            return Ok(false);
        }
        if updated.is_empty() {
            self.remove_attribute(node, "style")
        } else {
            self.set_attribute(node, "style", &updated)
        }
    }
}

/// Byte offset of `class` as a whole whitespace-delimited token.
fn class_token(list: &str, class: &str) -> Option<usize> {
    list.match_indices(class).map(|(start, _)| start).find(|&start| {
        let end = start + class.len();
        list[..start].chars().next_back().is_none_or(|c| c.is_ascii_whitespace())
            && list[end..].chars().next().is_none_or(|c| c.is_ascii_whitespace())
    })
}

/// Remove every `class` token together with one adjacent separator.
///
/// The rest of the list keeps its exact spelling, so adding and then removing
/// a class restores the host's original attribute.
fn without_class(list: &str, class: &str) -> String {
    let mut out = list.to_string();
    if class.is_empty() {
        return out;
    }
    while let Some(start) = class_token(&out, class) {
        let end = start + class.len();
        let range = match out[..start].chars().next_back() {
            Some(sep) => start - sep.len_utf8()..end,
            None => start..end + out[end..].chars().next().map_or(0, char::len_utf8),
        };
        out.replace_range(range, "");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_class_keeps_spelling() {
        assert_eq!(without_class("style-scope  ytd-item seen-hidden", "seen-hidden"), "style-scope  ytd-item");
        assert_eq!(without_class("seen-hidden\tfoo  bar", "seen-hidden"), "foo  bar");
        assert_eq!(without_class("a seen-hidden b", "seen-hidden"), "a b");
        assert_eq!(without_class("seen-hidden", "seen-hidden"), "");
        assert_eq!(without_class("seen-hidden-x seen-hidden", "seen-hidden"), "seen-hidden-x");
        assert_eq!(without_class("x seen-hidden seen-hidden", "seen-hidden"), "x");
    }

    #[test]
    fn test_add_then_remove_class_is_byte_identical() {
        let mut doc = Document::new();
        let root = doc.root();
        let card = doc.append_element(root, "div").unwrap();
        for original in ["style-scope  ytd-item", " padded ", "one"] {
            doc.set_attribute(card, "class", original).unwrap();
            doc.add_class(card, "seen-dimmed").unwrap();
            assert!(doc.has_class(card, "seen-dimmed"));
            doc.remove_class(card, "seen-dimmed").unwrap();
            assert_eq!(doc.attribute(card, "class"), Some(original));
        }
    }
}
