//! In-memory document tree.
//!
//! Nodes are keyed by [`NodeId`]. Removed nodes are freed but their ids are
//! never handed out again, so a stale handle reports [`DomError::NodeMissing`]
//! instead of silently pointing at a different node.

use std::collections::HashMap;
use std::fmt;

use super::{DomError, Inspect, Mutate, NodeId, style};

#[derive(Debug, Clone)]
enum NodeData {
    Document,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout_width: Option<f64>,
}

type Observer = Box<dyn Fn() + Send + Sync>;

pub struct Document {
    nodes: HashMap<NodeId, Node>,
    /// Next unissued id.
    next: usize,
    observers: Vec<Observer>,
    mutations: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("observers", &self.observers.len())
            .field("mutations", &self.mutations)
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the root node.
    pub fn new() -> Self {
        let root = Node {
            data: NodeData::Document,
            parent: None,
            children: Vec::new(),
            layout_width: None,
        };
        Self {
            nodes: HashMap::from([(NodeId(0), root)]),
            next: 1,
            observers: Vec::new(),
            mutations: 0,
        }
    }

    /// Register a callback invoked after every effective mutation.
    ///
    /// This plays the role of a subtree mutation observer on the whole
    /// document: writes that change nothing do not notify.
    pub fn observe(&mut self, observer: impl Fn() + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Number of effective mutations since creation.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Number of live nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Record a laid-out width for `node`, overriding any inline `px` width.
    pub fn set_layout_width(&mut self, node: NodeId, width: f64) -> Result<(), DomError> {
        self.node_mut(node)?.layout_width = Some(width);
        Ok(())
    }

    /// Replace the whole tree with `other`'s, as a host re-render would.
    ///
    /// Every previously issued [`NodeId`] becomes stale. Observers are kept
    /// and notified once.
    pub fn replace_contents(&mut self, other: Document) {
        // Shift incoming ids past every id issued so far so old handles never alias.
        let offset = self.next;
        let shift = |id: NodeId| NodeId(id.0 + offset);
        let mut incoming = other.nodes;
        let top_level = incoming
            .remove(&NodeId(0))
            .map(|root| root.children)
            .unwrap_or_default();

        self.nodes.retain(|&id, _| id == NodeId(0));
        for (id, mut node) in incoming {
            node.parent = match node.parent {
                // The root keeps id 0: re-parent the new top-level children onto it.
                Some(NodeId(0)) => Some(NodeId(0)),
                parent => parent.map(shift),
            };
            node.children = node.children.into_iter().map(shift).collect();
            self.nodes.insert(shift(id), node);
        }
        self.next = offset + other.next;
        if let Some(root) = self.nodes.get_mut(&NodeId(0)) {
            root.children = top_level.into_iter().map(shift).collect();
        }
        self.notify();
    }

    /// Append a text node to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.node(parent)?;
        let id = self.allocate(Node {
            data: NodeData::Text(text.to_string()),
            parent: Some(parent),
            children: Vec::new(),
            layout_width: None,
        });
        self.node_mut(parent)?.children.push(id);
        self.notify();
        Ok(id)
    }

    /// Attributes of an element in source order.
    pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
        match self.node(node).map(|n| &n.data) {
            Ok(NodeData::Element { attributes, .. }) => attributes.as_slice(),
            _ => &[],
        }
    }

    /// All child nodes (elements and text) as raw handles.
    pub(crate) fn child_nodes(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn text(&self, node: NodeId) -> Option<&str> {
        match self.node(node).map(|n| &n.data) {
            Ok(NodeData::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(&id).ok_or(DomError::NodeMissing(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(&id).ok_or(DomError::NodeMissing(id))
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut Vec<(String, String)>, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn notify(&mut self) {
        self.mutations += 1;
        for observer in &self.observers {
            observer();
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
    }
}

impl Inspect for Document {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.node(node).is_ok()
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.node(node).ok()?.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok()?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.child_nodes(node)
            .iter()
            .copied()
            .filter(|&child| self.tag(child).is_some())
            .collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attributes(node)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                out.push_str(text);
            }
            stack.extend(self.child_nodes(current).iter().rev());
        }
        out
    }

    fn rendered_width(&self, node: NodeId) -> Option<f64> {
        let explicit = self.node(node).ok()?.layout_width;
        explicit.or_else(|| {
            self.inline_style(node, "width")
                .and_then(|width| style::pixels(&width))
        })
    }
}

impl Mutate for Document {
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<bool, DomError> {
        let attributes = self.attributes_mut(node)?;
        match attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) if existing == value => return Ok(false),
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name.to_ascii_lowercase(), value.to_string())),
        }
        self.notify();
        Ok(true)
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<bool, DomError> {
        let attributes = self.attributes_mut(node)?;
        let before = attributes.len();
        attributes.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        if attributes.len() == before {
            return Ok(false);
        }
        self.notify();
        Ok(true)
    }

    fn insert_element(
        &mut self,
        parent: NodeId,
        index: usize,
        tag: &str,
    ) -> Result<NodeId, DomError> {
        if matches!(self.node(parent)?.data, NodeData::Text(_)) {
            return Err(DomError::NotAnElement(parent));
        }
        let id = self.allocate(Node {
            data: NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attributes: Vec::new(),
            },
            parent: Some(parent),
            children: Vec::new(),
            layout_width: None,
        });
        let children = &mut self.node_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, id);
        self.notify();
        Ok(id)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> Result<bool, DomError> {
        if self.tag(node).is_none() {
            return Err(match self.node(node) {
                Ok(_) => DomError::NotAnElement(node),
                Err(e) => e,
            });
        }
        let children = self.child_nodes(node).to_vec();
        if let [only] = children.as_slice()
            && self.text(*only) == Some(text)
        {
            return Ok(false);
        }
        for child in children {
            self.drop_subtree(child);
        }
        let id = self.allocate(Node {
            data: NodeData::Text(text.to_string()),
            parent: Some(node),
            children: Vec::new(),
            layout_width: None,
        });
        self.node_mut(node)?.children = vec![id];
        self.notify();
        Ok(true)
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), DomError> {
        if node == self.root() {
            return Err(DomError::RootRemoval);
        }
        let parent = self.node(node)?.parent;
        if let Some(parent) = parent
            && let Ok(parent_node) = self.node_mut(parent)
        {
            parent_node.children.retain(|&child| child != node);
        }
        self.drop_subtree(node);
        self.notify();
        Ok(())
    }
}
