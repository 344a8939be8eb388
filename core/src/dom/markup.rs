//! Load and serialize XHTML-style markup.
//!
//! Saved pages and test fixtures are read with `quick-xml`, so they must be
//! well-formed: void elements self-close (`<img/>`) and only the XML entities
//! are recognised. Comments, doctype and processing instructions are dropped.

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::events::attributes::AttrError;
use thiserror::Error;

use super::{Document, DomError, Inspect, Mutate, NodeId};

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("malformed markup at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },

    #[error("malformed attribute at byte {position}: {source}")]
    Attribute { position: u64, source: AttrError },

    #[error("closing tag </{found}> does not match any open element")]
    Unbalanced { found: String },

    #[error("unclosed element <{0}>")]
    Unclosed(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

impl Document {
    /// Build a document from markup.
    pub fn parse(markup: &str) -> Result<Self, MarkupError> {
        let mut doc = Document::new();
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(true);

        let mut open: Vec<NodeId> = vec![doc.root()];
        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|source| MarkupError::Xml { position, source })?;
            let parent = open.last().copied().unwrap_or_else(|| doc.root());
            match event {
                Event::Start(start) => {
                    let node = element_from(&mut doc, parent, &start, position)?;
                    open.push(node);
                }
                Event::Empty(start) => {
                    element_from(&mut doc, parent, &start, position)?;
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                    let matches_open = open.len() > 1 && doc.tag(parent) == Some(name.as_str());
                    if !matches_open {
                        return Err(MarkupError::Unbalanced { found: name });
                    }
                    open.pop();
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|source| MarkupError::Xml { position, source })?;
                    if !text.is_empty() {
                        doc.append_text(parent, &text)?;
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    doc.append_text(parent, &text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if open.len() > 1
            && let Some(&unclosed) = open.last()
        {
            let tag = doc.tag(unclosed).unwrap_or_default().to_string();
            return Err(MarkupError::Unclosed(tag));
        }
        Ok(doc)
    }

    /// Serialize the whole document.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in self.child_nodes(self.root()) {
            self.write_node(*node, 0, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        if let Some(text) = self.text(node) {
            let _ = writeln!(out, "{indent}{}", escape(text));
            return;
        }
        let Some(tag) = self.tag(node) else {
            return;
        };

        let _ = write!(out, "{indent}<{tag}");
        for (name, value) in self.attributes(node) {
            let _ = write!(out, " {name}=\"{}\"", escape(value.as_str()));
        }

        let children = self.child_nodes(node);
        match children {
            [] => {
                let _ = writeln!(out, "/>");
            }
            [only] if self.text(*only).is_some() => {
                let text = self.text(*only).unwrap_or_default();
                let _ = writeln!(out, ">{}</{tag}>", escape(text));
            }
            _ => {
                let _ = writeln!(out, ">");
                for child in children {
                    self.write_node(*child, depth + 1, out);
                }
                let _ = writeln!(out, "{indent}</{tag}>");
            }
        }
    }
}

fn element_from(
    doc: &mut Document,
    parent: NodeId,
    start: &quick_xml::events::BytesStart<'_>,
    position: u64,
) -> Result<NodeId, MarkupError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let node = doc.append_element(parent, &tag)?;
    for attr in start.attributes() {
        let attr = attr.map_err(|source| MarkupError::Attribute { position, source })?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|source| MarkupError::Xml { position, source })?;
        doc.set_attribute(node, &name, &value)?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structure() {
        let doc = Document::parse(
            r#"<?xml version="1.0"?>
<!-- saved page -->
<html>
  <body class="page">
    <ytd-video-renderer data-id="a&amp;b">
      <span>Title &lt;1&gt;</span>
      <div id="progress" style="width: 30%"/>
    </ytd-video-renderer>
  </body>
</html>"#,
        )
        .unwrap();

        let html = doc.document_element();
        assert_eq!(doc.tag(html), Some("html"));
        let body = doc.children(html)[0];
        assert!(doc.has_class(body, "page"));
        let card = doc.children(body)[0];
        assert_eq!(doc.attribute(card, "data-id"), Some("a&b"));
        assert_eq!(doc.text_content(card), "Title <1>");
        let progress = doc.element_by_id("progress").unwrap();
        assert_eq!(doc.inline_style(progress, "width").as_deref(), Some("30%"));
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let source = r#"<html><body><div class="a b" title="x &quot;y&quot;"><span>hi &amp; bye</span><br/></div></body></html>"#;
        let doc = Document::parse(source).unwrap();
        let again = Document::parse(&doc.to_markup()).unwrap();
        assert_eq!(doc.to_markup(), again.to_markup());

        let div = again.query(again.root(), &"div".parse().unwrap()).unwrap();
        assert_eq!(again.attribute(div, "title"), Some("x \"y\""));
        assert_eq!(again.text_content(div), "hi & bye");
    }

    #[test]
    fn test_unbalanced_markup_is_rejected() {
        assert!(matches!(
            Document::parse("<html><body></html>"),
            Err(MarkupError::Unbalanced { .. }) | Err(MarkupError::Xml { .. })
        ));
        assert!(matches!(
            Document::parse("<html><body>"),
            Err(MarkupError::Unclosed(_)) | Err(MarkupError::Xml { .. })
        ));
    }
}
