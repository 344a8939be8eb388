//! A small CSS selector subset.
//!
//! Supported: type selectors, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`
//! (value optionally quoted), the descendant combinator (whitespace) and
//! selector lists (`,`). That covers every selector the host vocabulary needs.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{Inspect, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character {found:?} at offset {offset} in {input:?}")]
    Unexpected {
        input: String,
        offset: usize,
        found: char,
    },

    #[error("unterminated attribute selector in {0:?}")]
    UnterminatedAttribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

/// One compound selector such as `a#thumbnail.primary[role=link]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrMatch>,
}

impl Compound {
    /// Matches every element.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str) -> Self {
        self.attributes.push(AttrMatch::Exists(name.to_ascii_lowercase()));
        self
    }

    pub fn with_attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push(AttrMatch::Equals(name.to_ascii_lowercase(), value.to_string()));
        self
    }

    fn matches<D: Inspect + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag
            && !tag.eq_ignore_ascii_case(expected)
        {
            return false;
        }
        if let Some(id) = &self.id
            && doc.attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attributes.iter().all(|attr| match attr {
            AttrMatch::Exists(name) => doc.attribute(node, name).is_some(),
            AttrMatch::Equals(name, value) => doc.attribute(node, name) == Some(value.as_str()),
        })
    }

    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => f.write_str(tag)?,
            None if self.is_empty() => f.write_str("*")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attr in &self.attributes {
            match attr {
                AttrMatch::Exists(name) => write!(f, "[{name}]")?,
                AttrMatch::Equals(name, value) => write!(f, "[{name}=\"{value}\"]")?,
            }
        }
        Ok(())
    }
}

/// Compounds joined by descendant combinators, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<Compound>);

impl Complex {
    fn matches<D: Inspect + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.0.split_last() else {
            return false;
        };
        if !last.matches(doc, node) {
            return false;
        }
        // Descendant-only chains: matching the nearest qualifying ancestor
        // for each step is sufficient.
        let mut current = doc.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = current else {
                    return false;
                };
                current = doc.parent(candidate);
                if compound.matches(doc, candidate) {
                    break;
                }
            }
        }
        true
    }
}

/// A selector list; an element matches when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(Vec<Complex>);

impl Selector {
    /// Selector list of single compounds.
    pub fn any_of(compounds: impl IntoIterator<Item = Compound>) -> Self {
        Self(compounds.into_iter().map(|c| Complex(vec![c])).collect())
    }

    /// `ancestor descendant` as a single-alternative selector.
    pub fn descendant(ancestor: Compound, descendant: Compound) -> Self {
        Self(vec![Complex(vec![ancestor, descendant])])
    }

    /// Append the alternatives of `other`.
    pub fn or(mut self, other: Selector) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn matches<D: Inspect + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        self.0.iter().any(|complex| complex.matches(doc, node))
    }
}

impl From<Compound> for Selector {
    fn from(compound: Compound) -> Self {
        Self(vec![Complex(vec![compound])])
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, complex) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            for (j, compound) in complex.0.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{compound}")?;
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            input,
            chars: input.char_indices().peekable(),
        };
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(parser.complex()?);
            match parser.chars.next() {
                None => break,
                Some((_, ',')) => continue,
                Some((offset, found)) => {
                    return Err(SelectorError::Unexpected {
                        input: input.to_string(),
                        offset,
                        found,
                    });
                }
            }
        }
        Ok(Self(alternatives))
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| is_ident_char(*c)) {
            out.push(c);
        }
        out
    }

    fn unexpected(&mut self) -> SelectorError {
        match self.chars.peek() {
            Some(&(offset, found)) => SelectorError::Unexpected {
                input: self.input.to_string(),
                offset,
                found,
            },
            None => SelectorError::Empty,
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut compounds = vec![self.compound()?];
        loop {
            let had_space = self.skip_whitespace();
            match self.chars.peek() {
                None | Some((_, ',')) => break,
                Some(_) if had_space => compounds.push(self.compound()?),
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(Complex(compounds))
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut consumed = false;

        if self.chars.next_if(|(_, c)| *c == '*').is_some() {
            consumed = true;
        } else if self.chars.peek().is_some_and(|(_, c)| c.is_ascii_alphabetic()) {
            compound.tag = Some(self.ident().to_ascii_lowercase());
            consumed = true;
        }

        loop {
            match self.chars.peek().map(|&(_, c)| c) {
                Some('#') => {
                    self.chars.next();
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.id = Some(id);
                }
                Some('.') => {
                    self.chars.next();
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(self.unexpected());
                    }
                    compound.classes.push(class);
                }
                Some('[') => {
                    self.chars.next();
                    compound.attributes.push(self.attribute()?);
                }
                _ => break,
            }
            consumed = true;
        }

        if consumed {
            Ok(compound)
        } else {
            Err(self.unexpected())
        }
    }

    fn attribute(&mut self) -> Result<AttrMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unexpected());
        }
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, ']')) => Ok(AttrMatch::Exists(name)),
            Some((_, '=')) => {
                self.skip_whitespace();
                let value = self.attribute_value()?;
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ']')) => Ok(AttrMatch::Equals(name, value)),
                    Some((offset, found)) => Err(SelectorError::Unexpected {
                        input: self.input.to_string(),
                        offset,
                        found,
                    }),
                    None => Err(SelectorError::UnterminatedAttribute(self.input.to_string())),
                }
            }
            Some((offset, found)) => Err(SelectorError::Unexpected {
                input: self.input.to_string(),
                offset,
                found,
            }),
            None => Err(SelectorError::UnterminatedAttribute(self.input.to_string())),
        }
    }

    fn attribute_value(&mut self) -> Result<String, SelectorError> {
        let quote = self.chars.next_if(|(_, c)| *c == '"' || *c == '\'').map(|(_, c)| c);
        let Some(quote) = quote else {
            return Ok(self.ident());
        };
        let mut value = String::new();
        for (_, c) in self.chars.by_ref() {
            if c == quote {
                return Ok(value);
            }
            value.push(c);
        }
        Err(SelectorError::UnterminatedAttribute(self.input.to_string()))
    }
}
