//! Parsed property names.
//!
//! A name such as `security.ignored[0]` is split into elements
//! (`security`, `ignored`, `[0]`). Name elements compare in a relaxed
//! canonical form so `filter-order`, `filterOrder` and `FILTER_ORDER`
//! address the same property.

use std::fmt;

use super::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Name(String),
    Index(usize),
}

impl Element {
    /// Builds a name element, storing it in canonical form.
    pub fn name(raw: &str) -> Self {
        Element::Name(canonical(raw))
    }
}

/// A property name made of name and index elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyName {
    elements: Vec<Element>,
}

impl PropertyName {
    /// Parses a dotted name with optional `[n]` indexes.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidName {
            name: name.to_string(),
            reason,
        };

        let mut elements = Vec::new();
        if name.is_empty() {
            return Ok(Self { elements });
        }

        for segment in name.split('.') {
            let (head, mut rest) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            if head.is_empty() {
                return Err(invalid("empty segment"));
            }
            if head.contains(']') {
                return Err(invalid("unexpected ']'"));
            }
            elements.push(Element::name(head));

            while !rest.is_empty() {
                let inner = rest.strip_prefix('[').ok_or(invalid("expected '['"))?;
                let close = inner.find(']').ok_or(invalid("unclosed '['"))?;
                let index = inner[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a non-negative integer"))?;
                elements.push(Element::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self { elements })
    }

    /// Builds a name from already split path segments.
    ///
    /// Segments made only of ASCII digits become indexes.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let elements = segments
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                match s.parse::<usize>() {
                    Ok(i) if s.chars().all(|c| c.is_ascii_digit()) => Element::Index(i),
                    _ => Element::name(s),
                }
            })
            .collect();
        Self { elements }
    }

    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Returns a new name with `child` appended.
    pub fn append(&self, child: &PropertyName) -> Self {
        let mut elements = self.elements.clone();
        elements.extend(child.elements.iter().cloned());
        Self { elements }
    }

    /// Returns a new name with an index element appended.
    pub fn with_index(&self, index: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(Element::Index(index));
        Self { elements }
    }

    /// If `self` is `parent[n]`, returns `n`.
    pub fn index_under(&self, parent: &PropertyName) -> Option<usize> {
        if self.elements.len() != parent.elements.len() + 1 {
            return None;
        }
        if !self.elements.starts_with(&parent.elements) {
            return None;
        }
        match self.elements.last() {
            Some(Element::Index(i)) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                Element::Name(name) if i == 0 => write!(f, "{name}")?,
                Element::Name(name) => write!(f, ".{name}")?,
                Element::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn canonical(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
