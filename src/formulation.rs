//! The six elements of an optimization formulation and their rendering.

use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{EMPTY_PARTIAL, LAYER_NAMES};

/// One element of a formulation. The discriminant is the tree layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    Type = 1,
    Sets = 2,
    Parameters = 3,
    Variables = 4,
    Objective = 5,
    Constraints = 6,
}

impl Element {
    /// All elements in layer order.
    pub const ALL: [Element; 6] = [
        Element::Type,
        Element::Sets,
        Element::Parameters,
        Element::Variables,
        Element::Objective,
        Element::Constraints,
    ];

    /// Element generated at the given layer, if the layer holds one.
    pub fn from_layer(layer: usize) -> Option<Element> {
        layer.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Look up an element by its lower-case key.
    pub fn from_name(name: &str) -> Option<Element> {
        Self::ALL.iter().copied().find(|e| e.name() == name)
    }

    #[inline]
    pub fn layer(self) -> usize {
        self as usize
    }

    /// Lower-case key, as used in evaluator responses.
    pub fn name(self) -> &'static str {
        LAYER_NAMES[self.layer()]
    }

    /// Capitalized name for prompts.
    pub fn title(self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element name for a tree layer: "root" for 0, "unknown" past the last layer.
pub fn element_name(layer: usize) -> &'static str {
    LAYER_NAMES.get(layer).copied().unwrap_or("unknown")
}

/// A (possibly partial) formulation, ordered by layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formulation {
    elements: BTreeMap<Element, String>,
}

impl Formulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element, content: impl Into<String>) {
        self.elements.insert(element, content.into());
    }

    pub fn get(&self, element: Element) -> Option<&str> {
        self.elements.get(&element).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True once every element has content.
    pub fn is_complete(&self) -> bool {
        self.elements.len() == Element::ALL.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Element, &str)> {
        self.elements.iter().map(|(e, c)| (*e, c.as_str()))
    }

    /// `**Name**: content` lines in layer order; empty string when nothing is set.
    pub fn render(&self) -> String {
        self.iter()
            .map(|(e, c)| format!("**{}**: {}", e.title(), c))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Like [`render`](Self::render) but with a placeholder for an empty formulation.
    pub fn render_partial(&self) -> String {
        if self.is_empty() {
            EMPTY_PARTIAL.to_string()
        } else {
            self.render()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_roundtrip() {
        for e in Element::ALL {
            assert_eq!(Element::from_layer(e.layer()), Some(e));
            assert_eq!(Element::from_name(e.name()), Some(e));
        }
        assert_eq!(Element::from_layer(0), None);
        assert_eq!(Element::from_layer(7), None);
        assert_eq!(Element::from_name("root"), None);
    }

    #[test]
    fn test_element_name_bounds() {
        assert_eq!(element_name(0), "root");
        assert_eq!(element_name(5), "objective");
        assert_eq!(element_name(9), "unknown");
    }

    #[test]
    fn test_title() {
        assert_eq!(Element::Parameters.title(), "Parameters");
        assert_eq!(Element::Type.title(), "Type");
    }

    #[test]
    fn test_render_orders_by_layer() {
        let mut f = Formulation::new();
        assert_eq!(f.render_partial(), "(none yet)");
        f.insert(Element::Variables, "x >= 0");
        f.insert(Element::Type, "LP");
        assert_eq!(f.render(), "**Type**: LP\n**Variables**: x >= 0");
        assert!(!f.is_complete());
    }
}
