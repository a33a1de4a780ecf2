//! Per-search knowledge base of layer-wise guidance.
//!
//! Guidance harvested from the reasoning evaluator is appended here during
//! backpropagation and injected into later element prompts.

use std::collections::BTreeMap;

use crate::constants::{KB_HINT_ENTRIES, KB_KEEP_ENTRIES, KB_MAX_ENTRIES};
use crate::formulation::Element;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: BTreeMap<Element, Vec<String>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all guidance.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append guidance for an element, trimming to the most recent
    /// [`KB_KEEP_ENTRIES`] once the list grows past [`KB_MAX_ENTRIES`].
    pub fn insert(&mut self, element: Element, guidance: impl Into<String>) {
        let list = self.entries.entry(element).or_default();
        list.push(guidance.into());
        if list.len() > KB_MAX_ENTRIES {
            list.drain(..list.len() - KB_KEEP_ENTRIES);
        }
    }

    /// All guidance for an element, oldest first.
    pub fn guidance(&self, element: Element) -> &[String] {
        self.entries.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `n` most recent entries, oldest first.
    pub fn recent(&self, element: Element, n: usize) -> &[String] {
        let all = self.guidance(element);
        &all[all.len().saturating_sub(n)..]
    }

    /// Bulleted hint block for an element prompt; empty when there is no guidance.
    pub fn hint_block(&self, element: Element) -> String {
        let recent = self.recent(element, KB_HINT_ENTRIES);
        if recent.is_empty() {
            return String::new();
        }
        let bullets: Vec<String> = recent.iter().map(|g| format!("- {g}")).collect();
        format!(
            "\nGuidance from previous attempts for '{}':\n{}\n",
            element.name(),
            bullets.join("\n")
        )
    }

    /// Total guidance entries over all elements.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
