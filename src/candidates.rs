//! Candidate element generation, pruning and tree expansion.

use fastrand::Rng;
use tracing::debug;

use crate::collaborators::TextGenerator;
use crate::config::SearchConfig;
use crate::constants::{COMPLETE_LAYER, TEMP_ELEMENT};
use crate::error::Result;
use crate::formulation::{Element, Formulation};
use crate::knowledge::KnowledgeBase;
use crate::prompts::element_prompt;
use crate::similarity::{is_duplicate, prune_similar};
use crate::tree::{FormulationTree, NodeId};

/// Produces formulation elements from a [`TextGenerator`].
pub struct CandidateGenerator<'a, G> {
    generator: &'a G,
    n_candidates: usize,
    threshold: f64,
}

impl<'a, G: TextGenerator> CandidateGenerator<'a, G> {
    pub fn new(generator: &'a G, config: &SearchConfig) -> Self {
        Self {
            generator,
            n_candidates: config.n_candidates,
            threshold: config.similarity_threshold,
        }
    }

    /// Generate one element given the partial formulation text.
    pub fn generate_element(
        &self,
        problem: &str,
        partial: &str,
        element: Element,
        knowledge: &KnowledgeBase,
    ) -> Result<String> {
        let prompt = element_prompt(problem, partial, &knowledge.hint_block(element), element);
        Ok(self.generator.generate(&prompt, TEMP_ELEMENT)?)
    }

    /// Independent raw candidates for one element, before pruning.
    pub fn candidates(
        &self,
        problem: &str,
        partial: &str,
        element: Element,
        knowledge: &KnowledgeBase,
    ) -> Result<Vec<String>> {
        (0..self.n_candidates)
            .map(|_| self.generate_element(problem, partial, element, knowledge))
            .collect()
    }

    /// Grow `id` by one layer and pick the child to simulate.
    ///
    /// New candidates are pruned against each other and against the existing
    /// children, then attached up to the child cap. Returns a random new
    /// child, or an existing one (unvisited first) if nothing new was
    /// attached. Returns `None` for a complete node.
    pub fn expand(
        &self,
        tree: &mut FormulationTree,
        id: NodeId,
        knowledge: &KnowledgeBase,
        rng: &mut Rng,
    ) -> Result<Option<NodeId>> {
        let Some(element) = Element::from_layer(tree.node(id).layer + 1) else {
            return Ok(None);
        };

        let mut added = Vec::new();
        if tree.can_expand(id) {
            let partial = tree.format_partial(id);
            let raw = self.candidates(tree.problem(), &partial, element, knowledge)?;
            let pruned = prune_similar(&raw, self.threshold);

            let mut existing: Vec<String> = tree
                .node(id)
                .children()
                .iter()
                .map(|&c| tree.node(c).content.clone())
                .collect();
            for content in pruned {
                if !tree.can_expand(id) {
                    break;
                }
                if is_duplicate(&content, &existing, self.threshold) {
                    continue;
                }
                if let Some(child) = tree.add_child(id, content.clone()) {
                    existing.push(content);
                    added.push(child);
                }
            }
            debug!(
                element = element.name(),
                raw = raw.len(),
                added = added.len(),
                children = tree.node(id).children().len(),
                "expanded node"
            );
        }

        if !added.is_empty() {
            return Ok(Some(added[rng.usize(..added.len())]));
        }
        Ok(pick_existing(tree, id, rng))
    }

    /// Fill every layer below `id` with one generated element each.
    ///
    /// The generated elements are not attached to the tree.
    pub fn complete(
        &self,
        tree: &FormulationTree,
        id: NodeId,
        knowledge: &KnowledgeBase,
    ) -> Result<Formulation> {
        let mut formulation = tree.formulation_path(id);
        for layer in tree.node(id).layer + 1..=COMPLETE_LAYER {
            let Some(element) = Element::from_layer(layer) else {
                continue;
            };
            let partial = formulation.render();
            let content = self.generate_element(tree.problem(), &partial, element, knowledge)?;
            formulation.insert(element, content);
        }
        Ok(formulation)
    }
}

/// Random unvisited child, else any random child.
fn pick_existing(tree: &FormulationTree, id: NodeId, rng: &mut Rng) -> Option<NodeId> {
    let children = tree.node(id).children();
    if children.is_empty() {
        return None;
    }
    let unvisited: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|&c| tree.node(c).visits == 0)
        .collect();
    if unvisited.is_empty() {
        Some(children[rng.usize(..children.len())])
    } else {
        Some(unvisited[rng.usize(..unvisited.len())])
    }
}
