//! The formulation search tree.
//!
//! Nodes live in an arena owned by [`FormulationTree`] and refer to each
//! other by [`NodeId`]. A node's children list is the only owning edge; the
//! parent id is a back-reference used for UCB scoring and backpropagation.
//! Nodes are never removed while a search runs.

use crate::collaborators::ExecutionResult;
use crate::constants::COMPLETE_LAYER;
use crate::formulation::{Element, Formulation, element_name};

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One formulation element together with its search statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationNode {
    /// Depth: 0 for the root, 6 for a complete formulation
    pub layer: usize,
    /// Generated element text (empty at the root)
    pub content: String,
    /// Number of backpropagations through this node
    pub visits: u32,
    /// Confidence-weighted mean reward, always within [0, 1]
    pub value: f64,
    /// Last evaluation flagged this element for revision
    pub trigger: bool,
    /// Evaluator token-level uncertainty from the last evaluation
    pub local_uncertainty: f64,
    /// Last execution outcome simulated from this node
    pub last_result: Option<ExecutionResult>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl FormulationNode {
    fn new(layer: usize, content: String, parent: Option<NodeId>) -> Self {
        Self {
            layer,
            content,
            visits: 0,
            value: 0.0,
            trigger: false,
            local_uncertainty: 0.0,
            last_result: None,
            parent,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// All six elements are fixed along the path to this node.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.layer == COMPLETE_LAYER
    }

    /// "root", an element name, or "unknown".
    pub fn element_name(&self) -> &'static str {
        element_name(self.layer)
    }

    pub fn element(&self) -> Option<Element> {
        Element::from_layer(self.layer)
    }
}

/// Arena-backed formulation tree for a single problem.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationTree {
    problem: String,
    max_children: usize,
    nodes: Vec<FormulationNode>,
}

impl FormulationTree {
    /// Tree holding only the empty root.
    pub fn new(problem: impl Into<String>, max_children: usize) -> Self {
        Self {
            problem: problem.into(),
            max_children,
            nodes: vec![FormulationNode::new(0, String::new(), None)],
        }
    }

    /// Problem statement shared by every node.
    pub fn problem(&self) -> &str {
        &self.problem
    }

    pub fn max_children(&self) -> usize {
        self.max_children
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &FormulationNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut FormulationNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Whether another child may be attached to `id`.
    pub fn can_expand(&self, id: NodeId) -> bool {
        let node = self.node(id);
        !node.is_complete() && node.children.len() < self.max_children
    }

    /// Attach a child holding the next layer's element.
    ///
    /// Returns `None` if `parent` is complete or already has the maximum
    /// number of children.
    pub fn add_child(&mut self, parent: NodeId, content: impl Into<String>) -> Option<NodeId> {
        if !self.can_expand(parent) {
            return None;
        }
        let id = NodeId(self.nodes.len());
        let layer = self.node(parent).layer + 1;
        self.nodes
            .push(FormulationNode::new(layer, content.into(), Some(parent)));
        self.node_mut(parent).children.push(id);
        Some(id)
    }

    /// Ids from `id` up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Elements fixed along the path from the root to `id`.
    pub fn formulation_path(&self, id: NodeId) -> Formulation {
        let mut formulation = Formulation::new();
        for ancestor in self.path_to_root(id) {
            let node = self.node(ancestor);
            if let Some(element) = node.element() {
                formulation.insert(element, node.content.clone());
            }
        }
        formulation
    }

    /// The partial formulation at `id` as `**Name**: content` lines.
    pub fn format_partial(&self, id: NodeId) -> String {
        self.formulation_path(id).render_partial()
    }

    /// UCB1 score of `id` under its parent.
    ///
    /// Unvisited nodes score `+inf` so each child is tried once before any
    /// exploitation. Otherwise `value + c * sqrt(2 ln(N_parent) / n)`.
    pub fn ucb1(&self, id: NodeId, c: f64) -> f64 {
        let node = self.node(id);
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let parent_visits = node
            .parent
            .map(|p| self.node(p).visits)
            .unwrap_or(node.visits)
            .max(1);
        let n = node.visits as f64;
        node.value + c * (2.0 * (parent_visits as f64).ln() / n).sqrt()
    }

    /// Child of `id` with the highest UCB1 score; the first one wins ties.
    pub fn best_child(&self, id: NodeId, c: f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in self.node(id).children() {
            let score = self.ucb1(child, c);
            match best {
                Some((_, s)) if s >= score => {}
                _ => best = Some((child, score)),
            }
        }
        best.map(|(child, _)| child)
    }

    /// Node counts per layer, index 0 being the root.
    pub fn depth_counts(&self) -> [usize; COMPLETE_LAYER + 1] {
        let mut counts = [0; COMPLETE_LAYER + 1];
        for node in &self.nodes {
            counts[node.layer] += 1;
        }
        counts
    }

    /// Iterate over every node id in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }
}
