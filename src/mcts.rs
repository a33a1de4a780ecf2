//! Monte Carlo Tree Search over optimization formulations.
//!
//! This module implements MCTS with:
//! - UCB1 for node selection, with every new child tried once first
//! - Dynamic expansion: a node flagged for revision with high evaluator
//!   uncertainty is grown again even though it already has children
//! - Prompt backpropagation: evaluator guidance feeds a per-search knowledge
//!   base that is injected into later element prompts
//! - Uncertainty backpropagation: rewards are damped by `exp(-U_global)`
//!
//! Each iteration selects a node, expands it by one layer, completes the
//! chosen branch into a full formulation, generates and runs code for it,
//! scores the result and backpropagates the reward.

use fastrand::Rng;
use tracing::{debug, info};

use crate::answer::NumericJudge;
use crate::candidates::CandidateGenerator;
use crate::codegen::generate_and_execute;
use crate::collaborators::{
    AnswerJudge, CodeExecutor, ExecutionResult, StructuredEvaluator, TextGenerator,
};
use crate::config::SearchConfig;
use crate::constants::{NO_SOLUTION, REWARD_ERROR, REWARD_FEASIBLE, REWARD_SCORE};
use crate::error::Result;
use crate::evaluator::{
    Signals, global_uncertainty, mean_score, reasoning_signals, sample_objective_scores,
};
use crate::formulation::Formulation;
use crate::knowledge::KnowledgeBase;
use crate::tree::{FormulationTree, NodeId};

/// `0.1 * feasible + 0.8 * mean_score - 0.1 * error`, clamped to [0, 1].
pub fn reward(success: bool, mean_score: f64) -> f64 {
    let feasible = if success { 1.0 } else { 0.0 };
    let error = 1.0 - feasible;
    (REWARD_FEASIBLE * feasible + REWARD_SCORE * mean_score - REWARD_ERROR * error).clamp(0.0, 1.0)
}

/// Everything one simulation produced.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub reward: f64,
    pub result: ExecutionResult,
    pub global_uncertainty: f64,
    pub mean_score: f64,
    pub signals: Signals,
    pub formulation: Formulation,
}

/// Outcome of a full search, including the tree it built.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Proven-correct result, else the first successful one, else a failure
    pub result: ExecutionResult,
    /// Iterations started (skipped ones included)
    pub iterations: usize,
    /// Some iteration reached reward 1.0
    pub found_correct: bool,
    pub tree: FormulationTree,
}

/// A formulation search bound to its collaborators.
///
/// The knowledge base and random source belong to the instance and are
/// reset at the start of every search, so separate instances never share
/// state.
pub struct Mcts<G, E, X, J = NumericJudge> {
    config: SearchConfig,
    generator: G,
    evaluator: E,
    executor: X,
    judge: J,
    knowledge: KnowledgeBase,
    rng: Rng,
}

impl<G, E, X> Mcts<G, E, X, NumericJudge>
where
    G: TextGenerator,
    E: StructuredEvaluator,
    X: CodeExecutor,
{
    /// Search using the default numeric answer judge.
    pub fn new(generator: G, evaluator: E, executor: X, config: SearchConfig) -> Self {
        Self::with_judge(generator, evaluator, executor, NumericJudge, config)
    }
}

impl<G, E, X, J> Mcts<G, E, X, J>
where
    G: TextGenerator,
    E: StructuredEvaluator,
    X: CodeExecutor,
    J: AnswerJudge,
{
    pub fn with_judge(
        generator: G,
        evaluator: E,
        executor: X,
        judge: J,
        config: SearchConfig,
    ) -> Self {
        let rng = config.seed.map(Rng::with_seed).unwrap_or_default();
        Self {
            config,
            generator,
            evaluator,
            executor,
            judge,
            knowledge: KnowledgeBase::new(),
            rng,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Guidance gathered by the most recent search.
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Search for a formulation of `problem` and return its execution result.
    ///
    /// With `expected` set, a result whose printed answer matches stops the
    /// search immediately. Callers must check `success` themselves: when no
    /// iteration succeeded the result is a failure reading "No solution found".
    pub fn search(&mut self, problem: &str, expected: Option<f64>) -> Result<ExecutionResult> {
        self.run(problem, expected).map(|report| report.result)
    }

    /// Like [`search`](Self::search) but also returns the tree and counters.
    pub fn run(&mut self, problem: &str, expected: Option<f64>) -> Result<SearchReport> {
        self.config.validate()?;
        self.knowledge.clear();
        if let Some(seed) = self.config.seed {
            self.rng.seed(seed);
        }

        let mut tree = FormulationTree::new(problem, self.config.max_children);
        let mut best = ExecutionResult::failure(NO_SOLUTION);
        let mut found_correct = false;
        let mut iterations = 0;

        for i in 1..=self.config.n_iterations {
            iterations = i;

            let selected = self.select(&tree);
            let Some(child) = self.expand(&mut tree, selected)? else {
                debug!(iteration = i, "selected node is complete, skipping");
                continue;
            };

            let sim = self.simulate(&tree, child, expected)?;
            tree.node_mut(child).last_result = Some(sim.result.clone());
            self.backpropagate(
                &mut tree,
                child,
                sim.reward,
                sim.global_uncertainty,
                &sim.signals,
            );

            if sim.reward >= 1.0 && !found_correct {
                info!(iteration = i, "correct answer found, stopping early");
                best = sim.result;
                found_correct = true;
                break;
            }

            // The first success is kept even if a later one scores higher.
            if sim.result.success && !found_correct && !best.success {
                best = sim.result.clone();
            }

            info!(
                iteration = i,
                reward = sim.reward,
                global_uncertainty = sim.global_uncertainty,
                nodes = tree.size(),
                "iteration finished"
            );
        }

        Ok(SearchReport {
            result: best,
            iterations,
            found_correct,
            tree,
        })
    }

    /// Walk down from the root to the node to expand this iteration.
    ///
    /// Stops at a leaf, or at an incomplete inner node whose last evaluation
    /// set `trigger` with local uncertainty above η. Otherwise descends into a
    /// random unvisited child if there is one, else the best UCB1 child.
    pub fn select(&mut self, tree: &FormulationTree) -> NodeId {
        let mut id = tree.root();
        loop {
            let node = tree.node(id);
            if !node.is_root()
                && !node.is_leaf()
                && !node.is_complete()
                && node.trigger
                && node.local_uncertainty > self.config.uncertainty_threshold
            {
                debug!(layer = node.layer, "dynamic expansion");
                return id;
            }

            if node.is_leaf() {
                return id;
            }

            let unvisited: Vec<NodeId> = node
                .children()
                .iter()
                .copied()
                .filter(|&c| tree.node(c).visits == 0)
                .collect();
            if !unvisited.is_empty() {
                return unvisited[self.rng.usize(..unvisited.len())];
            }

            match tree.best_child(id, self.config.exploration_constant) {
                Some(child) => id = child,
                None => return id,
            }
        }
    }

    /// Grow `id` by one layer; `None` when it is already complete.
    pub fn expand(&mut self, tree: &mut FormulationTree, id: NodeId) -> Result<Option<NodeId>> {
        CandidateGenerator::new(&self.generator, &self.config).expand(
            tree,
            id,
            &self.knowledge,
            &mut self.rng,
        )
    }

    /// Complete the branch at `id`, run it, and score the outcome.
    pub fn simulate(
        &self,
        tree: &FormulationTree,
        id: NodeId,
        expected: Option<f64>,
    ) -> Result<Simulation> {
        let problem = tree.problem();
        let formulation = CandidateGenerator::new(&self.generator, &self.config).complete(
            tree,
            id,
            &self.knowledge,
        )?;
        let text = formulation.render();

        let result = generate_and_execute(
            &self.generator,
            &self.executor,
            &self.judge,
            problem,
            &text,
            self.config.max_repairs,
        )?;

        let scores = sample_objective_scores(
            &self.evaluator,
            problem,
            &text,
            &result,
            self.config.n_score_samples,
        )?;
        let global = global_uncertainty(&scores);
        let mean = mean_score(&scores);
        let mut r = reward(result.success, mean);

        if let Some(expected) = expected {
            if self.judge.is_valid(&result) {
                let predicted = self.judge.extract_answer(&result.stdout);
                if self.judge.evaluate(predicted, expected) {
                    r = 1.0;
                }
            }
        }

        let signals = reasoning_signals(&self.evaluator, problem, &formulation, &result)?;

        Ok(Simulation {
            reward: r,
            result,
            global_uncertainty: global,
            mean_score: mean,
            signals,
            formulation,
        })
    }

    /// Record guidance and propagate the reward from `id` up to the root.
    ///
    /// Each node's value moves toward the reward by `exp(-U_global) / visits`.
    /// Nodes also take the trigger and local uncertainty of the signal for
    /// their own element.
    pub fn backpropagate(
        &mut self,
        tree: &mut FormulationTree,
        id: NodeId,
        reward: f64,
        global_uncertainty: f64,
        signals: &Signals,
    ) {
        for (&element, signal) in signals {
            if !signal.guidance.is_empty() {
                self.knowledge.insert(element, signal.guidance.clone());
            }
        }

        let reward = reward.clamp(0.0, 1.0);
        let rho = (-global_uncertainty.max(0.0)).exp();
        for ancestor in tree.path_to_root(id) {
            let node = tree.node_mut(ancestor);
            node.visits += 1;
            node.value += rho * (reward - node.value) / node.visits as f64;

            if let Some(signal) = node.element().and_then(|e| signals.get(&e)) {
                node.trigger = signal.trigger;
                node.local_uncertainty = signal.local_uncertainty;
            }
        }
    }
}
