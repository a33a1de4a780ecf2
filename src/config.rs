//! Runtime configuration for a search and its collaborators.
//!
//! Every field defaults to the matching value in [`constants`](crate::constants).

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    EXEC_TIMEOUT, EXPLORATION_CONSTANT, MAX_CHILDREN, MAX_REPAIRS, N_CANDIDATES, N_ITERATIONS,
    N_SCORE_SAMPLES, RETRY_ATTEMPTS, RETRY_BASE_DELAY, RETRY_MAX_DELAY, SIMILARITY_THRESHOLD,
    UNCERTAINTY_THRESHOLD,
};
use crate::error::{Result, SearchError};

/// Parameters of one MCTS search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Maximum select/expand/simulate/backpropagate rounds
    pub n_iterations: usize,
    /// UCB1 exploration constant (C)
    pub exploration_constant: f64,
    /// Dynamic expansion threshold on local uncertainty (η)
    pub uncertainty_threshold: f64,
    /// Objective score samples per simulation (K)
    pub n_score_samples: usize,
    /// Children allowed per node
    pub max_children: usize,
    /// Candidates requested per expansion
    pub n_candidates: usize,
    /// Similarity above which candidates are duplicates
    pub similarity_threshold: f64,
    /// Code repair attempts after the first generation
    pub max_repairs: usize,
    /// Seed for tie-breaking randomness; reapplied at the start of every search
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_iterations: N_ITERATIONS,
            exploration_constant: EXPLORATION_CONSTANT,
            uncertainty_threshold: UNCERTAINTY_THRESHOLD,
            n_score_samples: N_SCORE_SAMPLES,
            max_children: MAX_CHILDREN,
            n_candidates: N_CANDIDATES,
            similarity_threshold: SIMILARITY_THRESHOLD,
            max_repairs: MAX_REPAIRS,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Check that the parameters describe a runnable search.
    pub fn validate(&self) -> Result<()> {
        if self.n_iterations == 0 {
            return Err(invalid("n_iterations must be at least 1"));
        }
        if self.n_score_samples == 0 {
            return Err(invalid("n_score_samples must be at least 1"));
        }
        if self.n_candidates == 0 {
            return Err(invalid("n_candidates must be at least 1"));
        }
        if self.max_children == 0 {
            return Err(invalid("max_children must be at least 1"));
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(invalid(format!(
                "exploration_constant must be finite and non-negative (got {})",
                self.exploration_constant
            )));
        }
        for (name, v) in [
            ("uncertainty_threshold", self.uncertainty_threshold),
            ("similarity_threshold", self.similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(invalid(format!("{name} must be within [0, 1] (got {v})")));
            }
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> SearchError {
    SearchError::InvalidConfig(msg.into())
}

/// Exponential backoff applied to generator and evaluator calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_ATTEMPTS,
            base_delay: RETRY_BASE_DELAY,
            max_delay: RETRY_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// How generated programs are run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    pub interpreter: PathBuf,
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
            timeout: EXEC_TIMEOUT,
        }
    }
}
