//! Constants for the formulation tree, MCTS parameters, and collaborator calls.
//!
//! These are the compile-time defaults. Runtime overrides go through
//! [`SearchConfig`](crate::config::SearchConfig) and the CLI flags.

use std::time::Duration;

// =============================================================================
// Formulation Layers
// =============================================================================

/// Depth of a complete formulation (root is layer 0).
pub const COMPLETE_LAYER: usize = 6;

/// Element names by layer. Index 0 is the empty root.
pub const LAYER_NAMES: [&str; COMPLETE_LAYER + 1] = [
    "root",
    "type",
    "sets",
    "parameters",
    "variables",
    "objective",
    "constraints",
];

/// Rendered in place of a formulation when nothing has been generated yet.
pub const EMPTY_PARTIAL: &str = "(none yet)";

// =============================================================================
// MCTS Parameters
// =============================================================================

/// Default number of search iterations per problem.
pub const N_ITERATIONS: usize = 20;

/// UCB1 exploration constant.
pub const EXPLORATION_CONSTANT: f64 = 2.0;

/// Local uncertainty above which a triggered node is re-expanded (η).
pub const UNCERTAINTY_THRESHOLD: f64 = 0.3;

/// Objective score samples per simulation (K).
pub const N_SCORE_SAMPLES: usize = 3;

/// Maximum children per node.
pub const MAX_CHILDREN: usize = 5;

/// Candidates requested from the generator per expansion.
pub const N_CANDIDATES: usize = 3;

/// Candidates more similar than this are treated as duplicates.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Characters compared by the similarity ratio.
pub const SIMILARITY_PREFIX: usize = 300;

/// From this length on, characters that fill more than 1% of the second
/// string cannot seed a matching block.
pub const POPULAR_MIN_LEN: usize = 200;

/// Repair attempts after the first code generation.
pub const MAX_REPAIRS: usize = 12;

// =============================================================================
// Reward Weights
// =============================================================================

/// Weight of the "code ran" indicator.
pub const REWARD_FEASIBLE: f64 = 0.1;

/// Weight of the mean evaluator score.
pub const REWARD_SCORE: f64 = 0.8;

/// Penalty for a failed execution.
pub const REWARD_ERROR: f64 = 0.1;

/// Largest attainable standard deviation of scores in [0, 100].
pub const SCORE_STDDEV_SCALE: f64 = 50.0;

/// Mean negative log-probability (nats) mapped to full local uncertainty.
pub const LOGPROB_SCALE: f64 = 5.0;

// =============================================================================
// Knowledge Base
// =============================================================================

/// Guidance entries per layer before trimming.
pub const KB_MAX_ENTRIES: usize = 20;

/// Entries kept (most recent) after a trim.
pub const KB_KEEP_ENTRIES: usize = 10;

/// Entries injected into an element prompt.
pub const KB_HINT_ENTRIES: usize = 3;

// =============================================================================
// Sampling Temperatures
// =============================================================================

pub const TEMP_ELEMENT: f64 = 0.7;
pub const TEMP_CODE: f64 = 0.0;
pub const TEMP_SCORE: f64 = 0.5;
pub const TEMP_SIGNALS: f64 = 0.2;

// =============================================================================
// Truncation Limits (characters)
// =============================================================================

pub const REPAIR_ERROR_CHARS: usize = 500;
pub const REPAIR_CODE_CHARS: usize = 1500;
pub const SCORE_OUTPUT_CHARS: usize = 300;
pub const SIGNAL_OUTPUT_CHARS: usize = 200;

// =============================================================================
// Collaborator Calls
// =============================================================================

/// Wall-clock limit for one program execution.
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(120);

/// Wall-clock limit for one generator command.
pub const GENERATOR_TIMEOUT: Duration = Duration::from_secs(300);

/// Poll interval while waiting on a running program.
pub const EXEC_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Attempts per generation call before a transient error is surfaced.
pub const RETRY_ATTEMPTS: u32 = 8;

/// First backoff delay; doubles on each retry.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on a single backoff delay.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Error text of the result returned when no iteration produced output.
pub const NO_SOLUTION: &str = "No solution found";
