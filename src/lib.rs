//! Solver-MCTS: Monte Carlo Tree Search for optimization problem formulation.
//!
//! This crate searches over six-layer formulations (type, sets, parameters,
//! variables, objective, constraints) of a natural-language optimization
//! problem. Elements are proposed by a text generator, turned into solver
//! programs, executed, and scored by an evaluator; the scores steer the tree.
//!
//! ## Modules
//!
//! - [`mcts`] - Search controller (select, expand, simulate, backpropagate)
//! - [`tree`] - Arena-backed formulation tree and UCB1
//! - [`candidates`] - Element generation, pruning and expansion
//! - [`codegen`] - Code generation with a bounded repair loop
//! - [`evaluator`] - Objective scores, uncertainty and reasoning signals
//! - [`knowledge`] - Per-search guidance store
//! - [`similarity`] - Near-duplicate detection
//! - [`collaborators`] - Traits for the generator, evaluator, executor and judge
//! - [`executor`], [`generator`], [`answer`], [`retry`] - Concrete collaborators
//! - [`config`], [`constants`], [`error`] - Parameters and error types
//!
//! ## Example
//!
//! ```no_run
//! use solver_mcts::config::{ExecutorConfig, RetryPolicy, SearchConfig};
//! use solver_mcts::executor::PythonExecutor;
//! use solver_mcts::generator::{CommandGenerator, JsonEvaluator};
//! use solver_mcts::mcts::Mcts;
//! use solver_mcts::retry::Retrying;
//!
//! let generator = Retrying::new(CommandGenerator::new("llm-cli"), RetryPolicy::default());
//! let evaluator = JsonEvaluator::new(&generator);
//! let executor = PythonExecutor::new(ExecutorConfig::default());
//!
//! let mut search = Mcts::new(&generator, evaluator, executor, SearchConfig::default());
//! let result = search.search("Maximize 3x + 2y subject to x + y <= 4.", Some(12.0))?;
//! println!("success={} output={}", result.success, result.stdout);
//! # Ok::<(), solver_mcts::error::SearchError>(())
//! ```

pub mod answer;
pub mod candidates;
pub mod codegen;
pub mod collaborators;
pub mod config;
pub mod constants;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod formulation;
pub mod generator;
pub mod knowledge;
pub mod mcts;
pub mod prompts;
pub mod retry;
pub mod similarity;
pub mod tree;
