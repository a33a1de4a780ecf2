//! Solver-MCTS command-line front end.
//!
//! ## Usage
//!
//! - `solver-mcts solve --problem "..." --generator-cmd "llm-cli"` - Search one problem
//! - `solver-mcts extract --file out.txt --expected 42` - Check program output

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use solver_mcts::answer::{evaluate, extract_answer};
use solver_mcts::config::{ExecutorConfig, RetryPolicy, SearchConfig};
use solver_mcts::constants::{
    EXPLORATION_CONSTANT, GENERATOR_TIMEOUT, N_ITERATIONS, N_SCORE_SAMPLES, UNCERTAINTY_THRESHOLD,
};
use solver_mcts::executor::PythonExecutor;
use solver_mcts::generator::{CommandGenerator, JsonEvaluator};
use solver_mcts::mcts::Mcts;
use solver_mcts::retry::Retrying;

/// Solver-MCTS: formulate and solve optimization problems with tree search
#[derive(Parser)]
#[command(name = "solver-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a formulation of one problem and run its solver program
    Solve(SolveArgs),
    /// Extract the numeric answer from program output
    Extract {
        /// File holding the output (stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Ground-truth answer to compare against
        #[arg(long, allow_hyphen_values = true)]
        expected: Option<f64>,
    },
}

#[derive(Args)]
struct SolveArgs {
    /// Problem statement
    #[arg(long, conflicts_with = "problem_file")]
    problem: Option<String>,
    /// File holding the problem statement
    #[arg(long)]
    problem_file: Option<PathBuf>,
    /// Ground-truth answer; a matching result ends the search early
    #[arg(long, allow_hyphen_values = true)]
    expected: Option<f64>,
    /// Shell command that reads a prompt on stdin and prints a completion
    #[arg(long)]
    generator_cmd: String,
    /// Time limit per generator call, in seconds
    #[arg(long, default_value_t = GENERATOR_TIMEOUT.as_secs())]
    generator_timeout_secs: u64,
    /// Interpreter for generated programs
    #[arg(long, default_value = "python3")]
    python: PathBuf,
    /// Time limit per program run, in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
    #[arg(long, default_value_t = N_ITERATIONS)]
    iterations: usize,
    /// UCB1 exploration constant
    #[arg(long, default_value_t = EXPLORATION_CONSTANT)]
    exploration: f64,
    /// Dynamic expansion threshold on local uncertainty
    #[arg(long, default_value_t = UNCERTAINTY_THRESHOLD)]
    eta: f64,
    /// Objective score samples per simulation
    #[arg(long, default_value_t = N_SCORE_SAMPLES)]
    samples: usize,
    /// Seed for reproducible tie-breaking
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Solve(args) => run_solve(args),
        Commands::Extract { file, expected } => run_extract(file, expected),
    }
}

fn run_solve(args: SolveArgs) -> Result<()> {
    let problem = match (&args.problem, &args.problem_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("reading problem from {}", path.display()))?,
        (None, None) => bail!("one of --problem or --problem-file is required"),
    };

    let config = SearchConfig {
        n_iterations: args.iterations,
        exploration_constant: args.exploration,
        uncertainty_threshold: args.eta,
        n_score_samples: args.samples,
        seed: args.seed,
        ..SearchConfig::default()
    };

    let generator = Retrying::new(
        CommandGenerator::new(args.generator_cmd)
            .with_timeout(Duration::from_secs(args.generator_timeout_secs)),
        RetryPolicy::default(),
    );
    let evaluator = JsonEvaluator::new(&generator);
    let executor = PythonExecutor::new(ExecutorConfig {
        interpreter: args.python,
        timeout: Duration::from_secs(args.timeout_secs),
    });

    let mut search = Mcts::new(&generator, evaluator, executor, config);
    let report = search
        .run(problem.trim(), args.expected)
        .context("search aborted")?;

    let result = &report.result;
    println!("success: {}", result.success);
    println!("iterations: {}", report.iterations);
    println!("tree nodes: {}", report.tree.size());
    if !result.stdout.is_empty() {
        println!("stdout:\n{}", result.stdout.trim_end());
    }
    if !result.stderr.is_empty() {
        println!("stderr:\n{}", result.stderr.trim_end());
    }

    let predicted = extract_answer(&result.stdout);
    match predicted {
        Some(answer) => println!("answer: {answer}"),
        None => println!("answer: none"),
    }
    if let Some(expected) = args.expected {
        println!("correct: {}", evaluate(predicted, expected));
    }
    Ok(())
}

fn run_extract(file: Option<PathBuf>, expected: Option<f64>) -> Result<()> {
    let output = match file {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("reading output from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading output from stdin")?;
            buf
        }
    };

    let predicted = extract_answer(&output);
    match predicted {
        Some(answer) => println!("{answer}"),
        None => println!("none"),
    }
    if let Some(expected) = expected {
        println!("correct: {}", evaluate(predicted, expected));
    }
    Ok(())
}
