//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use serde_json::{Value, json};

use solver_mcts::collaborators::{
    CodeExecutor, ExecutionResult, StructuredEvaluator, StructuredObject, TextGenerator,
};
use solver_mcts::error::CollaboratorError;

// =============================================================================
// Text generator
// =============================================================================

/// Generator that answers code prompts with a fixed program and element
/// prompts with text chosen per element.
pub struct StubGenerator {
    /// Fixed text for every element, or `None` for pseudo-random text
    pub fixed_element: Option<String>,
    /// Elements (by name) that always get the same fixed text
    pub fixed_for: Vec<(&'static str, &'static str)>,
    pub calls: Cell<usize>,
    pub prompts: RefCell<Vec<String>>,
}

impl StubGenerator {
    /// Every element gets the same text.
    pub fn fixed(text: &str) -> Self {
        Self {
            fixed_element: Some(text.to_string()),
            fixed_for: Vec::new(),
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Every element gets distinct pseudo-random text derived from the call count.
    pub fn varied() -> Self {
        Self {
            fixed_element: None,
            fixed_for: Vec::new(),
            calls: Cell::new(0),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn with_fixed_for(mut self, element: &'static str, text: &'static str) -> Self {
        self.fixed_for.push((element, text));
        self
    }

    pub fn element_prompts(&self) -> Vec<String> {
        self.prompts
            .borrow()
            .iter()
            .filter(|p| p.contains("Generate ONLY the"))
            .cloned()
            .collect()
    }
}

/// Lower-case words built from a seeded generator; unrelated seeds give
/// texts that are far apart in similarity.
pub fn random_text(seed: u64) -> String {
    let mut rng = fastrand::Rng::with_seed(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0xA5A5);
    (0..12)
        .map(|_| {
            let len = rng.usize(3..8);
            (0..len).map(|_| rng.lowercase()).collect::<String>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl TextGenerator for StubGenerator {
    fn generate(&self, prompt: &str, _temperature: f64) -> Result<String, CollaboratorError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        self.prompts.borrow_mut().push(prompt.to_string());

        if !prompt.contains("Generate ONLY the") {
            return Ok("print(result)".to_string());
        }
        for (element, text) in &self.fixed_for {
            if prompt.contains(&format!("\"{element}\" component")) {
                return Ok(text.to_string());
            }
        }
        Ok(match &self.fixed_element {
            Some(text) => text.clone(),
            None => random_text(n as u64),
        })
    }
}

/// Generator that always fails with the given error kind.
pub struct FailingGenerator {
    pub transient: bool,
    pub calls: Cell<usize>,
}

impl TextGenerator for FailingGenerator {
    fn generate(&self, _: &str, _: f64) -> Result<String, CollaboratorError> {
        self.calls.set(self.calls.get() + 1);
        if self.transient {
            Err(CollaboratorError::RateLimited("429 Too Many Requests".into()))
        } else {
            Err(CollaboratorError::Other("invalid api key".into()))
        }
    }
}

// =============================================================================
// Structured evaluator
// =============================================================================

/// Evaluator that cycles through fixed scores and returns fixed signals.
pub struct StubEvaluator {
    pub scores: Vec<Value>,
    pub signals: Value,
    pub logprobs: Vec<f64>,
    pub score_calls: Cell<usize>,
    pub signal_calls: Cell<usize>,
}

impl StubEvaluator {
    pub fn scores(scores: &[i64]) -> Self {
        Self {
            scores: scores.iter().map(|&s| json!({ "score": s })).collect(),
            signals: json!({}),
            logprobs: Vec::new(),
            score_calls: Cell::new(0),
            signal_calls: Cell::new(0),
        }
    }

    pub fn with_signals(mut self, signals: Value, logprobs: Vec<f64>) -> Self {
        self.signals = signals;
        self.logprobs = logprobs;
        self
    }
}

fn as_object(value: &Value) -> StructuredObject {
    value.as_object().cloned().unwrap_or_default()
}

impl StructuredEvaluator for StubEvaluator {
    fn evaluate(&self, _: &str, _: f64) -> Result<StructuredObject, CollaboratorError> {
        let n = self.score_calls.get();
        self.score_calls.set(n + 1);
        Ok(as_object(&self.scores[n % self.scores.len()]))
    }

    fn evaluate_with_logprobs(
        &self,
        _: &str,
        _: f64,
    ) -> Result<(StructuredObject, Vec<f64>), CollaboratorError> {
        self.signal_calls.set(self.signal_calls.get() + 1);
        Ok((as_object(&self.signals), self.logprobs.clone()))
    }
}

// =============================================================================
// Code executor
// =============================================================================

/// Executor that returns queued outputs in order, repeating the last one.
pub struct StubExecutor {
    pub outputs: Vec<ExecutionResult>,
    pub calls: Cell<usize>,
}

impl StubExecutor {
    pub fn always(result: ExecutionResult) -> Self {
        Self::sequence(vec![result])
    }

    pub fn sequence(outputs: Vec<ExecutionResult>) -> Self {
        Self {
            outputs,
            calls: Cell::new(0),
        }
    }
}

impl CodeExecutor for StubExecutor {
    fn execute(&self, _source: &str) -> ExecutionResult {
        let n = self.calls.get();
        self.calls.set(n + 1);
        let idx = n.min(self.outputs.len() - 1);
        self.outputs[idx].clone()
    }
}
