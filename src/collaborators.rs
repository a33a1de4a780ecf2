//! Interfaces to the external services the search depends on.
//!
//! The search only ever talks to a text generator, a structured evaluator,
//! a code executor and an answer judge through these traits, so tests can
//! swap in deterministic stubs. All calls are blocking.

use crate::error::CollaboratorError;

/// Parsed object returned by a structured evaluator.
pub type StructuredObject = serde_json::Map<String, serde_json::Value>;

/// Outcome of running one generated program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Free-form text completion.
pub trait TextGenerator {
    fn generate(&self, prompt: &str, temperature: f64) -> Result<String, CollaboratorError>;

    /// Completion plus per-token log-probabilities. Generators that cannot
    /// report them return an empty list.
    fn generate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(String, Vec<f64>), CollaboratorError> {
        self.generate(prompt, temperature).map(|text| (text, Vec::new()))
    }
}

/// Completion parsed into an object. A response that does not parse must
/// come back as an empty object, never as an error.
pub trait StructuredEvaluator {
    fn evaluate(&self, prompt: &str, temperature: f64)
    -> Result<StructuredObject, CollaboratorError>;

    /// Parsed object plus log-probabilities of the raw response. The
    /// log-probabilities are returned even when parsing fails.
    fn evaluate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(StructuredObject, Vec<f64>), CollaboratorError> {
        self.evaluate(prompt, temperature).map(|obj| (obj, Vec::new()))
    }
}

/// Runs a program in isolation. Failures, including timeouts, are data.
pub trait CodeExecutor {
    fn execute(&self, source: &str) -> ExecutionResult;
}

/// Parses numeric answers out of program output and checks them.
pub trait AnswerJudge {
    /// Program succeeded and printed something numeric.
    fn is_valid(&self, result: &ExecutionResult) -> bool;

    /// Last number printed, if any.
    fn extract_answer(&self, stdout: &str) -> Option<f64>;

    /// Whether a prediction matches the ground truth.
    fn evaluate(&self, predicted: Option<f64>, actual: f64) -> bool;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str, temperature: f64) -> Result<String, CollaboratorError> {
        (**self).generate(prompt, temperature)
    }

    fn generate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(String, Vec<f64>), CollaboratorError> {
        (**self).generate_with_logprobs(prompt, temperature)
    }
}

impl<T: StructuredEvaluator + ?Sized> StructuredEvaluator for &T {
    fn evaluate(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<StructuredObject, CollaboratorError> {
        (**self).evaluate(prompt, temperature)
    }

    fn evaluate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(StructuredObject, Vec<f64>), CollaboratorError> {
        (**self).evaluate_with_logprobs(prompt, temperature)
    }
}

impl<T: CodeExecutor + ?Sized> CodeExecutor for &T {
    fn execute(&self, source: &str) -> ExecutionResult {
        (**self).execute(source)
    }
}

impl<T: AnswerJudge + ?Sized> AnswerJudge for &T {
    fn is_valid(&self, result: &ExecutionResult) -> bool {
        (**self).is_valid(result)
    }

    fn extract_answer(&self, stdout: &str) -> Option<f64> {
        (**self).extract_answer(stdout)
    }

    fn evaluate(&self, predicted: Option<f64>, actual: f64) -> bool {
        (**self).evaluate(predicted, actual)
    }
}
