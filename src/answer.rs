//! Numeric answer extraction and comparison against a ground truth.

use std::sync::LazyLock;

use regex::Regex;

use crate::collaborators::{AnswerJudge, ExecutionResult};

/// Relative tolerance when the expected answer is non-zero.
pub const RELATIVE_TOLERANCE: f64 = 0.1;

/// Absolute tolerance when the expected answer is (close to) zero.
pub const ABSOLUTE_TOLERANCE: f64 = 1e-4;

/// Below this magnitude an expected answer is compared absolutely.
pub const ZERO_THRESHOLD: f64 = 1e-8;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d*\.\d+|\d+)").expect("number pattern is a valid regex")
});

/// Whether the text contains a signed integer or decimal.
pub fn contains_number(text: &str) -> bool {
    NUMBER.is_match(text)
}

/// Last number in the text, parsed as a float.
pub fn extract_answer(text: &str) -> Option<f64> {
    NUMBER
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Compare a prediction to the expected answer.
///
/// Uses relative error below [`RELATIVE_TOLERANCE`] for non-zero answers and
/// absolute error below [`ABSOLUTE_TOLERANCE`] otherwise. A missing
/// prediction never matches.
pub fn evaluate(predicted: Option<f64>, actual: f64) -> bool {
    let Some(predicted) = predicted else {
        return false;
    };
    if actual.abs() > ZERO_THRESHOLD {
        ((predicted - actual).abs() / actual.abs()) < RELATIVE_TOLERANCE
    } else {
        (predicted - actual).abs() < ABSOLUTE_TOLERANCE
    }
}

/// Execution succeeded and printed a number.
pub fn is_valid(result: &ExecutionResult) -> bool {
    result.success && contains_number(&result.stdout)
}

/// Default [`AnswerJudge`] backed by the functions in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericJudge;

impl AnswerJudge for NumericJudge {
    fn is_valid(&self, result: &ExecutionResult) -> bool {
        is_valid(result)
    }

    fn extract_answer(&self, stdout: &str) -> Option<f64> {
        extract_answer(stdout)
    }

    fn evaluate(&self, predicted: Option<f64>, actual: f64) -> bool {
        evaluate(predicted, actual)
    }
}
