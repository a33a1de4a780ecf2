//! Objective scoring, uncertainty estimates and per-element reasoning signals.
//!
//! Two kinds of uncertainty are measured:
//! - global: disagreement across `K` independently sampled objective scores
//! - local: mean negative token log-probability of the reasoning response
//!
//! Malformed evaluator output is never an error; it degrades to score 0 and
//! to signals with `trigger = false`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::collaborators::{ExecutionResult, StructuredEvaluator, StructuredObject};
use crate::constants::{
    LOGPROB_SCALE, SCORE_OUTPUT_CHARS, SCORE_STDDEV_SCALE, SIGNAL_OUTPUT_CHARS, TEMP_SCORE,
    TEMP_SIGNALS,
};
use crate::error::Result;
use crate::formulation::{Element, Formulation};
use crate::prompts::{score_prompt, signals_prompt, truncate};

/// The evaluator's judgement of one formulation element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSignal {
    /// Element needs revision
    pub trigger: bool,
    pub explanation: String,
    /// Advice for future generations; empty when no revision is needed
    pub guidance: String,
    /// Shared confidence of the whole reasoning response
    pub local_uncertainty: f64,
}

/// Signals for every element from one reasoning call.
pub type Signals = BTreeMap<Element, LayerSignal>;

/// Sample `k` objective scores in [0, 100].
pub fn sample_objective_scores<E: StructuredEvaluator + ?Sized>(
    evaluator: &E,
    problem: &str,
    formulation: &str,
    result: &ExecutionResult,
    k: usize,
) -> Result<Vec<u32>> {
    let prompt = score_prompt(
        problem,
        formulation,
        truncate(&result.stdout, SCORE_OUTPUT_CHARS),
    );
    (0..k)
        .map(|_| -> Result<u32> {
            let obj = evaluator.evaluate(&prompt, TEMP_SCORE)?;
            Ok(parse_score(obj.get("score")))
        })
        .collect()
}

/// Read a score, clamped to [0, 100]. Anything unreadable is 0.
pub fn parse_score(value: Option<&Value>) -> u32 {
    let raw = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|i| i as f64)
            .or_else(|| n.as_f64().map(f64::trunc)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| i as f64),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    raw.map(|s| s.clamp(0.0, 100.0) as u32).unwrap_or(0)
}

/// Mean score normalized to [0, 1]; 0 for no samples.
pub fn mean_score(scores: &[u32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64 / 100.0
}

/// Population standard deviation of the scores over 50, capped at 1.
pub fn global_uncertainty(scores: &[u32]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let n = scores.len() as f64;
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    (variance.sqrt() / SCORE_STDDEV_SCALE).min(1.0)
}

/// Mean negative log-probability over 5 nats, capped at 1.
pub fn local_uncertainty(logprobs: &[f64]) -> f64 {
    if logprobs.is_empty() {
        return 0.0;
    }
    let mean_neg = -logprobs.iter().sum::<f64>() / logprobs.len() as f64;
    (mean_neg / LOGPROB_SCALE).clamp(0.0, 1.0)
}

/// Judge all six elements of a complete formulation in a single call.
pub fn reasoning_signals<E: StructuredEvaluator + ?Sized>(
    evaluator: &E,
    problem: &str,
    formulation: &Formulation,
    result: &ExecutionResult,
) -> Result<Signals> {
    let prompt = signals_prompt(problem, &formulation.render(), result, SIGNAL_OUTPUT_CHARS);
    let (obj, logprobs) = evaluator.evaluate_with_logprobs(&prompt, TEMP_SIGNALS)?;
    Ok(parse_signals(&obj, local_uncertainty(&logprobs)))
}

/// Build a signal per element from an evaluator object; absent or malformed
/// entries become neutral signals.
pub fn parse_signals(obj: &StructuredObject, local: f64) -> Signals {
    Element::ALL
        .iter()
        .map(|&element| {
            let entry = obj.get(element.name()).and_then(Value::as_object);
            let signal = LayerSignal {
                trigger: entry
                    .and_then(|e| e.get("trigger"))
                    .map(truthy)
                    .unwrap_or(false),
                explanation: entry
                    .and_then(|e| e.get("explanation"))
                    .map(text)
                    .unwrap_or_default(),
                guidance: entry
                    .and_then(|e| e.get("guidance"))
                    .map(text)
                    .unwrap_or_default(),
                local_uncertainty: local,
            };
            (element, signal)
        })
        .collect()
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_score_clamps_and_defaults() {
        assert_eq!(parse_score(Some(&json!(80))), 80);
        assert_eq!(parse_score(Some(&json!(150))), 100);
        assert_eq!(parse_score(Some(&json!(-3))), 0);
        assert_eq!(parse_score(Some(&json!(72.9))), 72);
        assert_eq!(parse_score(Some(&json!("65"))), 65);
        assert_eq!(parse_score(Some(&json!("high"))), 0);
        assert_eq!(parse_score(Some(&json!(null))), 0);
        assert_eq!(parse_score(None), 0);
    }

    #[test]
    fn test_mean_score() {
        assert!((mean_score(&[80, 80, 80]) - 0.8).abs() < 1e-12);
        assert_eq!(mean_score(&[]), 0.0);
    }

    #[test]
    fn test_global_uncertainty() {
        assert_eq!(global_uncertainty(&[80, 80, 80]), 0.0);
        assert_eq!(global_uncertainty(&[0, 100]), 1.0);
        assert_eq!(global_uncertainty(&[70]), 0.0);
        // std of [50, 100] is 25
        assert!((global_uncertainty(&[50, 100]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_local_uncertainty() {
        assert_eq!(local_uncertainty(&[]), 0.0);
        assert!((local_uncertainty(&[-1.0, -2.0, -3.0]) - 0.4).abs() < 1e-12);
        assert_eq!(local_uncertainty(&[-20.0]), 1.0);
    }

    #[test]
    fn test_parse_signals_defaults_missing_layers() {
        let obj = json!({
            "objective": {"trigger": true, "explanation": "sign flipped", "guidance": "maximize profit"},
            "sets": "not an object",
        });
        let signals = parse_signals(obj.as_object().unwrap(), 0.25);

        assert_eq!(signals.len(), 6);
        let objective = &signals[&Element::Objective];
        assert!(objective.trigger);
        assert_eq!(objective.guidance, "maximize profit");
        assert_eq!(objective.local_uncertainty, 0.25);

        for element in [Element::Type, Element::Sets, Element::Constraints] {
            let s = &signals[&element];
            assert!(!s.trigger);
            assert!(s.guidance.is_empty());
            assert_eq!(s.local_uncertainty, 0.25);
        }
    }

    #[test]
    fn test_parse_signals_empty_object() {
        let signals = parse_signals(&StructuredObject::new(), 0.0);
        assert!(signals.values().all(|s| *s == LayerSignal::default()));
    }
}
