//! Bounded exponential backoff for generator and evaluator calls.

use std::thread;

use tracing::warn;

use crate::collaborators::{StructuredEvaluator, StructuredObject, TextGenerator};
use crate::config::RetryPolicy;
use crate::error::CollaboratorError;

/// Run `op` until it succeeds, fails permanently, or the attempt budget is spent.
///
/// Only transient errors are retried. The error from the last attempt is
/// returned unchanged.
pub fn retry_with_backoff<T, F>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Result<T, CollaboratorError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(operation, attempt, ?delay, error = %e, "transient failure, backing off");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Wraps a collaborator so every call goes through [`retry_with_backoff`].
#[derive(Debug, Clone)]
pub struct Retrying<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> Retrying<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<G: TextGenerator> TextGenerator for Retrying<G> {
    fn generate(&self, prompt: &str, temperature: f64) -> Result<String, CollaboratorError> {
        retry_with_backoff(&self.policy, "generate", || {
            self.inner.generate(prompt, temperature)
        })
    }

    fn generate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(String, Vec<f64>), CollaboratorError> {
        retry_with_backoff(&self.policy, "generate_with_logprobs", || {
            self.inner.generate_with_logprobs(prompt, temperature)
        })
    }
}

impl<E: StructuredEvaluator> StructuredEvaluator for Retrying<E> {
    fn evaluate(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<StructuredObject, CollaboratorError> {
        retry_with_backoff(&self.policy, "evaluate", || {
            self.inner.evaluate(prompt, temperature)
        })
    }

    fn evaluate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(StructuredObject, Vec<f64>), CollaboratorError> {
        retry_with_backoff(&self.policy, "evaluate_with_logprobs", || {
            self.inner.evaluate_with_logprobs(prompt, temperature)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let calls = Cell::new(0);
        let result = retry_with_backoff(&instant_policy(8), "test", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(CollaboratorError::RateLimited("429".into()))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_budget() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_with_backoff(&instant_policy(8), "test", || {
            calls.set(calls.get() + 1);
            Err(CollaboratorError::Timeout("slow".into()))
        });
        assert!(matches!(result, Err(CollaboratorError::Timeout(_))));
        assert_eq!(calls.get(), 8);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_with_backoff(&instant_policy(8), "test", || {
            calls.set(calls.get() + 1);
            Err(CollaboratorError::Other("bad request".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    struct Flaky {
        failures_left: Cell<u32>,
    }

    impl TextGenerator for Flaky {
        fn generate(&self, prompt: &str, _: f64) -> Result<String, CollaboratorError> {
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(CollaboratorError::Connection("reset".into()));
            }
            Ok(prompt.to_uppercase())
        }
    }

    #[test]
    fn test_retrying_generator() {
        let generator = Retrying::new(
            Flaky {
                failures_left: Cell::new(2),
            },
            instant_policy(3),
        );
        assert_eq!(generator.generate("ok", 0.0).unwrap(), "OK");
    }
}
