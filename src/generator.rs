//! Process-backed text generator and a JSON-parsing evaluator adapter.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::collaborators::{StructuredEvaluator, StructuredObject, TextGenerator};
use crate::constants::GENERATOR_TIMEOUT;
use crate::error::CollaboratorError;
use crate::executor::{collect, drain, strip_code_fences, wait_until};

/// Environment variable carrying the sampling temperature to the command.
pub const TEMPERATURE_ENV: &str = "SOLVER_MCTS_TEMPERATURE";

/// [`TextGenerator`] that pipes each prompt into a shell command and reads
/// the completion from its stdout.
///
/// A command still running after the timeout is killed and reported as
/// [`CollaboratorError::Timeout`], which the retry layer treats as transient.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: GENERATOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn timed_out(&self) -> CollaboratorError {
        CollaboratorError::Timeout(format!("`{}` ran past {:?}", self.command, self.timeout))
    }
}

impl TextGenerator for CommandGenerator {
    fn generate(&self, prompt: &str, temperature: f64) -> Result<String, CollaboratorError> {
        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env(TEMPERATURE_ENV, temperature.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CollaboratorError::Process(format!("spawn `{}`: {e}", self.command)))?;

        // stdin is fed concurrently with draining stdout and stderr.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_owned();
            thread::spawn(move || {
                // A command that exits without reading its input closes the pipe.
                let _ = stdin.write_all(prompt.as_bytes());
            });
        }

        let status = wait_until(&mut child, deadline).map_err(|e| {
            CollaboratorError::Connection(format!("wait for `{}`: {e}", self.command))
        })?;
        let Some(status) = status else {
            warn!(command = %self.command, timeout = ?self.timeout, "generator timed out, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Err(self.timed_out());
        };
        let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline))
        else {
            return Err(self.timed_out());
        };

        if !status.success() {
            return Err(CollaboratorError::Process(format!(
                "`{}` exited with {status}: {}",
                self.command,
                stderr.trim()
            )));
        }

        debug!(bytes = stdout.len(), "generator responded");
        Ok(stdout.trim().to_string())
    }
}

/// Parse a model response into an object; anything else becomes `{}`.
pub fn parse_object(text: &str) -> StructuredObject {
    match serde_json::from_str::<Value>(strip_code_fences(text)) {
        Ok(Value::Object(map)) => map,
        _ => StructuredObject::new(),
    }
}

/// [`StructuredEvaluator`] that asks a [`TextGenerator`] for JSON and parses it.
#[derive(Debug, Clone)]
pub struct JsonEvaluator<G> {
    generator: G,
}

impl<G: TextGenerator> JsonEvaluator<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl<G: TextGenerator> StructuredEvaluator for JsonEvaluator<G> {
    fn evaluate(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<StructuredObject, CollaboratorError> {
        let text = self.generator.generate(prompt, temperature)?;
        Ok(parse_object(&text))
    }

    fn evaluate_with_logprobs(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> Result<(StructuredObject, Vec<f64>), CollaboratorError> {
        let (text, logprobs) = self.generator.generate_with_logprobs(prompt, temperature)?;
        Ok((parse_object(&text), logprobs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl TextGenerator for Fixed {
        fn generate(&self, _: &str, _: f64) -> Result<String, CollaboratorError> {
            Ok(self.0.to_string())
        }

        fn generate_with_logprobs(
            &self,
            prompt: &str,
            temperature: f64,
        ) -> Result<(String, Vec<f64>), CollaboratorError> {
            Ok((self.generate(prompt, temperature)?, vec![-0.5, -1.5]))
        }
    }

    #[test]
    fn test_parse_object() {
        let obj = parse_object(r#"{"score": 80}"#);
        assert_eq!(obj.get("score").and_then(Value::as_i64), Some(80));
    }

    #[test]
    fn test_parse_fenced_object() {
        let obj = parse_object("```\n{\"score\": 7}\n```");
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_malformed_degrades_to_empty() {
        assert!(parse_object("score: eighty").is_empty());
        assert!(parse_object("[1, 2, 3]").is_empty());
        assert!(parse_object("").is_empty());
    }

    #[test]
    fn test_logprobs_survive_parse_failure() {
        let eval = JsonEvaluator::new(Fixed("not json"));
        let (obj, logprobs) = eval.evaluate_with_logprobs("p", 0.2).unwrap();
        assert!(obj.is_empty());
        assert_eq!(logprobs, vec![-0.5, -1.5]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_generator_echoes_stdin() {
        let generator = CommandGenerator::new("tr a-z A-Z");
        assert_eq!(generator.generate("hello", 0.0).unwrap(), "HELLO");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_generator_reports_exit_status() {
        let generator = CommandGenerator::new("cat >/dev/null; exit 3");
        let err = generator.generate("hello", 0.0).unwrap_err();
        assert!(matches!(err, CollaboratorError::Process(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_generator_times_out() {
        let generator =
            CommandGenerator::new("sleep 5; echo late").with_timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = generator.generate("x", 0.0).unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout(_)));
        assert!(err.is_transient());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_generator_large_prompt_echo() {
        // Larger than a pipe buffer in both directions.
        let prompt = "x".repeat(1 << 20);
        let generator = CommandGenerator::new("cat");
        assert_eq!(generator.generate(&prompt, 0.0).unwrap().len(), prompt.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_generator_sees_temperature() {
        let generator = CommandGenerator::new("cat >/dev/null; echo $SOLVER_MCTS_TEMPERATURE");
        assert_eq!(generator.generate("x", 0.7).unwrap(), "0.7");
    }
}
