//! Code generation with a bounded repair loop.

use tracing::debug;

use crate::collaborators::{AnswerJudge, CodeExecutor, ExecutionResult, TextGenerator};
use crate::constants::{REPAIR_CODE_CHARS, REPAIR_ERROR_CHARS, TEMP_CODE};
use crate::error::Result;
use crate::prompts::{code_prompt, repair_prompt, truncate};

/// Generate a program for `formulation`, run it, and ask for fixes until
/// the result is valid or `max_repairs` repairs have been tried.
///
/// The last execution result is returned whether or not it is valid.
pub fn generate_and_execute<G, X, J>(
    generator: &G,
    executor: &X,
    judge: &J,
    problem: &str,
    formulation: &str,
    max_repairs: usize,
) -> Result<ExecutionResult>
where
    G: TextGenerator + ?Sized,
    X: CodeExecutor + ?Sized,
    J: AnswerJudge + ?Sized,
{
    let mut code = generator.generate(&code_prompt(problem, formulation), TEMP_CODE)?;
    let mut result = executor.execute(&code);

    for attempt in 1..=max_repairs {
        if judge.is_valid(&result) {
            break;
        }
        debug!(attempt, error = %truncate(&result.stderr, 120), "repairing program");
        let prompt = repair_prompt(
            truncate(&result.stderr, REPAIR_ERROR_CHARS),
            truncate(&code, REPAIR_CODE_CHARS),
        );
        code = generator.generate(&prompt, TEMP_CODE)?;
        result = executor.execute(&code);
    }

    Ok(result)
}
