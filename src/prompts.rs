//! Prompt templates sent to the generator and evaluator.

use crate::collaborators::ExecutionResult;
use crate::formulation::Element;

/// Cut `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Ask for a single formulation element given everything fixed so far.
pub fn element_prompt(problem: &str, partial: &str, hints: &str, element: Element) -> String {
    format!(
        "You are an expert in mathematical optimization.\n\n\
         Problem:\n{problem}\n\n\
         Formulation so far:\n{partial}\n\
         {hints}\n\
         Generate ONLY the \"{name}\" component of the mathematical formulation.\n\
         Be concise and precise. Do not write code.",
        name = element.name(),
    )
}

/// Ask for a solver program implementing a complete formulation.
pub fn code_prompt(problem: &str, formulation: &str) -> String {
    format!(
        "Based on the problem and mathematical formulation below, write Python code to solve it.\n\n\
         Original problem:\n{problem}\n\n\
         Mathematical formulation:\n{formulation}\n\n\
         Requirements:\n\
         - Use scipy.optimize or PuLP (for integer programs)\n\
         - Output ONLY executable Python code, no markdown, no explanation\n\
         - Print the optimal objective value as the LAST line of output\n\
         - If infeasible or unbounded, print 0"
    )
}

/// Ask for a fixed version of a failing program.
pub fn repair_prompt(error: &str, code: &str) -> String {
    format!(
        "The following Python code failed. Please fix it.\n\n\
         Error:\n{error}\n\n\
         Original code:\n{code}\n\n\
         Requirements:\n\
         - Output ONLY executable Python code, no markdown, no explanation\n\
         - Print the optimal objective value as the LAST line of output\n\
         - If infeasible or unbounded, print 0"
    )
}

/// Ask for a 0-100 quality score of a solved formulation.
pub fn score_prompt(problem: &str, formulation: &str, output: &str) -> String {
    format!(
        "You are evaluating an optimization problem solution.\n\n\
         Problem:\n{problem}\n\n\
         Mathematical formulation:\n{formulation}\n\n\
         Execution output:\n{output}\n\n\
         Score the overall solution quality from 0 to 100:\n\
         - 0-25:   Poor  (crashes, infeasible, or completely wrong answer)\n\
         - 26-50:  Fair  (runs but answer is significantly wrong)\n\
         - 51-75:  Good  (reasonable formulation, answer is close)\n\
         - 76-100: Excellent (correct formulation, correct answer)\n\n\
         Return JSON: {{\"score\": <integer 0-100>}}"
    )
}

/// Ask for a per-element review of a complete formulation.
pub fn signals_prompt(
    problem: &str,
    formulation: &str,
    result: &ExecutionResult,
    max_chars: usize,
) -> String {
    let keys: Vec<String> = Element::ALL
        .iter()
        .map(|e| format!("\"{}\"", e.name()))
        .collect();
    format!(
        "You are reviewing a mathematical optimization formulation.\n\n\
         Problem:\n{problem}\n\n\
         Complete formulation:\n{formulation}\n\n\
         Execution result - success={success}, output={output}, error={error}\n\n\
         For EACH of the 6 formulation elements, evaluate its quality.\n\
         Return a JSON object with keys: {keys}.\n\
         Each value must have:\n  \
         \"trigger\":     true if this element has issues needing revision, else false\n  \
         \"explanation\": one sentence on quality\n  \
         \"guidance\":    specific improvement advice if trigger=true, else \"\"\n\n\
         JSON:",
        success = if result.success { "True" } else { "False" },
        output = truncate(&result.stdout, max_chars),
        error = truncate(&result.stderr, max_chars),
        keys = keys.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("héllo", 2), "hé");
    }

    #[test]
    fn test_element_prompt_mentions_element() {
        let p = element_prompt("min x", "(none yet)", "", Element::Objective);
        assert!(p.contains("\"objective\""));
        assert!(p.contains("min x"));
    }

    #[test]
    fn test_signals_prompt_lists_all_keys() {
        let p = signals_prompt("p", "f", &ExecutionResult::success("1"), 200);
        for e in Element::ALL {
            assert!(p.contains(&format!("\"{}\"", e.name())));
        }
    }
}
