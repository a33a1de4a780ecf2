//! Runs generated Python programs in a child process with a wall-clock limit.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

use crate::collaborators::{CodeExecutor, ExecutionResult};
use crate::config::ExecutorConfig;
use crate::constants::EXEC_POLL_INTERVAL;

/// Error text reported when a program exceeds its time limit.
pub const TIMEOUT_MESSAGE: &str = "Execution timed out";

/// Remove a surrounding markdown code fence, if the model added one.
pub fn strip_code_fences(source: &str) -> &str {
    let mut code = source.trim();
    if let Some(rest) = code.strip_prefix("```python") {
        code = rest;
    } else if let Some(rest) = code.strip_prefix("```") {
        code = rest;
    }
    if let Some(rest) = code.strip_suffix("```") {
        code = rest;
    }
    code.trim()
}

/// [`CodeExecutor`] that writes the program to a temporary file and runs it
/// with a Python interpreter.
#[derive(Debug, Clone, Default)]
pub struct PythonExecutor {
    config: ExecutorConfig,
}

impl PythonExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn run(&self, code: &str) -> io::Result<ExecutionResult> {
        let mut script = tempfile::Builder::new().suffix(".py").tempfile()?;
        script.write_all(code.as_bytes())?;
        script.flush()?;

        let deadline = Instant::now() + self.config.timeout;
        let mut child = Command::new(&self.config.interpreter)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on their own threads so a chatty program can't
        // block on a full pipe while we wait for it.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let Some(status) = wait_until(&mut child, deadline)? else {
            warn!(timeout = ?self.config.timeout, "program exceeded time limit, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Ok(ExecutionResult::failure(TIMEOUT_MESSAGE));
        };

        // A background process the program started can keep the pipes open
        // after the program itself has exited.
        let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline))
        else {
            warn!(timeout = ?self.config.timeout, "program output still open at time limit");
            return Ok(ExecutionResult::failure(TIMEOUT_MESSAGE));
        };
        debug!(code = status.code(), "program finished");

        Ok(ExecutionResult {
            success: status.success(),
            stdout,
            stderr,
        })
    }
}

impl CodeExecutor for PythonExecutor {
    fn execute(&self, source: &str) -> ExecutionResult {
        match self.run(strip_code_fences(source)) {
            Ok(result) => result,
            Err(e) => ExecutionResult::failure(format!("failed to run program: {e}")),
        }
    }
}

/// Read a pipe to the end on a separate thread; the text arrives on the
/// returned channel.
pub(crate) fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Output from [`drain`], or `None` if the pipe is still open at `deadline`.
pub(crate) fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
    }
}

/// Poll the child until it exits or `deadline` passes (`None`).
pub(crate) fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(EXEC_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_python_fence() {
        let src = "```python\nprint(42)\n```";
        assert_eq!(strip_code_fences(src), "print(42)");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fences("```\nx = 1\n```\n"), "x = 1");
    }

    #[test]
    fn test_strip_leaves_plain_code() {
        assert_eq!(strip_code_fences("  print(1)\n"), "print(1)");
    }

    #[test]
    fn test_missing_interpreter_is_a_failed_result() {
        let exec = PythonExecutor::new(ExecutorConfig {
            interpreter: "/nonexistent/interpreter-for-tests".into(),
            ..ExecutorConfig::default()
        });
        let result = exec.execute("print(1)");
        assert!(!result.success);
        assert!(result.stderr.starts_with("failed to run program"));
    }
}
