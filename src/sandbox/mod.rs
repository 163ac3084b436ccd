//! Sandboxed evaluation of untrusted expressions.
//!
//! [`Sandbox::evaluate`] takes attacker-controlled source text and returns
//! an [`Evaluation`] — never an error, never a panic. The source runs in a
//! purpose-built interpreter rather than anything with host capabilities:
//! the only reachable names are local bindings and a fixed table of pure
//! built-ins, so filesystem, network, process, and reflection access do
//! not exist inside the sandbox by construction.
//!
//! Each call gets a fresh environment on a blocking worker with a
//! wall-clock deadline. The interpreter checks the deadline at every step,
//! and the async boundary additionally wraps the worker in a timeout with
//! a small grace margin, so the caller is released within budget + ε no
//! matter what the evaluated code does.
//!
//! # Example
//!
//! ```rust
//! # tokio_test::block_on(async {
//! use devbot::sandbox::{Evaluation, Sandbox};
//!
//! let sandbox = Sandbox::default();
//! let outcome = sandbox.evaluate("1 + 2").await;
//! assert_eq!(outcome, Evaluation::Success { rendered: "3".into() });
//! # });
//! ```

mod builtins;
mod interp;
mod lexer;
mod parser;
mod value;

use std::fmt;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::EvalConfig;

use interp::{Interp, Limits};

/// Extra wall-clock slack granted to the worker beyond the evaluation
/// budget before the caller is released anyway.
const TIMEOUT_GRACE: Duration = Duration::from_millis(50);

/// Classification of a failed evaluation. `Capability` reads the same as
/// `Runtime` to the chat user but is kept distinct for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Syntax,
    Runtime,
    Capability,
    Timeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Syntax => write!(f, "syntax"),
            FailureKind::Runtime => write!(f, "runtime"),
            FailureKind::Capability => write!(f, "capability"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Outcome of one evaluation. Consumed immediately by the reply path;
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Success { rendered: String },
    Failure { kind: FailureKind, message: String },
}

impl Evaluation {
    pub fn is_success(&self) -> bool {
        matches!(self, Evaluation::Success { .. })
    }

    /// The text shown to the requester: the rendered value on success,
    /// the human-readable message on failure.
    pub fn output_text(&self) -> &str {
        match self {
            Evaluation::Success { rendered } => rendered,
            Evaluation::Failure { message, .. } => message,
        }
    }
}

/// Internal error type threaded through the lexer, parser, and
/// interpreter. Converted to [`Evaluation::Failure`] at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EvalError {
    Syntax(String),
    Runtime(String),
    Capability(String),
    Timeout(String),
}

impl EvalError {
    fn into_parts(self) -> (FailureKind, String) {
        match self {
            EvalError::Syntax(m) => (FailureKind::Syntax, format!("syntax error: {m}")),
            EvalError::Runtime(m) => (FailureKind::Runtime, format!("runtime error: {m}")),
            EvalError::Capability(m) => (FailureKind::Capability, format!("runtime error: {m}")),
            EvalError::Timeout(m) => (FailureKind::Timeout, m),
        }
    }
}

/// Evaluator for untrusted expressions. Stateless between calls; cheap to
/// share behind an `Arc` or construct per use.
#[derive(Debug, Clone)]
pub struct Sandbox {
    budget: Duration,
    max_render_len: usize,
}

impl Sandbox {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            budget: Duration::from_millis(config.budget_ms),
            max_render_len: config.max_render_len,
        }
    }

    /// Evaluate `source` in a fresh, isolated context.
    ///
    /// Always returns within the configured budget plus a small grace
    /// margin. All failure modes — syntax errors, runtime errors,
    /// capability violations, timeouts, even a worker panic — come back
    /// as [`Evaluation::Failure`]; nothing propagates to the caller.
    pub async fn evaluate(&self, source: &str) -> Evaluation {
        let budget = self.budget;
        let max_render_len = self.max_render_len;
        let owned_source = source.to_string();
        debug!(source_len = source.len(), "evaluating sandboxed expression");

        let worker =
            tokio::task::spawn_blocking(move || evaluate_blocking(&owned_source, budget, max_render_len));

        let outcome = match timeout(budget + TIMEOUT_GRACE, worker).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                // The interpreter does not panic; this is a backstop so a
                // defect can never take the bot down with it.
                error!(%join_error, "evaluation worker failed");
                Evaluation::Failure {
                    kind: FailureKind::Runtime,
                    message: "internal evaluation failure".to_string(),
                }
            }
            Err(_) => {
                // The detached worker stops itself at its own deadline
                // check; the caller is released here regardless.
                Evaluation::Failure {
                    kind: FailureKind::Timeout,
                    message: format!(
                        "evaluation exceeded the {} ms budget",
                        budget.as_millis()
                    ),
                }
            }
        };

        match &outcome {
            Evaluation::Success { rendered } => {
                debug!(rendered_len = rendered.len(), "evaluation succeeded");
            }
            Evaluation::Failure {
                kind: FailureKind::Capability,
                message,
            } => warn!(%message, "capability violation in sandboxed expression"),
            Evaluation::Failure { kind, message } => {
                debug!(%kind, %message, "evaluation failed");
            }
        }
        outcome
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new(&EvalConfig::default())
    }
}

/// Synchronous evaluation pipeline, run on a blocking worker.
fn evaluate_blocking(source: &str, budget: Duration, max_render_len: usize) -> Evaluation {
    let deadline = Instant::now() + budget;
    let result = lexer::tokenize(source)
        .and_then(parser::parse)
        .and_then(|program| Interp::new(deadline, Limits::default()).run(&program));
    match result {
        Ok(value) => Evaluation::Success {
            rendered: value.render(max_render_len),
        },
        Err(error) => {
            let (kind, message) = error.into_parts();
            Evaluation::Failure { kind, message }
        }
    }
}
