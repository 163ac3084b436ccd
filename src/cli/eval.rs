//! Local evaluation command handler.

use anyhow::Result;

use crate::config::Config;
use crate::sandbox::{Evaluation, Sandbox};

/// Evaluate an expression with the configured sandbox settings and print
/// the outcome. Exits non-zero on failure so the command is scriptable.
pub async fn cmd_eval(expression: Vec<String>, config: &Config) -> Result<()> {
    let source = expression.join(" ");
    let sandbox = Sandbox::new(&config.eval);
    match sandbox.evaluate(&source).await {
        Evaluation::Success { rendered } => {
            println!("{rendered}");
            Ok(())
        }
        Evaluation::Failure { kind, message } => {
            anyhow::bail!("{kind} failure: {message}")
        }
    }
}
