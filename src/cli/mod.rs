//! Command-line interface.
//!
//! `devbot run` (or no subcommand) starts the bot; `devbot eval` runs the
//! same sandbox the `/eval` command uses, locally, for quick checks.

pub mod eval;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "devbot",
    version,
    about = "Telegram bot serving developer reading lists and a sandboxed expression evaluator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot and serve commands until interrupted.
    Run,
    /// Evaluate an expression locally and print the outcome.
    Eval {
        /// Expression source. Multiple words are joined with spaces, so
        /// quoting is optional.
        expression: Vec<String>,
    },
}
