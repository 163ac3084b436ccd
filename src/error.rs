//! Crate-wide error type.
//!
//! Sandbox failures are deliberately NOT represented here: a failed
//! evaluation is an expected, user-facing outcome and travels as a value
//! (`sandbox::Evaluation::Failure`), not as an error.

use thiserror::Error;

/// Errors surfaced by the bot's own plumbing.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The article lookup service failed or returned an unusable payload.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Cache serialization failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A Telegram API request failed.
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BotError>;
