//! devbot — a Telegram bot serving developer reading lists (`/devread`)
//! and a sandboxed expression evaluator (`/eval`).
//!
//! Module map:
//! - [`bot`]: teloxide dispatcher, command set, shared handler state
//! - [`commands`]: the `/devread` and `/eval` handlers
//! - [`sandbox`]: isolated, time-boxed evaluation of untrusted expressions
//! - [`cache`]: TTL key/value cache backing `/devread`
//! - [`lookup`]: article search client (trait + HTTP implementation)
//! - [`config`] / [`error`] / [`utils`]: configuration, the crate error
//!   type, and reply templating helpers
//! - [`cli`]: the `devbot` binary's argument surface

pub mod bot;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lookup;
pub mod sandbox;
pub mod utils;

pub use error::{BotError, Result};
