//! Telegram bot wiring: command set, shared handler state, dispatcher.

use std::sync::Arc;
use std::time::Duration;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::info;

use crate::cache::TtlCache;
use crate::commands;
use crate::config::Config;
use crate::error::{BotError, Result};
use crate::lookup::{ArticleLookup, HttpArticleLookup};
use crate::sandbox::Sandbox;

/// The bot's command set. teloxide derives parsing and the command list
/// sent to Telegram via `set_my_commands`.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "articles for developers")]
    Devread(String),
    #[command(description = "evaluate an expression in a sandbox")]
    Eval(String),
}

/// State shared by every handler invocation.
pub struct AppState {
    pub cache: Mutex<TtlCache>,
    pub lookup: Arc<dyn ArticleLookup>,
    pub sandbox: Sandbox,
    pub cache_ttl: Duration,
}

impl AppState {
    /// Build handler state from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            cache: Mutex::new(TtlCache::open(
                config.cache_path(),
                config.cache.max_entries,
            )),
            lookup: Arc::new(HttpArticleLookup::new(&config.lookup)?),
            sandbox: Sandbox::new(&config.eval),
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
        })
    }
}

/// Start the bot and serve commands until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    if config.telegram.token.is_empty() {
        return Err(BotError::Config(format!(
            "telegram.token is not configured; set {} or edit {}",
            crate::config::TOKEN_ENV_VAR,
            Config::config_path().display()
        )));
    }

    let bot = Bot::new(config.telegram.token.clone());
    let state = Arc::new(AppState::new(&config)?);

    bot.set_my_commands(Command::bot_commands()).await?;
    info!("devbot is up, serving /devread and /eval");

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .filter_command::<Command>()
            .endpoint(dispatch),
    )
    .dependencies(dptree::deps![state])
    .error_handler(LoggingErrorHandler::with_custom_text(
        "command handler failed",
    ))
    .build()
    .dispatch()
    .await;

    Ok(())
}

async fn dispatch(bot: Bot, msg: Message, cmd: Command, state: Arc<AppState>) -> Result<()> {
    match cmd {
        Command::Devread(args) => {
            commands::devread::handle(&bot, msg.chat.id, &args, &state).await
        }
        Command::Eval(args) => commands::eval::handle(&bot, msg.chat.id, &args, &state).await,
    }
}
