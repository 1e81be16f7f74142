//! Telegram front end of the ledger.
//!
//! The bot owns the conversation state and calls the [`engine::Engine`]
//! directly. Every committed or deleted row is forwarded to the spreadsheet
//! mirror through a [`SyncHandle`], which never blocks the chat.

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;
use engine::Engine;
use sheets_sync::SyncHandle;
use teloxide::{prelude::*, utils::command::BotCommands};

pub use scheduler::{Scheduler, next_run_after};
pub use teloxide::types::UserId;

mod commands;
mod conversation;
mod handlers;
mod parsing;
mod scheduler;
mod state;
mod ui;

const DEFAULT_PHOTOS_DIR: &str = "data/photos";

#[derive(Clone)]
pub struct ConfigParameters {
    allowed_users: Vec<UserId>,
    engine: Arc<Engine>,
    sync: SyncHandle,
    sessions: state::SessionStore,
    tz: Tz,
    photos_dir: PathBuf,
    bot_username: String,
}

pub struct Bot {
    bot: teloxide::Bot,
    allowed_users: Vec<UserId>,
    engine: Arc<Engine>,
    sync: SyncHandle,
    tz: Tz,
    photos_dir: PathBuf,
    session_timeout: Duration,
    run_at: NaiveTime,
}

impl Bot {
    pub fn builder() -> BotBuilder {
        BotBuilder::default()
    }

    /// Timer task materializing fixed recurrences, sharing this bot's
    /// engine, sync handle and zone.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler {
            bot: self.bot.clone(),
            engine: self.engine.clone(),
            sync: self.sync.clone(),
            tz: self.tz,
            run_at: self.run_at,
        }
    }

    pub async fn run(&self) {
        tracing::info!("Starting telegram bot...");

        let bot_username = match self.bot.get_me().await {
            Ok(me) => me.username().to_string(),
            Err(err) => {
                tracing::error!("could not fetch bot identity: {err}");
                String::new()
            }
        };
        if let Err(err) = self
            .bot
            .set_my_commands(commands::Command::bot_commands())
            .await
        {
            tracing::warn!("could not publish the command list: {err}");
        }

        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            engine: self.engine.clone(),
            sync: self.sync.clone(),
            sessions: state::SessionStore::new(self.session_timeout),
            tz: self.tz,
            photos_dir: self.photos_dir.clone(),
            bot_username,
        };

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handlers::handle_message))
            .branch(Update::filter_callback_query().endpoint(handlers::handle_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::warn!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

#[derive(Default)]
pub struct BotBuilder {
    token: String,
    allowed_users: Vec<UserId>,
    engine: Option<Arc<Engine>>,
    sync: Option<SyncHandle>,
    tz: Option<Tz>,
    photos_dir: Option<PathBuf>,
    session_timeout: Option<Duration>,
    run_at: Option<NaiveTime>,
}

impl BotBuilder {
    pub fn token(mut self, token: &str) -> BotBuilder {
        self.token = token.to_string();
        self
    }

    /// Telegram user ids allowed to use the bot. An empty list admits nobody.
    pub fn allowed_users(mut self, allowed_users: Vec<UserId>) -> BotBuilder {
        self.allowed_users = allowed_users;
        self
    }

    pub fn engine(mut self, engine: Arc<Engine>) -> BotBuilder {
        self.engine = Some(engine);
        self
    }

    pub fn sync(mut self, sync: SyncHandle) -> BotBuilder {
        self.sync = Some(sync);
        self
    }

    pub fn timezone(mut self, tz: Tz) -> BotBuilder {
        self.tz = Some(tz);
        self
    }

    pub fn photos_dir(mut self, path: impl Into<PathBuf>) -> BotBuilder {
        self.photos_dir = Some(path.into());
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> BotBuilder {
        self.session_timeout = Some(timeout);
        self
    }

    /// Local time of the daily recurrence run.
    pub fn run_at(mut self, at: NaiveTime) -> BotBuilder {
        self.run_at = Some(at);
        self
    }

    pub fn build(self) -> Result<Bot, String> {
        tracing::info!("Initializing telegram bot...");
        if self.token.is_empty() {
            return Err("missing telegram bot token".to_string());
        }
        let engine = self.engine.ok_or_else(|| "missing engine".to_string())?;
        if self.allowed_users.is_empty() {
            tracing::warn!("no authorized users configured, every message will be rejected");
        }

        Ok(Bot {
            bot: teloxide::Bot::new(&self.token),
            allowed_users: self.allowed_users,
            engine,
            sync: self.sync.unwrap_or_else(SyncHandle::disabled),
            tz: self.tz.unwrap_or(chrono_tz::America::Lima),
            photos_dir: self
                .photos_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PHOTOS_DIR)),
            session_timeout: self
                .session_timeout
                .unwrap_or(state::DEFAULT_SESSION_TIMEOUT),
            run_at: self
                .run_at
                .unwrap_or(NaiveTime::MIN + chrono::Duration::hours(8)),
        })
    }
}
