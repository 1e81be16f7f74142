use std::path::PathBuf;

use chrono::Utc;
use engine::{
    Category, EngineError, NewTransaction, PaymentMethod, Transaction, TransactionKind, summary,
};
use sheets_sync::SyncEvent;
use teloxide::{
    DownloadError, RequestError,
    net::Download,
    prelude::*,
    types::{CallbackQuery, ChatId, FileId, InlineKeyboardMarkup, MessageId, User, UserId},
    utils::command::BotCommands,
};
use uuid::Uuid;

use crate::{
    ConfigParameters,
    commands::Command,
    conversation::{AmountInput, CompletedEntry, Effect, Input, State, transition},
    parsing::{ParseError, looks_like_amount, parse_fixed, parse_quick_entry},
    scheduler, ui,
};

const RECENT_LIMIT: u64 = 10;

#[derive(Debug, thiserror::Error)]
enum PhotoError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().or(msg.caption()).unwrap_or("").trim().to_string();

    if !is_allowed(&cfg.allowed_users, msg.from.as_ref().map(|u| u.id)) {
        let from = msg.from.as_ref().map(|u| u.id.0);
        tracing::warn!("rejected message from unauthorized user {from:?}");
        if text.starts_with("/start") {
            bot.send_message(chat_id, ui::NOT_AUTHORIZED).await?;
        }
        return Ok(());
    }

    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };

    if text.starts_with('/') {
        match Command::parse(&text, &cfg.bot_username) {
            Ok(cmd) => handle_command(&bot, chat_id, from, &cfg, cmd).await?,
            Err(err) => {
                tracing::debug!("unknown command {text:?}: {err}");
                bot.send_message(chat_id, "Comando no reconocido. Usa /help.")
                    .await?;
            }
        }
        return Ok(());
    }

    let photo = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|size| size.file.id.clone());

    let state = cfg.sessions.get(from.id).await;
    let input = match input_for_text(&state, &text, photo.clone()) {
        Ok(Some(input)) => input,
        Ok(None) => {
            bot.send_message(chat_id, unrecognized_hint(photo.is_some()))
                .await?;
            return Ok(());
        }
        Err(err) => {
            bot.send_message(chat_id, err.to_string()).await?;
            return Ok(());
        }
    };

    advance(&bot, chat_id, None, from, &cfg, input).await
}

/// Map free text to a conversation input given the current step.
///
/// `Ok(None)` means the text is not meant for the conversation at all.
fn input_for_text(
    state: &State,
    text: &str,
    photo: Option<FileId>,
) -> Result<Option<Input>, ParseError> {
    if looks_like_amount(text) || matches!(state, State::AwaitingAmount { .. }) {
        let entry = parse_quick_entry(text)?;
        return Ok(Some(Input::Amount(AmountInput {
            kind: entry.kind,
            amount: entry.amount,
            description: entry.description,
            photo,
        })));
    }

    let input = match state {
        State::AwaitingCategory(draft) => Category::parse_for_kind(text, draft.kind)
            .map(Input::Category)
            .unwrap_or(Input::Unrecognized),
        State::AwaitingPaymentMethod(_) => PaymentMethod::parse(text)
            .map(Input::Payment)
            .unwrap_or(Input::Unrecognized),
        _ => return Ok(None),
    };
    Ok(Some(input))
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    cfg: ConfigParameters,
) -> ResponseResult<()> {
    if !is_allowed(&cfg.allowed_users, Some(q.from.id)) {
        tracing::warn!("rejected callback from unauthorized user {}", q.from.id);
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    }

    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();

    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    if let Some(id) = data.strip_prefix(ui::DEACTIVATE_PREFIX) {
        return deactivate_recurrence(&bot, chat_id, message_id, &q.from, &cfg, id).await;
    }

    let input = if data == ui::CANCEL {
        Input::Cancel
    } else if let Some(code) = data.strip_prefix(ui::CATEGORY_PREFIX) {
        Category::try_from(code)
            .map(Input::Category)
            .unwrap_or(Input::Unrecognized)
    } else if let Some(code) = data.strip_prefix(ui::PAYMENT_PREFIX) {
        PaymentMethod::try_from(code)
            .map(Input::Payment)
            .unwrap_or(Input::Unrecognized)
    } else {
        tracing::debug!("unknown callback data {data:?}");
        return Ok(());
    };

    advance(&bot, chat_id, Some(message_id), &q.from, &cfg, input).await
}

/// Run one step of the conversation and act on its effect.
async fn advance(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    from: &User,
    cfg: &ConfigParameters,
    input: Input,
) -> ResponseResult<()> {
    let (state, effect) = cfg
        .sessions
        .update(from.id, |state| {
            let (next, effect) = transition(state, input);
            (next.clone(), (next, effect))
        })
        .await;
    tracing::debug!("user {} conversation effect {effect:?}", from.id);

    match effect {
        Effect::PromptCategory | Effect::PromptPayment | Effect::Reprompt => {
            if let Some((text, kb)) = ui::render_prompt(&state) {
                edit_or_send(bot, chat_id, message_id, text, Some(kb)).await?;
            }
        }
        Effect::Commit(entry) => {
            let text = commit(bot, from, cfg, entry).await;
            edit_or_send(bot, chat_id, message_id, text, None).await?;
        }
        Effect::Cancelled => {
            edit_or_send(bot, chat_id, message_id, ui::CANCELLED.to_string(), None).await?;
        }
        Effect::Ignore => {
            edit_or_send(
                bot,
                chat_id,
                message_id,
                ui::SESSION_EXPIRED.to_string(),
                None,
            )
            .await?;
        }
    }
    Ok(())
}

/// Write a completed entry and build the reply.
async fn commit(bot: &Bot, from: &User, cfg: &ConfigParameters, entry: CompletedEntry) -> String {
    let user_id = ledger_user(from);
    let new = NewTransaction {
        user_id,
        kind: entry.kind,
        amount: entry.amount,
        category: entry.category,
        payment_method: entry.payment_method,
        description: entry.description,
        occurred_at: Utc::now(),
    };

    let mut tx = match cfg.engine.insert_transaction(new).await {
        Ok(tx) => tx,
        Err(err) => return insert_failure(user_id, err),
    };
    tracing::info!(
        "user {user_id} registered {} {} ({})",
        tx.kind.as_str(),
        tx.amount,
        tx.category.code()
    );

    if let Some(file_id) = entry.photo {
        match store_photo(bot, cfg, &tx, file_id).await {
            Ok(path) => tx.photo = Some(path.display().to_string()),
            Err(err) => tracing::warn!("photo for transaction {} not stored: {err}", tx.id),
        }
    }

    cfg.sync.send(SyncEvent::Appended(tx.clone()));

    let today = match cfg
        .engine
        .today_expense_total(user_id, Utc::now(), cfg.tz)
        .await
    {
        Ok(total) => Some(total),
        Err(err) => {
            tracing::error!("daily total for user {user_id} failed: {err}");
            None
        }
    };
    ui::render_confirmation(&tx, today)
}

async fn store_photo(
    bot: &Bot,
    cfg: &ConfigParameters,
    tx: &Transaction,
    file_id: FileId,
) -> Result<PathBuf, PhotoError> {
    let file = bot.get_file(file_id).await?;
    tokio::fs::create_dir_all(&cfg.photos_dir).await?;
    let path = cfg.photos_dir.join(format!("{}.jpg", tx.id));
    let mut dst = tokio::fs::File::create(&path).await?;
    bot.download_file(&file.path, &mut dst).await?;

    cfg.engine
        .attach_photo(tx.user_id, tx.id, &path.display().to_string())
        .await?;
    tracing::debug!("stored photo of transaction {} at {}", tx.id, path.display());
    Ok(path)
}

async fn handle_command(
    bot: &Bot,
    chat_id: ChatId,
    from: &User,
    cfg: &ConfigParameters,
    cmd: Command,
) -> ResponseResult<()> {
    let user_id = ledger_user(from);
    let now = Utc::now();

    match cmd {
        Command::Start => {
            let (year, month) = summary::local_year_month(now, cfg.tz);
            let text = match (
                cfg.engine.month_summary(user_id, year, month, cfg.tz).await,
                cfg.engine.today_expense_total(user_id, now, cfg.tz).await,
            ) {
                (Ok(month), Ok(today)) => ui::welcome_text(&from.first_name, &month, today),
                (Err(err), _) | (_, Err(err)) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Help => {
            bot.send_message(chat_id, ui::help_text()).await?;
        }
        Command::Gasto => start_guided(bot, chat_id, from, cfg, TransactionKind::Expense).await?,
        Command::Ingreso => start_guided(bot, chat_id, from, cfg, TransactionKind::Income).await?,
        Command::Cancelar => {
            advance(bot, chat_id, None, from, cfg, Input::Cancel).await?;
        }
        Command::Resumen => {
            let (year, month) = summary::local_year_month(now, cfg.tz);
            let text = match cfg.engine.month_summary(user_id, year, month, cfg.tz).await {
                Ok(summary) => ui::render_month_summary(&summary, year, month),
                Err(err) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Hoy => {
            let date = summary::local_date(now, cfg.tz);
            let text = match cfg.engine.day_summary(user_id, date, cfg.tz).await {
                Ok(day) => ui::render_today(&day),
                Err(err) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Recientes => {
            let text = match cfg.engine.recent_transactions(user_id, RECENT_LIMIT).await {
                Ok(rows) => ui::render_recent(&rows, cfg.tz),
                Err(err) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Borrar => {
            let text = match cfg.engine.delete_most_recent(user_id).await {
                Ok(Some(tx)) => {
                    if let Some(photo) = &tx.photo
                        && let Err(err) = tokio::fs::remove_file(photo).await
                    {
                        tracing::warn!("could not remove photo {photo}: {err}");
                    }
                    cfg.sync.send(SyncEvent::Removed(tx.clone()));
                    ui::render_deleted(&tx)
                }
                Ok(None) => ui::NOTHING_TO_DELETE.to_string(),
                Err(err) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::Fijos => match cfg.engine.list_recurrences(user_id, false).await {
            Ok(list) => {
                let (text, kb) = ui::render_recurrences(&list);
                bot.send_message(chat_id, text).reply_markup(kb).await?;
            }
            Err(err) => {
                bot.send_message(chat_id, storage_failure(user_id, err))
                    .await?;
            }
        },
        Command::Fijo(args) => {
            let text = match parse_fixed(user_id, &args) {
                Ok(draft) => match cfg.engine.upsert_recurrence(None, draft).await {
                    Ok(recurrence) => ui::render_recurrence_created(&recurrence),
                    Err(err) if err.is_validation() => err.to_string(),
                    Err(err) => storage_failure(user_id, err),
                },
                Err(err) => err.to_string(),
            };
            bot.send_message(chat_id, text).await?;
        }
        Command::EjecutarFijos => {
            let date = summary::local_date(now, cfg.tz);
            let run = scheduler::run_due(bot, &cfg.engine, &cfg.sync, date, now, cfg.tz).await;
            let text = match run {
                Ok(created) if created.is_empty() => {
                    "📌 No hay movimientos fijos pendientes para hoy.".to_string()
                }
                Ok(created) => format!("📌 {} movimiento(s) fijo(s) registrados.", created.len()),
                Err(err) => storage_failure(user_id, err),
            };
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

async fn start_guided(
    bot: &Bot,
    chat_id: ChatId,
    from: &User,
    cfg: &ConfigParameters,
    kind: TransactionKind,
) -> ResponseResult<()> {
    cfg.sessions
        .set(from.id, State::AwaitingAmount { kind })
        .await;
    let (text, kb) = ui::render_amount_prompt(kind);
    bot.send_message(chat_id, text).reply_markup(kb).await?;
    Ok(())
}

async fn deactivate_recurrence(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    from: &User,
    cfg: &ConfigParameters,
    raw_id: &str,
) -> ResponseResult<()> {
    let user_id = ledger_user(from);
    let Ok(id) = Uuid::parse_str(raw_id) else {
        bot.send_message(chat_id, "Movimiento fijo no válido.").await?;
        return Ok(());
    };

    let text = match cfg.engine.deactivate_recurrence(user_id, id).await {
        Ok(recurrence) => ui::render_recurrence_deactivated(&recurrence),
        Err(EngineError::KeyNotFound(_)) => "Movimiento fijo no encontrado.".to_string(),
        Err(err) => storage_failure(user_id, err),
    };
    bot.send_message(chat_id, text).await?;

    if let Ok(list) = cfg.engine.list_recurrences(user_id, false).await {
        let (text, kb) = ui::render_recurrences(&list);
        edit_or_send(bot, chat_id, Some(message_id), text, Some(kb)).await?;
    }
    Ok(())
}

/// Edit the message a button belongs to, or send a new one.
async fn edit_or_send(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    text: String,
    kb: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    if let Some(message_id) = message_id {
        let edited = match &kb {
            Some(kb) => {
                bot.edit_message_text(chat_id, message_id, text.clone())
                    .reply_markup(kb.clone())
                    .await
            }
            None => bot.edit_message_text(chat_id, message_id, text.clone()).await,
        };
        if edited.is_ok() {
            return Ok(());
        }
    }

    match kb {
        Some(kb) => bot.send_message(chat_id, text).reply_markup(kb).await?,
        None => bot.send_message(chat_id, text).await?,
    };
    Ok(())
}

/// Reply to text that is neither a command nor part of a conversation.
fn unrecognized_hint(with_photo: bool) -> &'static str {
    if with_photo {
        "📷 Envía la foto con el monto en el texto, por ejemplo: 85 almuerzo"
    } else {
        "No entendí. Escribe un monto (ej: 85 almuerzo) o usa /help."
    }
}

/// Reply to a rejected insert. The session is already closed either way.
fn insert_failure(user_id: i64, err: EngineError) -> String {
    if err.is_validation() {
        return err.to_string();
    }
    storage_failure(user_id, err)
}

fn storage_failure(user_id: i64, err: EngineError) -> String {
    tracing::error!("storage error for user {user_id}: {err}");
    ui::STORAGE_ERROR.to_string()
}

fn is_allowed(allowed: &[UserId], from: Option<UserId>) -> bool {
    from.is_some_and(|id| allowed.contains(&id))
}

fn ledger_user(user: &User) -> i64 {
    user.id.0 as i64
}
