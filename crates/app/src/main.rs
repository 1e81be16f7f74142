use std::{path::Path, sync::Arc, time::Duration};

use chrono_tz::Tz;
use migration::{Migrator, MigratorTrait};
use sheets_sync::{GoogleSheetsClient, SyncHandle, SyncWorker};
use telegram_bot::UserId;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "gastos={level},telegram_bot={level},sheets_sync={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let tz = settings.timezone()?;
    let run_at = settings.run_at()?;

    let db = connect_database(&settings.database.path).await?;
    let engine = Arc::new(engine::Engine::builder().database(db).build().await?);

    let sync = start_sync(&settings, tz, &mut tasks).await;

    let allowed_users = settings
        .telegram
        .authorized_users
        .iter()
        .copied()
        .map(UserId)
        .collect();

    let bot = telegram_bot::Bot::builder()
        .token(&settings.telegram.token)
        .allowed_users(allowed_users)
        .engine(engine)
        .sync(sync)
        .timezone(tz)
        .photos_dir(&settings.telegram.photos_dir)
        .session_timeout(Duration::from_secs(settings.telegram.session_timeout_secs))
        .run_at(run_at)
        .build()?;

    let scheduler = bot.scheduler();
    tasks.spawn(scheduler.run());
    tasks.spawn(async move { bot.run().await });

    // The bot exits on ctrl-c; everything else goes down with it.
    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn connect_database(
    path: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = if path == ":memory:" {
        String::from("sqlite::memory:")
    } else {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        format!("sqlite:{path}?mode=rwc")
    };

    tracing::info!("Opening database {url}");
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Starts the spreadsheet mirror, or returns a disabled handle when it is not
/// configured or the credentials cannot be loaded.
async fn start_sync(
    settings: &settings::Settings,
    tz: Tz,
    tasks: &mut tokio::task::JoinSet<()>,
) -> SyncHandle {
    let config = settings.sheets();
    if !config.is_complete() {
        tracing::info!("Google Sheets not configured, mirroring disabled");
        return SyncHandle::disabled();
    }

    match GoogleSheetsClient::from_config(&config).await {
        Ok(client) => {
            tracing::info!("Mirroring rows to spreadsheet {}", config.spreadsheet_id);
            let (handle, worker) = SyncWorker::new(client, tz).spawn();
            tasks.spawn(async move {
                if let Err(err) = worker.await {
                    tracing::error!("sheets sync worker crashed: {err}");
                }
            });
            handle
        }
        Err(err) => {
            tracing::error!("failed to initialize Google Sheets client: {err}");
            SyncHandle::disabled()
        }
    }
}
