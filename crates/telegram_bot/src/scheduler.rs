//! Daily materialization of fixed recurrences.
//!
//! The timer fires once a day at `run_at` local time. Runs missed while the
//! process was down are not replayed; `/ejecutarfijos` or the admin CLI
//! re-trigger a day explicitly.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use engine::{Engine, EngineError, Materialized, summary};
use sheets_sync::{SyncEvent, SyncHandle};
use teloxide::{prelude::*, types::ChatId};

use crate::ui;

/// First instant strictly after `now` whose local time in `tz` is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = summary::local_date(now, tz);
    let mut date = today;
    // Two days ahead is always enough, even across a DST gap.
    for _ in 0..3 {
        if let Some(candidate) = local_instant(date, at, tz)
            && candidate > now
        {
            return candidate;
        }
        date = date.checked_add_days(Days::new(1)).unwrap_or(date);
    }
    now + chrono::Duration::days(1)
}

fn local_instant(date: NaiveDate, at: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_time(at);
    tz.from_local_datetime(&naive)
        .earliest()
        // `at` skipped by a DST jump: fire one hour later the same day.
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
}

/// Materialize the recurrences due on `date`, mirror the new rows and notify
/// their owners. Safe to call repeatedly for the same day.
pub(crate) async fn run_due(
    bot: &Bot,
    engine: &Engine,
    sync: &SyncHandle,
    date: NaiveDate,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<Vec<Materialized>, EngineError> {
    let created = engine.materialize_due(date, now, tz).await?;
    for item in &created {
        sync.send(SyncEvent::Appended(item.transaction.clone()));
        if let Err(err) = bot
            .send_message(ChatId(item.recurrence.user_id), ui::render_materialized(item))
            .await
        {
            tracing::warn!(
                "could not notify user {} about recurrence {}: {err}",
                item.recurrence.user_id,
                item.recurrence.id
            );
        }
    }
    Ok(created)
}

/// Timer task firing [`run_due`] once a day.
pub struct Scheduler {
    pub(crate) bot: Bot,
    pub(crate) engine: Arc<Engine>,
    pub(crate) sync: SyncHandle,
    pub(crate) tz: Tz,
    pub(crate) run_at: NaiveTime,
}

impl Scheduler {
    pub async fn run(self) {
        tracing::info!("Starting scheduler, daily at {} {}", self.run_at, self.tz);
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.run_at, self.tz);
            tracing::debug!("next scheduler run at {next}");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let now = Utc::now();
            let date = summary::local_date(now, self.tz);
            match run_due(&self.bot, &self.engine, &self.sync, date, now, self.tz).await {
                Ok(created) => {
                    tracing::info!("scheduler run for {date} created {} row(s)", created.len());
                }
                Err(err) => tracing::error!("scheduler run for {date} failed: {err}"),
            }
        }
    }
}
