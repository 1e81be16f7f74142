use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
    EngineError, Money, ResultEngine, TransactionKind,
    summary::{self, DaySummary, MonthSummary},
};

use super::Engine;

impl Engine {
    /// Entries of `user_id` on the local day `date`.
    pub async fn day_summary(
        &self,
        user_id: i64,
        date: NaiveDate,
        tz: Tz,
    ) -> ResultEngine<DaySummary> {
        let (from, to) = summary::day_bounds(date, tz);
        let rows = self.list_transactions(user_id, from, to).await?;
        Ok(summary::day_summary(date, rows))
    }

    /// Income, expenses and expense categories of `user_id` for a local month.
    pub async fn month_summary(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
        tz: Tz,
    ) -> ResultEngine<MonthSummary> {
        let (from, to) = summary::month_bounds(year, month, tz)
            .ok_or_else(|| EngineError::InvalidDay(format!("invalid month {year}-{month}")))?;
        let rows = self.list_transactions(user_id, from, to).await?;
        Ok(summary::month_summary(&rows))
    }

    /// Running expense total of the local day containing `now`.
    pub async fn today_expense_total(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> ResultEngine<Money> {
        let date = summary::local_date(now, tz);
        let (from, to) = summary::day_bounds(date, tz);
        let rows = self.list_transactions(user_id, from, to).await?;
        Ok(summary::total_of(&rows, TransactionKind::Expense))
    }
}
