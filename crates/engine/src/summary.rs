//! Read-side aggregation over ledger rows.
//!
//! Nothing here touches the database: callers fetch rows through the
//! [`Engine`](crate::Engine) and fold them with these functions. Day and month
//! boundaries are local to the configured timezone.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::{Category, Money, Transaction, TransactionKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: Money,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub income: Money,
    pub expenses: Money,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub income: Money,
    pub expenses: Money,
    /// Expense totals by category, largest first.
    pub by_category: Vec<CategoryTotal>,
}

impl MonthSummary {
    pub fn balance(&self) -> Money {
        self.income - self.expenses
    }

    /// Share of income left after expenses, in percent. Zero without income.
    pub fn savings_pct(&self) -> f64 {
        if !self.income.is_positive() {
            return 0.0;
        }
        self.balance().as_major_f64() / self.income.as_major_f64() * 100.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub transactions: Vec<Transaction>,
    pub income: Money,
    pub expenses: Money,
}

/// Sum of `rows` of the given kind.
pub fn total_of(rows: &[Transaction], kind: TransactionKind) -> Money {
    rows.iter()
        .filter(|tx| tx.kind == kind)
        .map(|tx| tx.amount)
        .sum()
}

/// Per-day income and expense totals, ordered by date.
pub fn daily_totals(rows: &[Transaction], tz: Tz) -> Vec<DayTotal> {
    let mut days: BTreeMap<NaiveDate, (Money, Money)> = BTreeMap::new();
    for tx in rows {
        let date = tx.occurred_at.with_timezone(&tz).date_naive();
        let entry = days.entry(date).or_default();
        match tx.kind {
            TransactionKind::Income => entry.0 += tx.amount,
            TransactionKind::Expense => entry.1 += tx.amount,
        }
    }
    days.into_iter()
        .map(|(date, (income, expenses))| DayTotal {
            date,
            income,
            expenses,
        })
        .collect()
}

/// Totals per category for rows of `kind`, largest first.
pub fn category_totals(rows: &[Transaction], kind: TransactionKind) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<Category, (Money, usize)> = BTreeMap::new();
    for tx in rows.iter().filter(|tx| tx.kind == kind) {
        let entry = totals.entry(tx.category).or_default();
        entry.0 += tx.amount;
        entry.1 += 1;
    }
    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));
    out
}

pub fn month_summary(rows: &[Transaction]) -> MonthSummary {
    MonthSummary {
        income: total_of(rows, TransactionKind::Income),
        expenses: total_of(rows, TransactionKind::Expense),
        by_category: category_totals(rows, TransactionKind::Expense),
    }
}

pub fn day_summary(date: NaiveDate, rows: Vec<Transaction>) -> DaySummary {
    DaySummary {
        date,
        income: total_of(&rows, TransactionKind::Income),
        expenses: total_of(&rows, TransactionKind::Expense),
        transactions: rows,
    }
}

/// UTC instant of local midnight at the start of `date`.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // Midnight skipped by a DST jump: the day starts at the first valid hour.
        LocalResult::None => tz
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
    }
}

/// Half-open UTC range `[start, end)` covering the local day `date`.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(date);
    (local_midnight(date, tz), local_midnight(next, tz))
}

/// Half-open UTC range covering the local month `year`-`month`.
pub fn month_bounds(year: i32, month: u32, tz: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((local_midnight(first, tz), local_midnight(next, tz)))
}

/// Timestamp for an entry booked on the local day `date`.
///
/// `now` when it falls on `date`, otherwise local noon of `date`, so that
/// catch-up runs land in the day (and month) they stand for.
pub fn instant_on(date: NaiveDate, now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    if local_date(now, tz) == date {
        return now;
    }
    local_midnight(date, tz) + chrono::Duration::hours(12)
}

/// Local calendar date of `instant`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// `(year, month)` of `instant` in `tz`.
pub fn local_year_month(instant: DateTime<Utc>, tz: Tz) -> (i32, u32) {
    let date = local_date(instant, tz);
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use chrono_tz::America::Lima;
    use uuid::Uuid;

    use super::*;
    use crate::PaymentMethod;

    fn tx(kind: TransactionKind, category: Category, minor: i64, at: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: 1,
            kind,
            amount: Money::new(minor),
            category,
            payment_method: PaymentMethod::Efectivo,
            description: None,
            photo: None,
            occurred_at: at.parse().unwrap(),
            recurrence_id: None,
            recurrence_period: None,
        }
    }

    #[test]
    fn daily_totals_use_local_dates() {
        // 03:00 UTC on the 2nd is still the 1st in Lima (UTC-5).
        let rows = vec![
            tx(TransactionKind::Expense, Category::Comida, 1000, "2026-10-02T03:00:00Z"),
            tx(TransactionKind::Expense, Category::Comida, 500, "2026-10-02T15:00:00Z"),
            tx(TransactionKind::Income, Category::Salario, 9000, "2026-10-02T16:00:00Z"),
        ];
        let days = daily_totals(&rows, Lima);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(days[0].expenses, Money::new(1000));
        assert_eq!(days[1].expenses, Money::new(500));
        assert_eq!(days[1].income, Money::new(9000));
    }

    #[test]
    fn month_summary_groups_expenses_by_category() {
        let rows = vec![
            tx(TransactionKind::Expense, Category::Comida, 1000, "2026-10-02T15:00:00Z"),
            tx(TransactionKind::Expense, Category::Transporte, 3000, "2026-10-03T15:00:00Z"),
            tx(TransactionKind::Expense, Category::Comida, 500, "2026-10-04T15:00:00Z"),
            tx(TransactionKind::Income, Category::Salario, 10_000, "2026-10-05T15:00:00Z"),
        ];
        let summary = month_summary(&rows);
        assert_eq!(summary.income, Money::new(10_000));
        assert_eq!(summary.expenses, Money::new(4500));
        assert_eq!(summary.balance(), Money::new(5500));
        assert!((summary.savings_pct() - 55.0).abs() < 1e-9);

        assert_eq!(summary.by_category.len(), 2);
        assert_eq!(summary.by_category[0].category, Category::Transporte);
        assert_eq!(summary.by_category[1].category, Category::Comida);
        assert_eq!(summary.by_category[1].total, Money::new(1500));
        assert_eq!(summary.by_category[1].count, 2);
    }

    #[test]
    fn savings_without_income_is_zero() {
        let rows = vec![tx(
            TransactionKind::Expense,
            Category::Comida,
            1000,
            "2026-10-02T15:00:00Z",
        )];
        assert_eq!(month_summary(&rows).savings_pct(), 0.0);
    }

    #[test]
    fn bounds_are_local() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let (start, end) = day_bounds(date, Lima);
        assert_eq!(start, "2026-10-16T05:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(end, "2026-10-17T05:00:00Z".parse::<DateTime<Utc>>().unwrap());

        let (start, end) = month_bounds(2026, 12, Lima).unwrap();
        assert_eq!(start, "2026-12-01T05:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(end, "2027-01-01T05:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn instant_on_keeps_now_today_and_uses_noon_otherwise() {
        let now: DateTime<Utc> = "2026-10-02T14:30:00Z".parse().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 2).unwrap();
        assert_eq!(instant_on(today, now, Lima), now);

        let past = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        let stamped = instant_on(past, now, Lima);
        assert_eq!(stamped, "2026-09-30T17:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(local_date(stamped, Lima), past);
    }
}
