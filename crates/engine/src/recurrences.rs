//! Fixed (monthly) recurrences.
//!
//! A recurrence is due once per month on `day_of_month`, clamped to the last
//! day when the month is shorter. The idempotency key of a materialization is
//! `(recurrence id, YYYY-MM)`.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Category, EngineError, Money, NewTransaction, PaymentMethod, ResultEngine, TransactionKind,
    util::{normalize_optional_text, parse_uuid},
};

/// Number of days in `month` of `year`.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Date on which a recurrence with `day_of_month` fires in the given month.
pub fn due_date(day_of_month: u32, year: i32, month: u32) -> Option<NaiveDate> {
    if day_of_month == 0 {
        return None;
    }
    let day = day_of_month.min(last_day_of_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `YYYY-MM` period key for `date`.
pub fn period_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Fields supplied by the user when creating or editing a recurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurrenceDraft {
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub day_of_month: u32,
}

impl RecurrenceDraft {
    pub fn validate(&self) -> ResultEngine<()> {
        if !(1..=31).contains(&self.day_of_month) {
            return Err(EngineError::InvalidDay(format!(
                "{} is not in 1..=31",
                self.day_of_month
            )));
        }
        self.amount.validate_entry()?;
        if self.category.kind() != self.kind {
            return Err(EngineError::InvalidCategory(format!(
                "category {} does not belong to {}",
                self.category.code(),
                self.kind.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRecurrence {
    pub id: Uuid,
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub day_of_month: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl FixedRecurrence {
    pub(crate) fn from_draft(draft: RecurrenceDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            kind: draft.kind,
            amount: draft.amount,
            category: draft.category,
            payment_method: draft.payment_method,
            description: normalize_optional_text(draft.description.as_deref()),
            day_of_month: draft.day_of_month,
            active: true,
            created_at,
        }
    }

    /// `true` when `date` is this recurrence's (clamped) due date.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.active && due_date(self.day_of_month, date.year(), date.month()) == Some(date)
    }

    /// Entry to insert when materializing the recurrence at `occurred_at`.
    pub fn to_new_transaction(&self, occurred_at: DateTime<Utc>) -> NewTransaction {
        NewTransaction {
            user_id: self.user_id,
            kind: self.kind,
            amount: self.amount,
            category: self.category,
            payment_method: self.payment_method,
            description: self.description.clone(),
            occurred_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fixed_recurrences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub category: String,
    pub payment_method: String,
    pub description: Option<String>,
    pub day_of_month: i32,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&FixedRecurrence> for ActiveModel {
    fn from(rec: &FixedRecurrence) -> Self {
        Self {
            id: ActiveValue::Set(rec.id.to_string()),
            user_id: ActiveValue::Set(rec.user_id),
            kind: ActiveValue::Set(rec.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(rec.amount.minor()),
            category: ActiveValue::Set(rec.category.code().to_string()),
            payment_method: ActiveValue::Set(rec.payment_method.code().to_string()),
            description: ActiveValue::Set(rec.description.clone()),
            day_of_month: ActiveValue::Set(rec.day_of_month as i32),
            active: ActiveValue::Set(rec.active),
            created_at: ActiveValue::Set(rec.created_at),
        }
    }
}

impl TryFrom<Model> for FixedRecurrence {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let day_of_month = u32::try_from(model.day_of_month)
            .map_err(|_| EngineError::InvalidDay(format!("stored day {}", model.day_of_month)))?;
        Ok(Self {
            id: parse_uuid(&model.id, "recurrence")?,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            category: Category::try_from(model.category.as_str())?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            description: model.description,
            day_of_month,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
