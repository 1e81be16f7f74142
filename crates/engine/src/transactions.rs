//! Transaction primitives.
//!
//! A `Transaction` is one expense or income entry owned by a chat user.
//! Rows produced by the scheduler also carry the recurrence they came from and
//! the `YYYY-MM` period they were materialized for.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Category, EngineError, Money, PaymentMethod, ResultEngine,
    util::{normalize_optional_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }

    /// Spanish label used in chat and in the spreadsheet.
    pub fn label(self) -> &'static str {
        match self {
            Self::Expense => "Gasto",
            Self::Income => "Ingreso",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Expense => "💸",
            Self::Income => "💰",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense" => Ok(Self::Expense),
            "income" => Ok(Self::Income),
            other => Err(EngineError::InvalidCategory(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Input for [`Engine::insert_transaction`](crate::Engine::insert_transaction).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Check the entry invariants: positive amount and a category of the
    /// same kind as the transaction.
    pub fn validate(&self) -> ResultEngine<()> {
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
pub struct Transaction {
    pub id: Uuid,
    pub user_id: i64,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category: Category,
    pub payment_method: PaymentMethod,
    pub description: Option<String>,
    pub photo: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recurrence_id: Option<Uuid>,
    pub recurrence_period: Option<String>,
}

impl Transaction {
    pub(crate) fn from_new(new: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            amount: new.amount,
            category: new.category,
            payment_method: new.payment_method,
            description: normalize_optional_text(new.description.as_deref()),
            photo: None,
            occurred_at: new.occurred_at,
            recurrence_id: None,
            recurrence_period: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub category: String,
    pub payment_method: String,
    pub description: Option<String>,
    pub photo: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub recurrence_id: Option<String>,
    pub recurrence_period: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            category: ActiveValue::Set(tx.category.code().to_string()),
            payment_method: ActiveValue::Set(tx.payment_method.code().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            photo: ActiveValue::Set(tx.photo.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            recurrence_id: ActiveValue::Set(tx.recurrence_id.map(|id| id.to_string())),
            recurrence_period: ActiveValue::Set(tx.recurrence_period.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: Money::new(model.amount_minor),
            category: Category::try_from(model.category.as_str())?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            description: model.description,
            photo: model.photo,
            occurred_at: model.occurred_at,
            recurrence_id: model
                .recurrence_id
                .as_deref()
                .map(|id| parse_uuid(id, "recurrence"))
                .transpose()?,
            recurrence_period: model.recurrence_period,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: TransactionKind, category: Category, minor: i64) -> NewTransaction {
        NewTransaction {
            user_id: 1,
            kind,
            amount: Money::new(minor),
            category,
            payment_method: PaymentMethod::Yape,
            description: Some("  almuerzo ".to_string()),
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn validate_rejects_non_positive_amount() {
        let err = draft(TransactionKind::Expense, Category::Comida, 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn validate_rejects_kind_mismatch() {
        let err = draft(TransactionKind::Expense, Category::Salario, 100)
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCategory(_)));
    }

    #[test]
    fn model_round_trip_keeps_fields() {
        let tx = Transaction::from_new(draft(TransactionKind::Expense, Category::Comida, 8500));
        assert_eq!(tx.description.as_deref(), Some("almuerzo"));

        let active = ActiveModel::from(&tx);
        let model = Model {
            id: active.id.clone().unwrap(),
            user_id: active.user_id.clone().unwrap(),
            kind: active.kind.clone().unwrap(),
            amount_minor: active.amount_minor.clone().unwrap(),
            category: active.category.clone().unwrap(),
            payment_method: active.payment_method.clone().unwrap(),
            description: active.description.clone().unwrap(),
            photo: active.photo.clone().unwrap(),
            occurred_at: active.occurred_at.clone().unwrap(),
            recurrence_id: active.recurrence_id.clone().unwrap(),
            recurrence_period: active.recurrence_period.clone().unwrap(),
        };
        assert_eq!(Transaction::try_from(model).unwrap(), tx);
    }
}
