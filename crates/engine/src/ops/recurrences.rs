use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, SqlErr, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, FixedRecurrence, RecurrenceDraft, ResultEngine, Transaction, period_key,
    recurrences, summary, transactions, util::normalize_optional_text,
};

use super::{Engine, with_tx};

/// A transaction created by the scheduler together with its template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Materialized {
    pub recurrence: FixedRecurrence,
    pub transaction: Transaction,
}

impl Engine {
    /// Create a recurrence, or replace the fields of an existing one owned by
    /// the same user. Updating re-activates a deactivated recurrence.
    pub async fn upsert_recurrence(
        &self,
        id: Option<Uuid>,
        draft: RecurrenceDraft,
    ) -> ResultEngine<FixedRecurrence> {
        draft.validate()?;

        let _guard = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let existing = match id {
                Some(id) => recurrences::Entity::find_by_id(id.to_string())
                    .filter(recurrences::Column::UserId.eq(draft.user_id))
                    .one(&db_tx)
                    .await?
                    .map(FixedRecurrence::try_from)
                    .transpose()?,
                None => None,
            };

            match existing {
                Some(mut current) => {
                    current.kind = draft.kind;
                    current.amount = draft.amount;
                    current.category = draft.category;
                    current.payment_method = draft.payment_method;
                    current.description = normalize_optional_text(draft.description.as_deref());
                    current.day_of_month = draft.day_of_month;
                    current.active = true;

                    let mut active = recurrences::ActiveModel::from(&current);
                    active.created_at = ActiveValue::NotSet;
                    active.update(&db_tx).await?;
                    Ok::<_, EngineError>(current)
                }
                None => {
                    let created = FixedRecurrence::from_draft(draft, Utc::now());
                    recurrences::ActiveModel::from(&created)
                        .insert(&db_tx)
                        .await?;
                    tracing::info!(
                        "created recurrence {} for user {} on day {}",
                        created.id,
                        created.user_id,
                        created.day_of_month
                    );
                    Ok(created)
                }
            }
        })
    }

    /// Recurrences of `user_id`, ordered by day of month.
    pub async fn list_recurrences(
        &self,
        user_id: i64,
        include_inactive: bool,
    ) -> ResultEngine<Vec<FixedRecurrence>> {
        let mut query =
            recurrences::Entity::find().filter(recurrences::Column::UserId.eq(user_id));
        if !include_inactive {
            query = query.filter(recurrences::Column::Active.eq(true));
        }
        let models = query
            .order_by_asc(recurrences::Column::DayOfMonth)
            .order_by_asc(recurrences::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(FixedRecurrence::try_from).collect()
    }

    /// Soft-delete a recurrence. Deactivating twice is not an error.
    pub async fn deactivate_recurrence(
        &self,
        user_id: i64,
        id: Uuid,
    ) -> ResultEngine<FixedRecurrence> {
        let _guard = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let model = recurrences::Entity::find_by_id(id.to_string())
                .filter(recurrences::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("recurrence not exists".to_string()))?;

            let mut recurrence = FixedRecurrence::try_from(model)?;
            if recurrence.active {
                recurrences::ActiveModel {
                    id: ActiveValue::Set(recurrence.id.to_string()),
                    active: ActiveValue::Set(false),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
                recurrence.active = false;
                tracing::info!("deactivated recurrence {id} for user {user_id}");
            }
            Ok(recurrence)
        })
    }

    /// Materialize every active recurrence due on `date`.
    ///
    /// Each recurrence is committed on its own; a recurrence that already has
    /// a transaction for the period of `date` is skipped, so running this
    /// twice for the same day inserts nothing the second time.
    ///
    /// Rows are stamped `now` when `date` is today in `tz`, and local noon of
    /// `date` otherwise (explicit catch-up of a past day).
    pub async fn materialize_due(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> ResultEngine<Vec<Materialized>> {
        let period = period_key(date);
        let occurred_at = summary::instant_on(date, now, tz);
        let candidates: Vec<FixedRecurrence> = recurrences::Entity::find()
            .filter(recurrences::Column::Active.eq(true))
            .order_by_asc(recurrences::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(FixedRecurrence::try_from)
            .collect::<ResultEngine<_>>()?;

        let mut created = Vec::new();
        for recurrence in candidates.into_iter().filter(|r| r.is_due_on(date)) {
            if let Some(transaction) = self.materialize_one(&recurrence, &period, occurred_at).await? {
                created.push(Materialized {
                    recurrence,
                    transaction,
                });
            }
        }

        tracing::info!(
            "materialized {} fixed transaction(s) for {date}",
            created.len()
        );
        Ok(created)
    }

    async fn materialize_one(
        &self,
        recurrence: &FixedRecurrence,
        period: &str,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Option<Transaction>> {
        let _guard = self.write_lock.lock().await;
        let db_tx = self.database.begin().await?;

        let already = transactions::Entity::find()
            .filter(transactions::Column::RecurrenceId.eq(recurrence.id.to_string()))
            .filter(transactions::Column::RecurrencePeriod.eq(period))
            .one(&db_tx)
            .await?
            .is_some();
        if already {
            tracing::debug!("recurrence {} already materialized for {period}", recurrence.id);
            return Ok(None);
        }

        let new = recurrence.to_new_transaction(occurred_at);
        new.validate()?;
        let mut tx = Transaction::from_new(new);
        tx.recurrence_id = Some(recurrence.id);
        tx.recurrence_period = Some(period.to_string());

        match transactions::ActiveModel::from(&tx).insert(&db_tx).await {
            Ok(_) => {}
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!(
                    "recurrence {} raced to materialize for {period}",
                    recurrence.id
                );
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        }
        db_tx.commit().await?;
        Ok(Some(tx))
    }
}
