use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{EngineError, NewTransaction, ResultEngine, Transaction, transactions};

use super::{Engine, with_tx};

impl Engine {
    /// Insert a validated entry and return the stored row.
    pub async fn insert_transaction(&self, new: NewTransaction) -> ResultEngine<Transaction> {
        new.validate()?;
        let tx = Transaction::from_new(new);

        let _guard = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok::<_, EngineError>(())
        })?;

        tracing::debug!(
            "inserted transaction {} for user {} ({} {})",
            tx.id,
            tx.user_id,
            tx.kind.as_str(),
            tx.amount
        );
        Ok(tx)
    }

    /// Delete the latest-timestamped transaction of `user_id`, returning it.
    /// Rows sharing a timestamp go in insertion order (SQLite `rowid`).
    pub async fn delete_most_recent(&self, user_id: i64) -> ResultEngine<Option<Transaction>> {
        let _guard = self.write_lock.lock().await;
        let removed = with_tx!(self, |db_tx| {
            let latest = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(Expr::cust("rowid"))
                .one(&db_tx)
                .await?;

            match latest {
                Some(model) => {
                    transactions::Entity::delete_by_id(model.id.clone())
                        .exec(&db_tx)
                        .await?;
                    Ok::<_, EngineError>(Some(Transaction::try_from(model)?))
                }
                None => Ok(None),
            }
        })?;

        if let Some(tx) = &removed {
            tracing::debug!("deleted transaction {} for user {user_id}", tx.id);
        }
        Ok(removed)
    }

    /// Transactions of `user_id` with `from <= occurred_at < to`, oldest first.
    pub async fn list_transactions(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::OccurredAt.gte(from))
            .filter(transactions::Column::OccurredAt.lt(to))
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Every transaction in the range regardless of owner, oldest first.
    pub async fn list_all_transactions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::OccurredAt.gte(from))
            .filter(transactions::Column::OccurredAt.lt(to))
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(Expr::cust("rowid"))
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Latest `limit` transactions of `user_id`, newest first.
    pub async fn recent_transactions(
        &self,
        user_id: i64,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(Expr::cust("rowid"))
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    pub async fn transaction(&self, user_id: i64, id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))?;
        Transaction::try_from(model)
    }

    /// Record the stored photo path of a transaction owned by `user_id`.
    pub async fn attach_photo(&self, user_id: i64, id: Uuid, path: &str) -> ResultEngine<()> {
        let _guard = self.write_lock.lock().await;
        with_tx!(self, |db_tx| {
            let exists = transactions::Entity::find_by_id(id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .is_some();
            if !exists {
                return Err(EngineError::KeyNotFound(
                    "transaction not exists".to_string(),
                ));
            }

            transactions::ActiveModel {
                id: ActiveValue::Set(id.to_string()),
                photo: ActiveValue::Set(Some(path.to_string())),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok(())
        })
    }
}
