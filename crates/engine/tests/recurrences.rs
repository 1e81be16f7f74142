use chrono::{NaiveDate, Utc};
use chrono_tz::America::Lima;
use sea_orm::Database;

use engine::{
    Category, Engine, EngineError, Money, PaymentMethod, RecurrenceDraft, TransactionKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rent(user_id: i64, day_of_month: u32) -> RecurrenceDraft {
    RecurrenceDraft {
        user_id,
        kind: TransactionKind::Expense,
        amount: Money::new(150_000),
        category: Category::Vivienda,
        payment_method: PaymentMethod::Bcp,
        description: Some("alquiler".to_string()),
        day_of_month,
    }
}

#[tokio::test]
async fn upsert_creates_then_updates_in_place() {
    let engine = engine().await;

    let created = engine.upsert_recurrence(None, rent(1, 5)).await.unwrap();
    assert!(created.active);

    let mut changed = rent(1, 10);
    changed.amount = Money::new(160_000);
    let updated = engine
        .upsert_recurrence(Some(created.id), changed)
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.day_of_month, 10);

    let listed = engine.list_recurrences(1, true).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].amount, Money::new(160_000));
}

#[tokio::test]
async fn upsert_with_foreign_id_creates_new_row() {
    let engine = engine().await;
    let owned_by_other = engine.upsert_recurrence(None, rent(2, 5)).await.unwrap();

    let mine = engine
        .upsert_recurrence(Some(owned_by_other.id), rent(1, 5))
        .await
        .unwrap();
    assert_ne!(mine.id, owned_by_other.id);
    assert_eq!(engine.list_recurrences(2, true).await.unwrap()[0].user_id, 2);
}

#[tokio::test]
async fn upsert_rejects_invalid_day() {
    let engine = engine().await;
    let err = engine.upsert_recurrence(None, rent(1, 0)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidDay(_)));
}

#[tokio::test]
async fn deactivate_is_soft_and_idempotent() {
    let engine = engine().await;
    let rec = engine.upsert_recurrence(None, rent(1, 5)).await.unwrap();

    let off = engine.deactivate_recurrence(1, rec.id).await.unwrap();
    assert!(!off.active);
    let again = engine.deactivate_recurrence(1, rec.id).await.unwrap();
    assert!(!again.active);

    assert!(engine.list_recurrences(1, false).await.unwrap().is_empty());
    assert_eq!(engine.list_recurrences(1, true).await.unwrap().len(), 1);

    let err = engine
        .deactivate_recurrence(2, rec.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine
        .deactivate_recurrence(1, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn day_31_materializes_on_last_day_of_30_day_month_once() {
    let engine = engine().await;
    let rec = engine.upsert_recurrence(None, rent(1, 31)).await.unwrap();

    let none = engine
        .materialize_due(date(2026, 4, 29), Utc::now(), Lima)
        .await
        .unwrap();
    assert!(none.is_empty());

    let created = engine
        .materialize_due(date(2026, 4, 30), Utc::now(), Lima)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].recurrence.id, rec.id);
    let tx = &created[0].transaction;
    assert_eq!(tx.recurrence_id, Some(rec.id));
    assert_eq!(tx.recurrence_period.as_deref(), Some("2026-04"));
    assert_eq!(tx.amount, Money::new(150_000));
    assert_eq!(tx.category, Category::Vivienda);
    assert_eq!(tx.description.as_deref(), Some("alquiler"));

    let again = engine
        .materialize_due(date(2026, 4, 30), Utc::now(), Lima)
        .await
        .unwrap();
    assert!(again.is_empty());
    assert_eq!(engine.recent_transactions(1, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rerun_same_day_inserts_exactly_one() {
    let engine = engine().await;
    engine.upsert_recurrence(None, rent(1, 16)).await.unwrap();
    engine.upsert_recurrence(None, rent(2, 16)).await.unwrap();

    let first = engine
        .materialize_due(date(2026, 10, 16), Utc::now(), Lima)
        .await
        .unwrap();
    let second = engine
        .materialize_due(date(2026, 10, 16), Utc::now(), Lima)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert!(second.is_empty());

    // Next month materializes again.
    let next = engine
        .materialize_due(date(2026, 11, 16), Utc::now(), Lima)
        .await
        .unwrap();
    assert_eq!(next.len(), 2);
}

#[tokio::test]
async fn inactive_recurrences_are_skipped() {
    let engine = engine().await;
    let rec = engine.upsert_recurrence(None, rent(1, 16)).await.unwrap();
    engine.deactivate_recurrence(1, rec.id).await.unwrap();

    let created = engine
        .materialize_due(date(2026, 10, 16), Utc::now(), Lima)
        .await
        .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn deleting_materialized_row_allows_explicit_rerun() {
    let engine = engine().await;
    engine.upsert_recurrence(None, rent(1, 16)).await.unwrap();

    engine
        .materialize_due(date(2026, 10, 16), Utc::now(), Lima)
        .await
        .unwrap();
    engine.delete_most_recent(1).await.unwrap().unwrap();

    let rerun = engine
        .materialize_due(date(2026, 10, 16), Utc::now(), Lima)
        .await
        .unwrap();
    assert_eq!(rerun.len(), 1);
}

#[tokio::test]
async fn catch_up_run_books_the_row_in_its_own_month() {
    let engine = engine().await;
    engine.upsert_recurrence(None, rent(1, 30)).await.unwrap();

    // Run for the last day of September two days late, in October.
    let now = "2026-10-02T15:00:00Z".parse().unwrap();
    let created = engine
        .materialize_due(date(2026, 9, 30), now, Lima)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(
        engine::summary::local_date(created[0].transaction.occurred_at, Lima),
        date(2026, 9, 30)
    );

    let september = engine.month_summary(1, 2026, 9, Lima).await.unwrap();
    assert_eq!(september.expenses, Money::new(150_000));
    let october = engine.month_summary(1, 2026, 10, Lima).await.unwrap();
    assert_eq!(october.expenses, Money::ZERO);
}

#[tokio::test]
async fn same_day_run_keeps_the_run_time() {
    let engine = engine().await;
    engine.upsert_recurrence(None, rent(1, 16)).await.unwrap();

    let now = "2026-10-16T13:00:00Z".parse().unwrap();
    let created = engine
        .materialize_due(date(2026, 10, 16), now, Lima)
        .await
        .unwrap();
    assert_eq!(created[0].transaction.occurred_at, now);
}
