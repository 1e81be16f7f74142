use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::America::Lima;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Category, Engine, EngineError, Money, NewTransaction, PaymentMethod, TransactionKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn expense(user_id: i64, minor: i64, category: Category, when: DateTime<Utc>) -> NewTransaction {
    NewTransaction {
        user_id,
        kind: TransactionKind::Expense,
        amount: Money::new(minor),
        category,
        payment_method: PaymentMethod::Yape,
        description: None,
        occurred_at: when,
    }
}

#[tokio::test]
async fn insert_then_list_orders_by_timestamp_ascending() {
    let (engine, _db) = engine_with_db().await;

    let late = engine
        .insert_transaction(expense(1, 300, Category::Comida, at("2026-10-16T18:00:00Z")))
        .await
        .unwrap();
    let early = engine
        .insert_transaction(expense(1, 100, Category::Transporte, at("2026-10-16T08:00:00Z")))
        .await
        .unwrap();
    engine
        .insert_transaction(expense(2, 999, Category::Comida, at("2026-10-16T09:00:00Z")))
        .await
        .unwrap();

    let rows = engine
        .list_transactions(1, at("2026-10-16T00:00:00Z"), at("2026-10-17T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, early.id);
    assert_eq!(rows[1].id, late.id);
    assert_eq!(rows[1].amount, Money::new(300));
    assert_eq!(rows[1].category, Category::Comida);
    assert_eq!(rows[1].payment_method, PaymentMethod::Yape);
}

#[tokio::test]
async fn insert_rejects_invalid_entries_without_writing() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .insert_transaction(expense(1, 0, Category::Comida, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .insert_transaction(expense(1, 100, Category::Salario, Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCategory(_)));

    assert!(engine.recent_transactions(1, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_most_recent_removes_only_latest_row_of_user() {
    let (engine, _db) = engine_with_db().await;
    let base = at("2026-10-16T12:00:00Z");

    let first = engine
        .insert_transaction(expense(1, 100, Category::Comida, base))
        .await
        .unwrap();
    let latest = engine
        .insert_transaction(expense(1, 200, Category::Comida, base + Duration::minutes(5)))
        .await
        .unwrap();
    let older_inserted_later = engine
        .insert_transaction(expense(1, 300, Category::Comida, base - Duration::hours(1)))
        .await
        .unwrap();
    let other_user = engine
        .insert_transaction(expense(2, 400, Category::Comida, base + Duration::hours(1)))
        .await
        .unwrap();

    let removed = engine.delete_most_recent(1).await.unwrap().unwrap();
    assert_eq!(removed.id, latest.id);

    let remaining: Vec<_> = engine
        .recent_transactions(1, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|tx| tx.id)
        .collect();
    assert_eq!(remaining, vec![first.id, older_inserted_later.id]);

    let others = engine.recent_transactions(2, 10).await.unwrap();
    assert_eq!(others.len(), 1);
    assert_eq!(others[0].id, other_user.id);
}

#[tokio::test]
async fn delete_most_recent_on_empty_ledger_is_none() {
    let (engine, _db) = engine_with_db().await;
    assert!(engine.delete_most_recent(42).await.unwrap().is_none());
}

#[tokio::test]
async fn attach_photo_requires_owner() {
    let (engine, _db) = engine_with_db().await;
    let tx = engine
        .insert_transaction(expense(1, 100, Category::Comida, Utc::now()))
        .await
        .unwrap();

    let err = engine
        .attach_photo(2, tx.id, "data/photos/x.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let path = format!("data/photos/{}.jpg", tx.id);
    engine.attach_photo(1, tx.id, &path).await.unwrap();
    let stored = engine.transaction(1, tx.id).await.unwrap();
    assert_eq!(stored.photo.as_deref(), Some(path.as_str()));
}

#[tokio::test]
async fn daily_total_includes_new_entry() {
    let (engine, _db) = engine_with_db().await;
    // 16:00 UTC is 11:00 in Lima.
    let now = at("2026-10-16T16:00:00Z");

    engine
        .insert_transaction(expense(1, 2000, Category::Transporte, now - Duration::hours(3)))
        .await
        .unwrap();
    // Previous local day (23:00 Lima on the 15th).
    engine
        .insert_transaction(expense(1, 5000, Category::Comida, at("2026-10-16T04:00:00Z")))
        .await
        .unwrap();
    engine
        .insert_transaction(NewTransaction {
            kind: TransactionKind::Income,
            category: Category::Salario,
            ..expense(1, 100_000, Category::Salario, now)
        })
        .await
        .unwrap();

    let before = engine.today_expense_total(1, now, Lima).await.unwrap();
    assert_eq!(before, Money::new(2000));

    engine
        .insert_transaction(expense(1, 8500, Category::Comida, now))
        .await
        .unwrap();
    let after = engine.today_expense_total(1, now, Lima).await.unwrap();
    assert_eq!(after, Money::new(10_500));

    let day = engine
        .day_summary(1, NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(), Lima)
        .await
        .unwrap();
    assert_eq!(day.transactions.len(), 3);
    assert_eq!(day.income, Money::new(100_000));
    assert_eq!(day.expenses, Money::new(10_500));
}

#[tokio::test]
async fn month_summary_covers_local_month() {
    let (engine, _db) = engine_with_db().await;

    engine
        .insert_transaction(expense(1, 1000, Category::Comida, at("2026-10-01T06:00:00Z")))
        .await
        .unwrap();
    engine
        .insert_transaction(expense(1, 4000, Category::Vivienda, at("2026-10-20T06:00:00Z")))
        .await
        .unwrap();
    // 2026-11-01 02:00 UTC is still October 31st in Lima.
    engine
        .insert_transaction(expense(1, 500, Category::Comida, at("2026-11-01T02:00:00Z")))
        .await
        .unwrap();
    // 2026-10-01 03:00 UTC is September 30th in Lima.
    engine
        .insert_transaction(expense(1, 7777, Category::Comida, at("2026-10-01T03:00:00Z")))
        .await
        .unwrap();

    let summary = engine.month_summary(1, 2026, 10, Lima).await.unwrap();
    assert_eq!(summary.expenses, Money::new(5500));
    assert_eq!(summary.by_category[0].category, Category::Vivienda);
    assert_eq!(summary.by_category[1].total, Money::new(1500));
}

#[tokio::test]
async fn daily_total_of_largest_entries_does_not_overflow() {
    let (engine, _db) = engine_with_db().await;
    let now = at("2026-10-16T15:00:00Z");

    for _ in 0..2 {
        let mut big = expense(1, 0, Category::OtrosGasto, now);
        big.amount = Money::MAX_ENTRY;
        engine.insert_transaction(big).await.unwrap();
    }
    let too_big = expense(1, 100_000_000_001, Category::OtrosGasto, now);
    let err = engine.insert_transaction(too_big).await.unwrap_err();
    assert!(err.is_validation());

    let total = engine.today_expense_total(1, now, Lima).await.unwrap();
    assert_eq!(total, Money::new(200_000_000_000));
}

#[tokio::test]
async fn delete_most_recent_breaks_timestamp_ties_by_insertion_order() {
    let (engine, _db) = engine_with_db().await;
    let when = at("2026-10-16T15:00:00Z");

    let first = engine
        .insert_transaction(expense(1, 100, Category::Comida, when))
        .await
        .unwrap();
    let second = engine
        .insert_transaction(expense(1, 200, Category::Comida, when))
        .await
        .unwrap();

    let recent = engine.recent_transactions(1, 10).await.unwrap();
    assert_eq!(recent[0].id, second.id);

    let removed = engine.delete_most_recent(1).await.unwrap().unwrap();
    assert_eq!(removed.id, second.id);
    let removed = engine.delete_most_recent(1).await.unwrap().unwrap();
    assert_eq!(removed.id, first.id);
}
