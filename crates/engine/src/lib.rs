//! Ledger engine for the Gastos bot.
//!
//! The engine owns the persistent state of the household ledger:
//!
//! - [`Transaction`]: a single expense or income entry.
//! - [`FixedRecurrence`]: a monthly template materialized into transactions.
//!
//! Read-side aggregation lives in [`summary`]; it never caches and is always
//! computed from the rows returned by the store.

pub use categories::Category;
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, Materialized};
pub use payment::PaymentMethod;
pub use recurrences::{FixedRecurrence, RecurrenceDraft, due_date, last_day_of_month, period_key};
pub use transactions::{NewTransaction, Transaction, TransactionKind};

pub mod summary;

mod categories;
mod error;
mod money;
mod ops;
mod payment;
mod recurrences;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
