//! One-way mirror of ledger rows to a spreadsheet.
//!
//! The bot and the scheduler never talk to the spreadsheet directly: they push
//! [`SyncEvent`]s through a [`SyncHandle`], and a worker task applies them to a
//! [`RowSink`] with bounded retries. A sink failure never reaches the user.

mod client;
mod error;
mod row;
mod worker;

pub use client::{GoogleSheetsClient, SheetsConfig};
pub use error::SyncError;
pub use row::{HEADERS, SheetRow};
pub use worker::{RowSink, SyncEvent, SyncHandle, SyncWorker};
