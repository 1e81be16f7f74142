use std::{future::Future, time::Duration};

use chrono_tz::Tz;
use engine::Transaction;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{SheetRow, SyncError};

/// Destination of mirrored rows.
pub trait RowSink: Send + Sync {
    /// Called once before the first event, e.g. to write the header row.
    fn prepare(&self) -> impl Future<Output = Result<(), SyncError>> + Send {
        async { Ok(()) }
    }

    fn append(&self, row: &SheetRow) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Remove the row whose `ID` cell equals `id`. Missing rows are not an error.
    fn remove(&self, id: &str) -> impl Future<Output = Result<(), SyncError>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Appended(Transaction),
    Removed(Transaction),
}

/// Producer side of the sink queue. Sending never blocks and never fails.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl SyncHandle {
    /// A handle that drops every event, used when no spreadsheet is configured.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn send(&self, event: SyncEvent) {
        match &self.tx {
            Some(tx) => {
                if tx.send(event).is_err() {
                    tracing::warn!("sync worker stopped, event dropped");
                }
            }
            None => tracing::debug!("sync disabled, event dropped"),
        }
    }
}

/// Applies queued events to a [`RowSink`], retrying each one a bounded
/// number of times with exponential backoff.
pub struct SyncWorker<S> {
    sink: S,
    tz: Tz,
    max_attempts: u32,
    base_delay: Duration,
}

impl<S: RowSink + 'static> SyncWorker<S> {
    pub fn new(sink: S, tz: Tz) -> Self {
        Self {
            sink,
            tz,
            max_attempts: 4,
            base_delay: Duration::from_secs(2),
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Start the worker task. It ends once every [`SyncHandle`] is dropped and
    /// the queue is drained.
    pub fn spawn(self) -> (SyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (SyncHandle { tx: Some(tx) }, task)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<SyncEvent>) {
        if let Err(err) = self.sink.prepare().await {
            tracing::warn!("sheet setup failed: {err}");
        }

        while let Some(event) = rx.recv().await {
            self.apply(&event).await;
        }
        tracing::info!("sync worker stopped");
    }

    async fn apply(&self, event: &SyncEvent) {
        let (action, id) = match event {
            SyncEvent::Appended(tx) => ("append", tx.id),
            SyncEvent::Removed(tx) => ("remove", tx.id),
        };

        let mut attempt = 1;
        loop {
            let result = match event {
                SyncEvent::Appended(tx) => {
                    let row = SheetRow::from_transaction(tx, self.tz);
                    self.sink.append(&row).await
                }
                SyncEvent::Removed(tx) => self.sink.remove(&tx.id.to_string()).await,
            };

            match result {
                Ok(()) => {
                    tracing::debug!("synced {action} of {id}");
                    return;
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!("giving up on {action} of {id} after {attempt} attempts: {err}");
                    return;
                }
                Err(err) => {
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    tracing::warn!("{action} of {id} failed (attempt {attempt}): {err}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
