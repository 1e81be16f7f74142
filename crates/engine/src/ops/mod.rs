use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;

use crate::ResultEngine;

mod recurrences;
mod summary;
mod transactions;

pub use recurrences::Materialized;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Ledger store.
///
/// Reads go straight to the database. Writes additionally take `write_lock`,
/// so the scheduler and chat handlers never interleave their inserts.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    write_lock: Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Underlying connection, for callers that run migrations or raw checks.
    pub fn database(&self) -> &DatabaseConnection {
        &self.database
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            write_lock: Mutex::new(()),
        })
    }
}
