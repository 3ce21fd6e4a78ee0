use async_trait::async_trait;
use sqlx_oldapi::FromRow;
use crate::errors::TerminalResult;

/// Defines a generic asynchronous repository interface for appending ledger rows to the database
#[async_trait]
pub trait Repository<T>
    where
        T: for<'r> FromRow<'r, sqlx_oldapi::mssql::MssqlRow> + Send + Sync + Unpin,
{
    /// Inserts a single item into the database
    ///
    /// # Arguments
    ///
    /// * `item`: A reference to the item of type `T` to be inserted
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the insertion is successful
    /// * `Err(TerminalError)` if an error occurs during the insertion
    async fn insert(&self, item: &T) -> TerminalResult<()>;

    /// Creates the backing table when it does not exist yet
    async fn ensure_table(&self) -> TerminalResult<()>;
}
