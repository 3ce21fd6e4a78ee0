use crate::models::AuditLogRow;
use crate::errors::TerminalResult;
use crate::services::DatabaseClient;
use crate::repositories::repository_trait::Repository;
use async_trait::async_trait;
use sqlx_oldapi::Mssql;

pub const AUDIT_TABLE: &str = "TERMINAL_AUDIT_LOG";

/// A repository for the durable copy of the audit ledger.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    client: DatabaseClient,
}

impl AuditLogRepository {
    /// Creates a new `AuditLogRepository`.
    ///
    /// # Arguments
    /// * `client`: The `DatabaseClient` to use for database operations.
    pub fn new(client: DatabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Repository<AuditLogRow> for AuditLogRepository {
    /// Inserts one audit row.
    ///
    /// # Arguments
    /// * `row`: The `AuditLogRow` to persist
    ///
    /// # Returns
    /// * `Ok(())` if the insertion was successful
    /// * `Err(TerminalError)` if there was an error during the database operation
    async fn insert(&self, row: &AuditLogRow) -> TerminalResult<()> {
        let query = r#"
            INSERT INTO TERMINAL_AUDIT_LOG
            (AUDIT_ID, TERMINAL_ID, REQUEST_ID, ACTOR_ID, ENTITY_TYPE, ENTITY_ID, ACTION, BEFORE_JSON, AFTER_JSON, LOG_DTTM)
            VALUES
            (@p1, @p2, @p3, @p4, @p5, @p6, @p7, @p8, @p9, @p10)
        "#;

        sqlx_oldapi::query::<Mssql>(query)
            .bind(&row.AUDIT_ID)
            .bind(&row.TERMINAL_ID)
            .bind(&row.REQUEST_ID)
            .bind(&row.ACTOR_ID)
            .bind(&row.ENTITY_TYPE)
            .bind(&row.ENTITY_ID)
            .bind(&row.ACTION)
            .bind(&row.BEFORE_JSON)
            .bind(&row.AFTER_JSON)
            .bind(&row.LOG_DTTM)
            .execute(&*self.client.pool)
            .await?;

        Ok(())
    }

    /// Creates the audit table when it does not exist yet.
    async fn ensure_table(&self) -> TerminalResult<()> {
        let ddl = format!(
            r#"
            IF OBJECT_ID(N'{table}', N'U') IS NULL
            CREATE TABLE {table} (
                AUDIT_ID NVARCHAR(64) NOT NULL PRIMARY KEY,
                TERMINAL_ID NVARCHAR(64) NOT NULL,
                REQUEST_ID NVARCHAR(128) NOT NULL,
                ACTOR_ID NVARCHAR(128) NOT NULL,
                ENTITY_TYPE NVARCHAR(64) NOT NULL,
                ENTITY_ID NVARCHAR(128) NOT NULL,
                ACTION NVARCHAR(64) NOT NULL,
                BEFORE_JSON NVARCHAR(MAX) NULL,
                AFTER_JSON NVARCHAR(MAX) NULL,
                LOG_DTTM DATETIME2 NOT NULL
            )
            "#,
            table = AUDIT_TABLE
        );
        self.client.execute(&ddl).await?;
        Ok(())
    }
}
