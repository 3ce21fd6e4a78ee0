use crate::models::{GateEventRow, TripEventRow};
use crate::errors::TerminalResult;
use crate::services::DatabaseClient;
use crate::repositories::repository_trait::Repository;
use async_trait::async_trait;
use sqlx_oldapi::Mssql;

pub const GATE_EVENT_TABLE: &str = "TERMINAL_GATE_EVENTS";
pub const TRIP_EVENT_TABLE: &str = "TERMINAL_TRIP_EVENTS";

/// Durable copy of the gate ledger.
#[derive(Debug, Clone)]
pub struct GateEventRepository {
    client: DatabaseClient,
}

impl GateEventRepository {
    pub fn new(client: DatabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Repository<GateEventRow> for GateEventRepository {
    async fn insert(&self, row: &GateEventRow) -> TerminalResult<()> {
        let query = r#"
            INSERT INTO TERMINAL_GATE_EVENTS
            (EVENT_ID, TERMINAL_ID, TRIP_ID, EVENT_TYPE, ACTOR_ID, EVIDENCE_JSON, EVENT_DTTM)
            VALUES
            (@p1, @p2, @p3, @p4, @p5, @p6, @p7)
        "#;

        sqlx_oldapi::query::<Mssql>(query)
            .bind(&row.EVENT_ID)
            .bind(&row.TERMINAL_ID)
            .bind(&row.TRIP_ID)
            .bind(&row.EVENT_TYPE)
            .bind(&row.ACTOR_ID)
            .bind(&row.EVIDENCE_JSON)
            .bind(&row.EVENT_DTTM)
            .execute(&*self.client.pool)
            .await?;

        Ok(())
    }

    async fn ensure_table(&self) -> TerminalResult<()> {
        let ddl = format!(
            r#"
            IF OBJECT_ID(N'{table}', N'U') IS NULL
            CREATE TABLE {table} (
                EVENT_ID NVARCHAR(64) NOT NULL PRIMARY KEY,
                TERMINAL_ID NVARCHAR(64) NOT NULL,
                TRIP_ID NVARCHAR(64) NOT NULL,
                EVENT_TYPE NVARCHAR(64) NOT NULL,
                ACTOR_ID NVARCHAR(128) NOT NULL,
                EVIDENCE_JSON NVARCHAR(MAX) NOT NULL,
                EVENT_DTTM DATETIME2 NOT NULL
            )
            "#,
            table = GATE_EVENT_TABLE
        );
        self.client.execute(&ddl).await?;
        Ok(())
    }
}

/// Durable copy of the custody ledger.
#[derive(Debug, Clone)]
pub struct TripEventRepository {
    client: DatabaseClient,
}

impl TripEventRepository {
    pub fn new(client: DatabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Repository<TripEventRow> for TripEventRepository {
    /// Inserts one custody event.
    ///
    /// # Arguments
    /// * `row`: The `TripEventRow` to persist
    ///
    /// # Returns
    /// * `Ok(())` if the insertion was successful
    /// * `Err(TerminalError)` if there was an error during the database operation
    async fn insert(&self, row: &TripEventRow) -> TerminalResult<()> {
        let query = r#"
            INSERT INTO TERMINAL_TRIP_EVENTS
            (EVENT_ID, TERMINAL_ID, TRIP_ID, EVENT_TYPE, STAGE, ACTOR_ID, DETAILS_JSON, EVENT_DTTM)
            VALUES
            (@p1, @p2, @p3, @p4, @p5, @p6, @p7, @p8)
        "#;

        sqlx_oldapi::query::<Mssql>(query)
            .bind(&row.EVENT_ID)
            .bind(&row.TERMINAL_ID)
            .bind(&row.TRIP_ID)
            .bind(&row.EVENT_TYPE)
            .bind(&row.STAGE)
            .bind(&row.ACTOR_ID)
            .bind(&row.DETAILS_JSON)
            .bind(&row.EVENT_DTTM)
            .execute(&*self.client.pool)
            .await?;

        Ok(())
    }

    async fn ensure_table(&self) -> TerminalResult<()> {
        let ddl = format!(
            r#"
            IF OBJECT_ID(N'{table}', N'U') IS NULL
            CREATE TABLE {table} (
                EVENT_ID NVARCHAR(64) NOT NULL PRIMARY KEY,
                TERMINAL_ID NVARCHAR(64) NOT NULL,
                TRIP_ID NVARCHAR(64) NOT NULL,
                EVENT_TYPE NVARCHAR(64) NOT NULL,
                STAGE NVARCHAR(64) NULL,
                ACTOR_ID NVARCHAR(128) NOT NULL,
                DETAILS_JSON NVARCHAR(MAX) NOT NULL,
                EVENT_DTTM DATETIME2 NOT NULL
            )
            "#,
            table = TRIP_EVENT_TABLE
        );
        self.client.execute(&ddl).await?;
        Ok(())
    }
}
