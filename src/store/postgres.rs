use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row as _};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::model::{
    Projection, ReferenceUids, Row, TableSpec, Uid, UpdatePlan, UpsertStatement, UpsertedRow,
    WrittenRow,
};
use crate::store::sql;
use crate::store::traits::{BulkWriteStore, ReferenceStore, Store};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, &DatabaseConfig::default()).await
    }

    /// Create a store with pool limits taken from configuration
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgPoolOptions::new().max_connections(config.max_connections.unwrap_or(20));
        if let Some(secs) = config.acquire_timeout_secs {
            options = options.acquire_timeout(Duration::from_secs(secs));
        }

        let pool = options
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_row(value: Value) -> Result<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("Expected a JSON object row, got {}", other)),
    }
}

/// Null entries are unset references.
fn into_references(value: Value) -> Result<ReferenceUids> {
    into_row(value)?
        .into_iter()
        .filter(|(_, uid)| !uid.is_null())
        .map(|(column, uid)| match uid {
            Value::String(uid) => Ok((column, uid)),
            other => Err(anyhow!("Expected a uid for {}, got {}", column, other)),
        })
        .collect()
}

fn decode_written(row: &PgRow) -> Result<WrittenRow> {
    let value: Value = row.try_get("row")?;
    let references: Value = row.try_get("refs")?;
    Ok(WrittenRow {
        row: into_row(value)?,
        references: into_references(references)?,
    })
}

#[async_trait::async_trait]
impl ReferenceStore for PostgresStore {
    async fn fetch_live(&self, spec: &'static TableSpec, uids: &[Uid]) -> Result<Vec<Projection>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = sql::select_live(spec, uids);
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to resolve {} identifiers", spec.kind))?;

        rows.into_iter()
            .map(|row| -> Result<Projection> {
                let attributes: Value = row.try_get("attributes")?;
                Ok(Projection {
                    id: row.try_get("id")?,
                    uid: row.try_get("uid")?,
                    attributes: into_row(attributes)?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BulkWriteStore for PostgresStore {
    async fn execute_upsert(&self, statement: &UpsertStatement) -> Result<Vec<UpsertedRow>> {
        if statement.rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin upsert transaction")?;

        let mut query = sql::render_upsert(statement);
        let rows = query
            .build()
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert into {}", statement.spec.table))?;

        // Decoded before the commit: a malformed row must not surface as an
        // error for a batch that was written.
        let upserted = rows
            .iter()
            .map(|row| -> Result<UpsertedRow> {
                let inserted: bool = row.try_get("inserted")?;
                let written = decode_written(row)?;
                Ok(UpsertedRow {
                    row: written.row,
                    references: written.references,
                    inserted,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tx.commit().await.context("Failed to commit upsert")?;
        Ok(upserted)
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> Result<Vec<WrittenRow>> {
        if plan.targets.is_empty() {
            return Ok(Vec::new());
        }

        // Nothing to assign: the statement degenerates to reading the targets.
        let (mut query, action) = if plan.is_noop() {
            (sql::select_live_rows(plan.spec, &plan.targets), "read")
        } else {
            (sql::render_update(plan), "update")
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin update transaction")?;

        let rows = query
            .build()
            .fetch_all(&mut *tx)
            .await
            .with_context(|| format!("Failed to {} {}", action, plan.spec.table))?;

        let written = rows.iter().map(decode_written).collect::<Result<Vec<_>>>()?;

        tx.commit().await.context("Failed to commit update")?;
        Ok(written)
    }
}

impl Store for PostgresStore {}
