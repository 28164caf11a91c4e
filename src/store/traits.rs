use anyhow::Result;

use crate::model::{Projection, TableSpec, Uid, UpdatePlan, UpsertStatement, UpsertedRow, WrittenRow};

/// Read side used by the reference resolver. Implementations must be
/// side-effect free.
#[async_trait::async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Live rows of `spec` whose uid is in `uids`, fetched with one
    /// set-membership query.
    async fn fetch_live(&self, spec: &'static TableSpec, uids: &[Uid]) -> Result<Vec<Projection>>;
}

/// Write side. Each call is one statement inside one transaction; an error
/// means nothing was written.
///
/// Returned rows carry the uids of the rows they reference, read inside the
/// same transaction. Soft-deleted referenced rows are included so historical
/// references still render.
#[async_trait::async_trait]
pub trait BulkWriteStore: Send + Sync {
    /// Insert the candidates, resurrecting soft-deleted natural-key matches.
    /// Live matches are skipped or overwritten per the statement's policy;
    /// skipped candidates are simply absent from the result.
    async fn execute_upsert(&self, statement: &UpsertStatement) -> Result<Vec<UpsertedRow>>;

    /// Apply the plan to its live target rows and return them.
    async fn execute_update(&self, plan: &UpdatePlan) -> Result<Vec<WrittenRow>>;
}

pub trait Store: ReferenceStore + BulkWriteStore + Send + Sync {}
