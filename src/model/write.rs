use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{ColumnSpec, DbId, LiveConflictPolicy, TableSpec, Uid};

/// A stored row as returned by the store: column name to JSON value,
/// including `id`, `uid` and the timestamp columns.
pub type Row = serde_json::Map<String, Value>;

/// One record that survived validation and resolution, with every column of
/// the table filled in (references already replaced by surrogate keys).
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub index: usize,
    pub uid: Uid,
    pub values: BTreeMap<&'static str, Value>,
}

impl CandidateRow {
    pub fn natural_key(&self, spec: &TableSpec) -> Option<String> {
        spec.natural_key_of(|column| self.values.get(column))
    }
}

/// A single insert-or-resurrect statement over a table.
#[derive(Debug, Clone)]
pub struct UpsertStatement {
    pub spec: &'static TableSpec,
    pub rows: Vec<CandidateRow>,
    pub live_conflict: LiveConflictPolicy,
}

impl UpsertStatement {
    pub fn columns(&self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.spec.columns.iter()
    }

    /// Columns overwritten when a conflicting row is taken over.
    pub fn update_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> + '_ {
        self.spec
            .columns
            .iter()
            .filter(|c| !self.spec.is_natural_key(c.column))
    }
}

/// External identifiers of a row's references, keyed by reference column.
/// Unset references have no entry.
pub type ReferenceUids = BTreeMap<String, Uid>;

/// A row as the write statement left it, with its reference identifiers read
/// in the same transaction. Nothing has to be fetched after the commit.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenRow {
    pub row: Row,
    pub references: ReferenceUids,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertedRow {
    pub row: Row,
    pub references: ReferenceUids,
    /// `false` when an existing (soft-deleted, or live under merge) row was
    /// taken over.
    pub inserted: bool,
}

impl From<UpsertedRow> for WrittenRow {
    fn from(upserted: UpsertedRow) -> Self {
        Self {
            row: upserted.row,
            references: upserted.references,
        }
    }
}

/// `column = CASE id WHEN .. THEN .. ELSE column END` for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalAssignment {
    pub column: &'static ColumnSpec,
    pub arms: Vec<(DbId, Value)>,
}

/// A single UPDATE over many rows with per-row values.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub spec: &'static TableSpec,
    pub assignments: Vec<ConditionalAssignment>,
    /// Rows whose `updated_at` is bumped (at least one supplied value).
    pub touched: Vec<DbId>,
    /// All rows the statement is scoped to, changed or not.
    pub targets: Vec<DbId>,
}

impl UpdatePlan {
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}
