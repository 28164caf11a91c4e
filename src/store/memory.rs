//! In-process store with the same semantics as [`PostgresStore`]: soft
//! deletes, natural-key resurrection, live-conflict policy and live-only
//! updates. Every call is recorded so callers can assert on query counts.
//!
//! [`PostgresStore`]: crate::store::PostgresStore

use anyhow::{anyhow, bail, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::model::{
    generate_uid, spec, DbId, EntityKind, LiveConflictPolicy, Projection, ReferenceUids, Row,
    TableSpec, Uid, UpdatePlan, UpsertStatement, UpsertedRow, WrittenRow,
};
use crate::store::traits::{BulkWriteStore, ReferenceStore, Store};

/// Calls observed by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    /// One entry per set-membership lookup, with the uids it asked for.
    pub lookups: Vec<(EntityKind, Vec<Uid>)>,
    pub upsert_statements: usize,
    pub update_statements: usize,
}

impl StoreStats {
    pub fn lookups_for(&self, kind: EntityKind) -> usize {
        self.lookups.iter().filter(|(k, _)| *k == kind).count()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<EntityKind, Vec<Row>>,
    last_id: DbId,
    stats: StoreStats,
    fail_writes: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }

    /// Uids of the rows `row` points at, soft-deleted targets included.
    fn reference_uids(&self, spec: &TableSpec, row: &Row) -> ReferenceUids {
        spec.reference_columns()
            .filter_map(|column| {
                let kind = column.reference?;
                let id = row.get(column.column)?.as_i64()?;
                let target = self.tables.get(&kind)?.iter().find(|r| id_of(r) == Some(id))?;
                let uid = target.get("uid")?.as_str()?;
                Some((column.column.to_string(), uid.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

fn is_live(row: &Row) -> bool {
    row.get("deleted_at").map_or(true, Value::is_null)
}

fn id_of(row: &Row) -> Option<DbId> {
    row.get("id").and_then(Value::as_i64)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a live row directly. `fields` is keyed by column name; columns
    /// left out take their declared default.
    pub fn seed(&self, kind: EntityKind, uid: &str, fields: Value) -> DbId {
        let table = spec(kind);
        let mut state = self.state.lock();
        let id = state.next_id();

        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(id));
        row.insert("uid".to_string(), Value::String(uid.to_string()));
        for column in table.columns {
            row.insert(column.column.to_string(), column.default.to_json());
        }
        if let Value::Object(fields) = fields {
            row.extend(fields);
        }
        row.insert("created_at".to_string(), now());
        row.insert("updated_at".to_string(), now());
        row.insert("deleted_at".to_string(), Value::Null);

        state.tables.entry(kind).or_default().push(row);
        id
    }

    /// Seed with a generated uid.
    pub fn seed_new(&self, kind: EntityKind, fields: Value) -> (DbId, Uid) {
        let uid = generate_uid(kind);
        (self.seed(kind, &uid, fields), uid)
    }

    pub fn soft_delete(&self, kind: EntityKind, uid: &str) -> bool {
        let mut state = self.state.lock();
        let Some(row) = state
            .tables
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("uid").and_then(Value::as_str) == Some(uid)))
        else {
            return false;
        };
        row.insert("deleted_at".to_string(), now());
        true
    }

    pub fn row(&self, kind: EntityKind, uid: &str) -> Option<Row> {
        self.state.lock().tables.get(&kind).and_then(|rows| {
            rows.iter()
                .find(|r| r.get("uid").and_then(Value::as_str) == Some(uid))
                .cloned()
        })
    }

    /// All rows of a kind, soft-deleted ones included.
    pub fn rows(&self, kind: EntityKind) -> Vec<Row> {
        self.state.lock().tables.get(&kind).cloned().unwrap_or_default()
    }

    pub fn stats(&self) -> StoreStats {
        self.state.lock().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats = StoreStats::default();
    }

    /// Make every following write fail, as a lost connection would.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }
}

#[async_trait::async_trait]
impl ReferenceStore for MemoryStore {
    async fn fetch_live(&self, spec: &'static TableSpec, uids: &[Uid]) -> Result<Vec<Projection>> {
        let mut state = self.state.lock();
        state.stats.lookups.push((spec.kind, uids.to_vec()));

        let wanted: HashSet<&str> = uids.iter().map(String::as_str).collect();
        let rows = state.tables.get(&spec.kind).map(Vec::as_slice).unwrap_or_default();

        rows.iter()
            .filter(|row| is_live(row))
            .filter(|row| {
                row.get("uid")
                    .and_then(Value::as_str)
                    .is_some_and(|uid| wanted.contains(uid))
            })
            .map(|row| -> Result<Projection> {
                let attributes = spec
                    .projection
                    .iter()
                    .map(|attr| (attr.to_string(), row.get(*attr).cloned().unwrap_or(Value::Null)))
                    .collect();
                Ok(Projection {
                    id: id_of(row).ok_or_else(|| anyhow!("row without id in {}", spec.table))?,
                    uid: row
                        .get("uid")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    attributes,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl BulkWriteStore for MemoryStore {
    async fn execute_upsert(&self, statement: &UpsertStatement) -> Result<Vec<UpsertedRow>> {
        let mut state = self.state.lock();
        if state.fail_writes {
            bail!("simulated write failure on {}", statement.spec.table);
        }
        state.stats.upsert_statements += 1;

        let spec = statement.spec;
        // Work on a copy so a failing statement leaves the table untouched.
        let mut table = state.tables.get(&spec.kind).cloned().unwrap_or_default();
        let mut affected = HashSet::new();
        let mut written = Vec::new();

        for candidate in &statement.rows {
            let key = candidate.natural_key(spec);
            let existing = key.as_ref().and_then(|key| {
                table
                    .iter()
                    .position(|row| spec.natural_key_of(|c| row.get(c)).as_ref() == Some(key))
            });

            match existing {
                None => {
                    let id = state.next_id();
                    let mut row = Row::new();
                    row.insert("id".to_string(), Value::from(id));
                    row.insert("uid".to_string(), Value::String(candidate.uid.clone()));
                    for column in statement.columns() {
                        let value = candidate.values.get(column.column).cloned().unwrap_or(Value::Null);
                        row.insert(column.column.to_string(), value);
                    }
                    row.insert("created_at".to_string(), now());
                    row.insert("updated_at".to_string(), now());
                    row.insert("deleted_at".to_string(), Value::Null);
                    affected.insert(id);
                    table.push(row.clone());
                    written.push((row, true));
                }
                Some(position) => {
                    let row = &mut table[position];
                    if is_live(row) && statement.live_conflict == LiveConflictPolicy::Reject {
                        continue;
                    }
                    let id = id_of(row).unwrap_or_default();
                    if !affected.insert(id) {
                        bail!(
                            "ON CONFLICT DO UPDATE command cannot affect row a second time ({})",
                            spec.table
                        );
                    }
                    for column in statement.update_columns() {
                        let value = candidate.values.get(column.column).cloned().unwrap_or(Value::Null);
                        row.insert(column.column.to_string(), value);
                    }
                    row.insert("deleted_at".to_string(), Value::Null);
                    row.insert("updated_at".to_string(), now());
                    written.push((row.clone(), false));
                }
            }
        }

        state.tables.insert(spec.kind, table);
        Ok(written
            .into_iter()
            .map(|(row, inserted)| UpsertedRow {
                references: state.reference_uids(spec, &row),
                row,
                inserted,
            })
            .collect())
    }

    async fn execute_update(&self, plan: &UpdatePlan) -> Result<Vec<WrittenRow>> {
        let mut state = self.state.lock();
        if state.fail_writes {
            bail!("simulated write failure on {}", plan.spec.table);
        }
        if !plan.is_noop() {
            state.stats.update_statements += 1;
        }

        let targets: HashSet<DbId> = plan.targets.iter().copied().collect();
        let touched: HashSet<DbId> = plan.touched.iter().copied().collect();
        let rows = state.tables.entry(plan.spec.kind).or_default();
        let mut updated = Vec::new();

        for row in rows.iter_mut() {
            let Some(id) = id_of(row) else { continue };
            if !targets.contains(&id) || !is_live(row) {
                continue;
            }
            for assignment in &plan.assignments {
                if let Some((_, value)) = assignment.arms.iter().find(|(arm, _)| *arm == id) {
                    row.insert(assignment.column.column.to_string(), value.clone());
                }
            }
            if touched.contains(&id) {
                row.insert("updated_at".to_string(), now());
            }
            updated.push(row.clone());
        }

        Ok(updated
            .into_iter()
            .map(|row| WrittenRow {
                references: state.reference_uids(plan.spec, &row),
                row,
            })
            .collect())
    }
}

impl Store for MemoryStore {}
