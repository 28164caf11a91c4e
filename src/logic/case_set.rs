use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{ColumnSpec, ConditionalAssignment, DbId, TableSpec, UpdatePlan};

/// Accumulates `(row, column, value)` triples for one table and folds them
/// into a single [`UpdatePlan`]: one conditional assignment per column that
/// at least one row supplied.
#[derive(Debug)]
pub struct CaseSetBuilder {
    spec: &'static TableSpec,
    arms: HashMap<&'static str, Vec<(DbId, Value)>>,
    touched: BTreeSet<DbId>,
    targets: BTreeSet<DbId>,
}

impl CaseSetBuilder {
    pub fn new(spec: &'static TableSpec) -> Self {
        Self {
            spec,
            arms: HashMap::new(),
            touched: BTreeSet::new(),
            targets: BTreeSet::new(),
        }
    }

    /// Scope the statement to `id` without changing anything on it.
    pub fn target(&mut self, id: DbId) -> &mut Self {
        self.targets.insert(id);
        self
    }

    pub fn set(&mut self, id: DbId, column: &'static ColumnSpec, value: Value) -> &mut Self {
        self.targets.insert(id);
        self.touched.insert(id);
        self.arms.entry(column.column).or_default().push((id, value));
        self
    }

    /// Target `id` and set every supplied column. Names that are not
    /// columns of this table are ignored.
    pub fn set_row(&mut self, id: DbId, values: &BTreeMap<&'static str, Value>) -> &mut Self {
        self.target(id);
        for (name, value) in values {
            if let Some(column) = self.spec.column(name) {
                self.set(id, column, value.clone());
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn build(mut self) -> UpdatePlan {
        let assignments = self
            .spec
            .columns
            .iter()
            .filter_map(|column| {
                let arms = self.arms.remove(column.column)?;
                Some(ConditionalAssignment { column, arms })
            })
            .collect();

        UpdatePlan {
            spec: self.spec,
            assignments,
            touched: self.touched.into_iter().collect(),
            targets: self.targets.into_iter().collect(),
        }
    }
}
