use anyhow::Result;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;

use crate::logic::aggregate::ResponseAggregator;
use crate::logic::case_set::CaseSetBuilder;
use crate::logic::hooks::HookContext;
use crate::logic::options::{within, BulkOptions};
use crate::logic::record::{ParsedRecord, RecordMode};
use crate::logic::resolver::ReferenceResolver;
use crate::model::{spec, BatchOutcome, DbId, EntityKind, RecordError, ReferenceRequest, WrittenRow};
use crate::store::traits::Store;

/// Sparse updates of many live rows, each carrying its own values, applied
/// with a single statement.
pub struct BulkPatch;

impl BulkPatch {
    /// Every record names its target by `uid` and supplies only the fields
    /// it changes. Targets and new references are resolved together; rows
    /// that are missing or soft-deleted are reported per record.
    pub async fn run<S>(
        store: &S,
        kind: EntityKind,
        records: Vec<Value>,
        options: &BulkOptions,
    ) -> Result<BatchOutcome>
    where
        S: Store + ?Sized,
    {
        let table = spec(kind);
        let total = records.len();
        let mut errors: Vec<(usize, RecordError)> = Vec::new();
        let mut parsed = Vec::with_capacity(total);

        for (index, payload) in records.into_iter().enumerate() {
            match ParsedRecord::parse(table, index, payload, RecordMode::Patch) {
                Ok(record) => parsed.push(record),
                Err(error) => errors.push((index, error)),
            }
        }

        let mut request = ReferenceRequest::new();
        for record in &parsed {
            if let Some(target) = &record.target {
                request.add(kind, target.clone());
            }
            record.collect_references(&mut request);
        }
        let resolution = within(
            options.deadline,
            "reference resolution",
            ReferenceResolver::resolve(store, &request),
        )
        .await?;

        let hook = options.hook();
        let mut builder = CaseSetBuilder::new(table);
        let mut pending: HashMap<DbId, (usize, Value)> = HashMap::with_capacity(parsed.len());

        for mut record in parsed {
            let Some(target) = record
                .target
                .as_deref()
                .and_then(|uid| resolution.get(kind, uid))
            else {
                errors.push(record.reject(format!("{} not found", kind)));
                continue;
            };
            if pending.contains_key(&target.id) {
                errors.push(record.reject(format!("duplicate {} in batch", kind)));
                continue;
            }
            if let Err(missing) = record.substitute_references(&resolution) {
                errors.push(record.reject(format!("{} not found", missing)));
                continue;
            }

            let checked = hook.check(&HookContext {
                kind,
                payload: &record.payload,
                values: &record.values,
                target: Some(target),
                resolution: &resolution,
            });
            if let Err(message) = checked {
                errors.push(record.reject(message));
                continue;
            }

            builder.set_row(target.id, &record.values);
            pending.insert(target.id, (record.index, record.payload));
        }

        if builder.is_empty() {
            debug!("Patch of {}: nothing to write", table.table);
            return Ok(ResponseAggregator::finish(table, errors, Vec::new()));
        }

        let plan = builder.build();
        debug!(
            "Patch of {}: {} targets, {} changed, {} columns",
            table.table,
            plan.targets.len(),
            plan.touched.len(),
            plan.assignments.len()
        );
        let updated = within(options.deadline, "update", store.execute_update(&plan)).await?;

        let mut by_id: HashMap<DbId, WrittenRow> = updated
            .into_iter()
            .filter_map(|written| Some((written.row.get("id")?.as_i64()?, written)))
            .collect();

        let mut written = Vec::with_capacity(pending.len());
        for (id, (index, payload)) in pending {
            match by_id.remove(&id) {
                Some(row) => written.push((index, row)),
                // Deleted between resolution and the write.
                None => errors.push((index, RecordError::new(format!("{} not found", kind), payload))),
            }
        }

        info!(
            "Patch of {}: {} of {} records written, {} rejected",
            table.table,
            written.len(),
            total,
            errors.len()
        );

        Ok(ResponseAggregator::finish(table, errors, written))
    }
}
