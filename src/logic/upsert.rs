use anyhow::Result;
use log::{debug, info};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::logic::aggregate::ResponseAggregator;
use crate::logic::hooks::HookContext;
use crate::logic::options::{within, BulkOptions};
use crate::logic::record::{ParsedRecord, RecordMode};
use crate::logic::resolver::ReferenceResolver;
use crate::model::{
    generate_uid, spec, BatchOutcome, CandidateRow, EntityKind, RecordError, ReferenceRequest,
    UpsertStatement, WrittenRow,
};
use crate::store::traits::Store;

/// Bulk insert-or-resurrect of records whose references are external
/// identifiers.
pub struct BulkUpsert;

impl BulkUpsert {
    /// Resolve every reference in the batch at once, drop records that fail
    /// validation or resolution, and write the rest with one statement.
    ///
    /// Invalid records never abort the batch; they come back in
    /// `errors` with their original payload. Store failures are fatal and
    /// nothing from the batch is returned.
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
            match ParsedRecord::parse(table, index, payload, RecordMode::Insert) {
                Ok(record) => parsed.push(record),
                Err(error) => errors.push((index, error)),
            }
        }

        let mut request = ReferenceRequest::new();
        for record in &parsed {
            record.collect_references(&mut request);
        }
        let resolution = within(
            options.deadline,
            "reference resolution",
            ReferenceResolver::resolve(store, &request),
        )
        .await?;

        let hook = options.hook();
        let mut seen_keys = HashSet::new();
        let mut candidates = Vec::with_capacity(parsed.len());
        let mut payloads: HashMap<usize, Value> = HashMap::with_capacity(parsed.len());

        for mut record in parsed {
            if let Err(missing) = record.substitute_references(&resolution) {
                errors.push(record.reject(format!("{} not found", missing)));
                continue;
            }

            let checked = hook.check(&HookContext {
                kind,
                payload: &record.payload,
                values: &record.values,
                target: None,
                resolution: &resolution,
            });
            if let Err(message) = checked {
                errors.push(record.reject(message));
                continue;
            }

            let candidate = CandidateRow {
                index: record.index,
                uid: generate_uid(kind),
                values: record.values,
            };
            if let Some(key) = candidate.natural_key(table) {
                if !seen_keys.insert(key) {
                    errors.push((
                        record.index,
                        RecordError::new(format!("duplicate {} in batch", kind), record.payload),
                    ));
                    continue;
                }
            }

            payloads.insert(record.index, record.payload);
            candidates.push(candidate);
        }

        debug!(
            "Upsert into {}: {} of {} records survive validation",
            table.table,
            candidates.len(),
            total
        );

        if candidates.is_empty() {
            return Ok(ResponseAggregator::finish(table, errors, Vec::new()));
        }

        let statement = UpsertStatement {
            spec: table,
            rows: candidates,
            live_conflict: options.live_conflict,
        };
        let upserted = within(options.deadline, "upsert", store.execute_upsert(&statement)).await?;

        let resurrected = upserted.iter().filter(|row| !row.inserted).count();
        let mut by_key: HashMap<String, WrittenRow> = HashMap::with_capacity(upserted.len());
        for upserted_row in upserted {
            let key = table
                .natural_key_of(|column| upserted_row.row.get(column))
                .or_else(|| upserted_row.row.get("uid").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_default();
            by_key.insert(key, upserted_row.into());
        }

        let mut written = Vec::with_capacity(statement.rows.len());
        for candidate in statement.rows {
            let key = candidate.natural_key(table).unwrap_or(candidate.uid);
            let payload = payloads.remove(&candidate.index).unwrap_or(Value::Null);
            match by_key.remove(&key) {
                Some(row) => written.push((candidate.index, row)),
                // Skipped by the store: the natural key belongs to a live row.
                None => errors.push((
                    candidate.index,
                    RecordError::new(format!("{} already exists", kind), payload),
                )),
            }
        }

        info!(
            "Upsert into {}: {} written ({} taken over), {} rejected",
            table.table,
            written.len(),
            resurrected,
            errors.len()
        );

        Ok(ResponseAggregator::finish(table, errors, written))
    }
}
