use log::warn;
use serde_json::Value;

use crate::model::{BatchOutcome, RecordError, ReferenceUids, Row, TableSpec, WrittenRow};

const TIMESTAMP_COLUMNS: [&str; 3] = ["created_at", "updated_at", "deleted_at"];

/// Merges per-record errors with written rows and puts external identifiers
/// back in place of surrogate keys.
///
/// Reference identifiers come back from the write itself, so assembling the
/// response never touches the store and cannot fail once the batch has
/// committed.
pub struct ResponseAggregator;

impl ResponseAggregator {
    /// Both lists are keyed by the record's position in the input; the
    /// outcome lists them in input order.
    pub fn finish(
        table: &'static TableSpec,
        mut errors: Vec<(usize, RecordError)>,
        mut written: Vec<(usize, WrittenRow)>,
    ) -> BatchOutcome {
        errors.sort_by_key(|(index, _)| *index);
        written.sort_by_key(|(index, _)| *index);

        BatchOutcome {
            errors: errors.into_iter().map(|(_, error)| error).collect(),
            records: written
                .into_iter()
                .map(|(_, written)| Self::present(table, written.row, &written.references))
                .collect(),
        }
    }

    /// Caller-facing shape of a stored row: `uid`, request-facing fields,
    /// and timestamps. Surrogate keys never appear.
    pub fn present(table: &TableSpec, mut row: Row, references: &ReferenceUids) -> Value {
        let mut out = serde_json::Map::new();
        out.insert("uid".to_string(), row.remove("uid").unwrap_or(Value::Null));

        for column in table.columns {
            let value = row.remove(column.column).unwrap_or(Value::Null);
            let value = match (column.reference, value.as_i64()) {
                (Some(kind), Some(id)) => match references.get(column.column) {
                    Some(uid) => Value::String(uid.clone()),
                    None => {
                        warn!("No identifier for {} {} referenced from {}", kind, id, table.table);
                        Value::Null
                    }
                },
                (Some(_), None) => Value::Null,
                (None, _) => value,
            };
            out.insert(column.field.to_string(), value);
        }

        for column in TIMESTAMP_COLUMNS {
            out.insert(column.to_string(), row.remove(column).unwrap_or(Value::Null));
        }

        Value::Object(out)
    }
}
