use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{ColumnSpec, EntityKind, RecordError, ReferenceRequest, Resolution, TableSpec, Uid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Full record: every required field must be present, the rest default.
    Insert,
    /// Sparse record naming its target by `uid`.
    Patch,
}

/// A record that passed local validation. References are still external
/// identifiers at this point.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub index: usize,
    pub payload: Value,
    pub target: Option<Uid>,
    pub values: BTreeMap<&'static str, Value>,
    /// Supplied reference fields; `None` clears an optional reference.
    pub references: Vec<(&'static ColumnSpec, Option<Uid>)>,
}

impl ParsedRecord {
    pub fn parse(
        spec: &'static TableSpec,
        index: usize,
        payload: Value,
        mode: RecordMode,
    ) -> Result<Self, RecordError> {
        let reject = |message: String, payload: Value| Err(RecordError::new(message, payload));

        let Value::Object(fields) = &payload else {
            return reject("record must be a JSON object".to_string(), payload);
        };

        let target = match mode {
            RecordMode::Insert => None,
            RecordMode::Patch => match fields.get("uid").and_then(Value::as_str) {
                Some(uid) => Some(uid.to_string()),
                None => return reject("uid is required".to_string(), payload),
            },
        };

        for (field, _) in fields.iter() {
            if mode == RecordMode::Patch && field == "uid" {
                continue;
            }
            match spec.column_for_field(field) {
                None => return reject(format!("unknown field '{}'", field), payload),
                Some(column) if mode == RecordMode::Patch && !column.mutable => {
                    return reject(format!("field '{}' cannot be changed", field), payload)
                }
                Some(_) => {}
            }
        }

        let mut values = BTreeMap::new();
        let mut references = Vec::new();

        for column in spec.columns {
            let supplied = fields.get(column.field);

            let value = match supplied {
                None if mode == RecordMode::Patch => continue,
                None | Some(Value::Null) if column.required => {
                    return reject(format!("{} is required", column.field), payload)
                }
                None => {
                    if column.reference.is_some() {
                        references.push((column, None));
                    } else {
                        values.insert(column.column, column.default.to_json());
                    }
                    continue;
                }
                Some(value) => value,
            };

            if column.reference.is_some() {
                match value {
                    Value::Null => references.push((column, None)),
                    Value::String(uid) => references.push((column, Some(uid.clone()))),
                    _ => return reject(format!("invalid value for '{}'", column.field), payload),
                }
            } else if value.is_null() {
                values.insert(column.column, Value::Null);
            } else {
                match column.ty.coerce(value) {
                    Some(coerced) => {
                        values.insert(column.column, coerced);
                    }
                    None => return reject(format!("invalid value for '{}'", column.field), payload),
                }
            }
        }

        Ok(Self {
            index,
            payload,
            target,
            values,
            references,
        })
    }

    /// Add this record's identifiers to a batch-wide request.
    pub fn collect_references(&self, request: &mut ReferenceRequest) {
        for (column, uid) in &self.references {
            if let (Some(kind), Some(uid)) = (column.reference, uid) {
                request.add(kind, uid.clone());
            }
        }
    }

    /// Swap every reference for its surrogate key. On failure reports the
    /// kind of the first reference that did not resolve; the record must
    /// then be left out entirely.
    pub fn substitute_references(&mut self, resolution: &Resolution) -> Result<(), EntityKind> {
        for (column, uid) in &self.references {
            let Some(kind) = column.reference else { continue };
            let value = match uid {
                None => Value::Null,
                Some(uid) => Value::from(resolution.id_of(kind, uid).ok_or(kind)?),
            };
            self.values.insert(column.column, value);
        }
        Ok(())
    }

    pub fn reject(self, message: impl Into<String>) -> (usize, RecordError) {
        (self.index, RecordError::new(message, self.payload))
    }
}
