use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::EntityKind;

/// Storage type of a writable column. Values travel to the store as text and
/// are cast back with this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    BigInt,
    Integer,
    Boolean,
    Timestamptz,
    Jsonb,
}

impl ColumnType {
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::BigInt => "bigint",
            ColumnType::Integer => "integer",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamptz => "timestamptz",
            ColumnType::Jsonb => "jsonb",
        }
    }

    /// Check a non-null request value against this type and return its
    /// canonical form. Timestamps are normalized to UTC RFC 3339.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ColumnType::Text, Value::String(_)) => Some(value.clone()),
            (ColumnType::BigInt, Value::Number(n)) => n.as_i64().map(Value::from),
            (ColumnType::Integer, Value::Number(n)) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::from),
            (ColumnType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ColumnType::Timestamptz, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| Value::String(ts.with_timezone(&Utc).to_rfc3339())),
            (ColumnType::Jsonb, _) => Some(value.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Null,
    Text(&'static str),
    Int(i64),
    Bool(bool),
}

impl DefaultValue {
    pub fn to_json(self) -> Value {
        match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Text(s) => Value::String(s.to_string()),
            DefaultValue::Int(i) => Value::from(i),
            DefaultValue::Bool(b) => Value::Bool(b),
        }
    }
}

/// One writable column. `field` is the request-facing name; for reference
/// columns it differs from `column`, which holds the surrogate key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub column: &'static str,
    pub ty: ColumnType,
    pub reference: Option<EntityKind>,
    pub required: bool,
    pub mutable: bool,
    pub default: DefaultValue,
}

impl ColumnSpec {
    pub const fn own(name: &'static str, ty: ColumnType) -> Self {
        Self {
            field: name,
            column: name,
            ty,
            reference: None,
            required: false,
            mutable: true,
            default: DefaultValue::Null,
        }
    }

    pub const fn reference(field: &'static str, column: &'static str, kind: EntityKind) -> Self {
        Self {
            field,
            column,
            ty: ColumnType::BigInt,
            reference: Some(kind),
            required: false,
            mutable: true,
            default: DefaultValue::Null,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn immutable(self) -> Self {
        Self {
            mutable: false,
            ..self
        }
    }

    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self { default, ..self }
    }
}

/// Static description of one entity table: where it lives, what can be
/// written, which columns form its natural key, and which extra attributes a
/// resolution projection carries.
#[derive(Debug, PartialEq)]
pub struct TableSpec {
    pub kind: EntityKind,
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Column names; empty means rows are always inserted.
    pub natural_key: &'static [&'static str],
    pub projection: &'static [&'static str],
}

impl TableSpec {
    pub fn prefix(&self) -> &'static str {
        self.kind.prefix()
    }

    pub fn column_for_field(&self, field: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn column(&self, column: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn reference_columns(&self) -> impl Iterator<Item = &'static ColumnSpec> {
        self.columns.iter().filter(|c| c.reference.is_some())
    }

    pub fn is_natural_key(&self, column: &str) -> bool {
        self.natural_key.iter().any(|key| *key == column)
    }

    /// Canonical string for the natural key of a row (or candidate) keyed by
    /// column name. `None` when the table has no natural key.
    pub fn natural_key_of<'a, F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        if self.natural_key.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .natural_key
            .iter()
            .map(|column| lookup(column).map(Value::to_string).unwrap_or_default())
            .collect();
        Some(parts.join("\u{1f}"))
    }
}
