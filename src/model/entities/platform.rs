use crate::model::{ColumnSpec, ColumnType, DefaultValue, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::Platform,
    table: "platforms",
    columns: &[
        ColumnSpec::own("name", ColumnType::Text).required().immutable(),
        ColumnSpec::own("url", ColumnType::Text),
        ColumnSpec::own("is_active", ColumnType::Boolean).with_default(DefaultValue::Bool(true)),
    ],
    natural_key: &["name"],
    projection: &[],
};
