use crate::model::{ColumnSpec, ColumnType, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::Brand,
    table: "brands",
    columns: &[
        ColumnSpec::own("name", ColumnType::Text).required().immutable(),
        ColumnSpec::own("description", ColumnType::Text),
        ColumnSpec::own("metadata", ColumnType::Jsonb),
    ],
    natural_key: &["name"],
    projection: &[],
};
