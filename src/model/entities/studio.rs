use crate::model::{ColumnSpec, ColumnType, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::Studio,
    table: "studios",
    columns: &[
        ColumnSpec::own("name", ColumnType::Text).required().immutable(),
        ColumnSpec::own("address", ColumnType::Text),
    ],
    natural_key: &["name"],
    projection: &[],
};
