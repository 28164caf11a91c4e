use crate::model::{ColumnSpec, ColumnType, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::User,
    table: "users",
    columns: &[
        ColumnSpec::own("email", ColumnType::Text).required().immutable(),
        ColumnSpec::own("name", ColumnType::Text),
    ],
    natural_key: &["email"],
    projection: &[],
};
