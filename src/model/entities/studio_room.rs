use crate::model::{ColumnSpec, ColumnType, DefaultValue, EntityKind, TableSpec};

/// Rooms belong to a studio; `capacity` is projected so booking hooks can
/// read it without a second query.
pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::StudioRoom,
    table: "studio_rooms",
    columns: &[
        ColumnSpec::reference("studio", "studio_id", EntityKind::Studio)
            .required()
            .immutable(),
        ColumnSpec::own("name", ColumnType::Text).required().immutable(),
        ColumnSpec::own("capacity", ColumnType::Integer).with_default(DefaultValue::Int(1)),
    ],
    natural_key: &["studio_id", "name"],
    projection: &["capacity"],
};
