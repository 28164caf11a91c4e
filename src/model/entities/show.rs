use crate::model::{ColumnSpec, ColumnType, DefaultValue, EntityKind, TableSpec};

/// Shows have no natural key; every upserted show is a fresh row. Start and
/// end times are projected for duration checks on dependent records.
pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::Show,
    table: "shows",
    columns: &[
        ColumnSpec::reference("brand", "brand_id", EntityKind::Brand).required(),
        ColumnSpec::reference("studio_room", "studio_room_id", EntityKind::StudioRoom),
        ColumnSpec::own("name", ColumnType::Text).required(),
        ColumnSpec::own("start_time", ColumnType::Timestamptz),
        ColumnSpec::own("end_time", ColumnType::Timestamptz),
        ColumnSpec::own("status", ColumnType::Text).with_default(DefaultValue::Text("draft")),
    ],
    natural_key: &[],
    projection: &["start_time", "end_time"],
};
