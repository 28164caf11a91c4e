use crate::model::{ColumnSpec, ColumnType, DefaultValue, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::ShowPlatform,
    table: "show_platforms",
    columns: &[
        ColumnSpec::reference("show", "show_id", EntityKind::Show)
            .required()
            .immutable(),
        ColumnSpec::reference("platform", "platform_id", EntityKind::Platform)
            .required()
            .immutable(),
        ColumnSpec::reference("reviewer", "reviewer_id", EntityKind::User),
        ColumnSpec::own("live_url", ColumnType::Text),
        ColumnSpec::own("status", ColumnType::Text).with_default(DefaultValue::Text("pending")),
        ColumnSpec::own("viewer_count", ColumnType::BigInt),
    ],
    natural_key: &["show_id", "platform_id"],
    projection: &[],
};
