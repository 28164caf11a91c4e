use crate::model::{ColumnSpec, ColumnType, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::Material,
    table: "materials",
    columns: &[
        ColumnSpec::reference("brand", "brand_id", EntityKind::Brand)
            .required()
            .immutable(),
        ColumnSpec::own("name", ColumnType::Text).required().immutable(),
        ColumnSpec::own("material_type", ColumnType::Text),
        ColumnSpec::own("url", ColumnType::Text),
    ],
    natural_key: &["brand_id", "name"],
    projection: &[],
};
