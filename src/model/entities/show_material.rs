use crate::model::{ColumnSpec, ColumnType, EntityKind, TableSpec};

pub static SPEC: TableSpec = TableSpec {
    kind: EntityKind::ShowMaterial,
    table: "show_materials",
    columns: &[
        ColumnSpec::reference("show", "show_id", EntityKind::Show)
            .required()
            .immutable(),
        ColumnSpec::reference("material", "material_id", EntityKind::Material)
            .required()
            .immutable(),
        ColumnSpec::own("note", ColumnType::Text),
    ],
    natural_key: &["show_id", "material_id"],
    projection: &[],
};
