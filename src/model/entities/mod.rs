//! Registry of entity kinds. Each kind keeps its table shape in its own
//! module; lookups go through [`spec`].

pub mod brand;
pub mod material;
pub mod platform;
pub mod show;
pub mod show_material;
pub mod show_platform;
pub mod studio;
pub mod studio_room;
pub mod user;

use crate::model::{EntityKind, TableSpec};

pub fn spec(kind: EntityKind) -> &'static TableSpec {
    match kind {
        EntityKind::Brand => &brand::SPEC,
        EntityKind::Platform => &platform::SPEC,
        EntityKind::Studio => &studio::SPEC,
        EntityKind::StudioRoom => &studio_room::SPEC,
        EntityKind::User => &user::SPEC,
        EntityKind::Show => &show::SPEC,
        EntityKind::Material => &material::SPEC,
        EntityKind::ShowPlatform => &show_platform::SPEC,
        EntityKind::ShowMaterial => &show_material::SPEC,
    }
}
