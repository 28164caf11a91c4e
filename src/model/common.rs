use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Externally visible identifier: `<prefix>_<suffix>`.
pub type Uid = String;

/// Internal surrogate key. Never leaves the engine.
pub type DbId = i64;

const BASE62: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Brand,
    Platform,
    Studio,
    StudioRoom,
    User,
    Show,
    Material,
    ShowPlatform,
    ShowMaterial,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Brand,
        EntityKind::Platform,
        EntityKind::Studio,
        EntityKind::StudioRoom,
        EntityKind::User,
        EntityKind::Show,
        EntityKind::Material,
        EntityKind::ShowPlatform,
        EntityKind::ShowMaterial,
    ];

    /// Prefix used in external identifiers; also the name used in messages.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Brand => "brand",
            EntityKind::Platform => "platform",
            EntityKind::Studio => "studio",
            EntityKind::StudioRoom => "studio_room",
            EntityKind::User => "user",
            EntityKind::Show => "show",
            EntityKind::Material => "material",
            EntityKind::ShowPlatform => "show_platform",
            EntityKind::ShowMaterial => "show_material",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UidError {
    #[error("malformed identifier '{0}'")]
    Malformed(String),
    #[error("unknown identifier prefix in '{0}'")]
    UnknownPrefix(String),
}

pub fn encode_uid(kind: EntityKind, suffix: &str) -> Uid {
    format!("{}_{}", kind.prefix(), suffix)
}

/// Split an external identifier into its kind and random suffix.
///
/// The suffix is alphanumeric, so the last `_` always separates it from the
/// prefix even when the prefix itself contains underscores.
pub fn parse_uid(uid: &str) -> Result<(EntityKind, &str), UidError> {
    let (prefix, suffix) = uid
        .rsplit_once('_')
        .ok_or_else(|| UidError::Malformed(uid.to_string()))?;

    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(UidError::Malformed(uid.to_string()));
    }

    let kind =
        EntityKind::from_prefix(prefix).ok_or_else(|| UidError::UnknownPrefix(uid.to_string()))?;
    Ok((kind, suffix))
}

pub fn kind_of(uid: &str) -> Option<EntityKind> {
    parse_uid(uid).ok().map(|(kind, _)| kind)
}

/// Fresh identifier for `kind` with a base62-encoded random UUIDv4 suffix.
pub fn generate_uid(kind: EntityKind) -> Uid {
    encode_uid(kind, &base62(Uuid::new_v4().as_u128()))
}

fn base62(mut value: u128) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(22);
    while value > 0 {
        digits.push(BASE62[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}
