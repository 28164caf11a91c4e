use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{DbId, EntityKind, Uid};

/// External identifiers to resolve, deduplicated and grouped by the kind the
/// caller expects them to be.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceRequest {
    by_kind: BTreeMap<EntityKind, BTreeSet<Uid>>,
}

impl ReferenceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: EntityKind, uid: impl Into<Uid>) {
        self.by_kind.entry(kind).or_default().insert(uid.into());
    }

    pub fn uids(&self, kind: EntityKind) -> Option<&BTreeSet<Uid>> {
        self.by_kind.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.by_kind.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &BTreeSet<Uid>)> {
        self.by_kind.iter().map(|(kind, uids)| (*kind, uids))
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.values().all(BTreeSet::is_empty)
    }
}

impl<U: Into<Uid>> FromIterator<(EntityKind, U)> for ReferenceRequest {
    fn from_iter<I: IntoIterator<Item = (EntityKind, U)>>(iter: I) -> Self {
        let mut request = Self::new();
        for (kind, uid) in iter {
            request.add(kind, uid);
        }
        request
    }
}

/// Minimal view of a live row needed by the write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub id: DbId,
    pub uid: Uid,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Request-scoped resolution map. Built once per batch and dropped with it.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    found: HashMap<EntityKind, HashMap<Uid, Projection>>,
    missing: BTreeMap<EntityKind, BTreeSet<Uid>>,
}

impl Resolution {
    pub fn insert_found(&mut self, kind: EntityKind, projection: Projection) {
        self.found
            .entry(kind)
            .or_default()
            .insert(projection.uid.clone(), projection);
    }

    pub fn insert_missing(&mut self, kind: EntityKind, uid: Uid) {
        self.missing.entry(kind).or_default().insert(uid);
    }

    pub fn get(&self, kind: EntityKind, uid: &str) -> Option<&Projection> {
        self.found.get(&kind).and_then(|by_uid| by_uid.get(uid))
    }

    pub fn id_of(&self, kind: EntityKind, uid: &str) -> Option<DbId> {
        self.get(kind, uid).map(|projection| projection.id)
    }

    pub fn is_missing(&self, kind: EntityKind, uid: &str) -> bool {
        self.missing
            .get(&kind)
            .is_some_and(|uids| uids.contains(uid))
    }

    pub fn found(&self, kind: EntityKind) -> impl Iterator<Item = &Projection> {
        self.found.get(&kind).into_iter().flat_map(|by_uid| by_uid.values())
    }

    pub fn missing_by_kind(&self) -> &BTreeMap<EntityKind, BTreeSet<Uid>> {
        &self.missing
    }

    pub fn found_count(&self) -> usize {
        self.found.values().map(HashMap::len).sum()
    }

    pub fn missing_count(&self) -> usize {
        self.missing.values().map(BTreeSet::len).sum()
    }
}
