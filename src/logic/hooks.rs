use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{EntityKind, Projection, Resolution};

/// What a hook sees for one record that passed resolution.
pub struct HookContext<'a> {
    pub kind: EntityKind,
    /// The record as the caller sent it.
    pub payload: &'a Value,
    /// Column values about to be written, references already substituted.
    /// For patches only the supplied columns are present.
    pub values: &'a BTreeMap<&'static str, Value>,
    /// The row being patched; `None` for upserts.
    pub target: Option<&'a Projection>,
    pub resolution: &'a Resolution,
}

impl HookContext<'_> {
    /// Projection of the row a reference column points at, if it was
    /// resolved in this batch.
    pub fn referenced(&self, column: &str, kind: EntityKind) -> Option<&Projection> {
        let id = self.values.get(column)?.as_i64()?;
        self.resolution.found(kind).find(|projection| projection.id == id)
    }
}

/// Domain check run per record between resolution and the write. An `Err`
/// rejects the record with that message; the batch continues.
pub trait WriteHook: Send + Sync {
    fn check(&self, ctx: &HookContext<'_>) -> Result<(), String>;
}

pub struct AcceptAll;

impl WriteHook for AcceptAll {
    fn check(&self, _ctx: &HookContext<'_>) -> Result<(), String> {
        Ok(())
    }
}

impl<F> WriteHook for F
where
    F: Fn(&HookContext<'_>) -> Result<(), String> + Send + Sync,
{
    fn check(&self, ctx: &HookContext<'_>) -> Result<(), String> {
        self(ctx)
    }
}
