mod data;

use anyhow::{anyhow, Result};
use itertools::Itertools;
use log::{info, warn};
use serde_json::{json, Value};
use std::fmt;

use crate::logic::{BulkOptions, BulkUpsert};
use crate::model::{BatchOutcome, EntityKind, LiveConflictPolicy};
use crate::store::traits::Store;

/// Rows written per kind by [`load_seed_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub written: Vec<(EntityKind, usize)>,
    pub rejected: usize,
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let written = self
            .written
            .iter()
            .format_with(", ", |(kind, count), f| f(&format_args!("{} {}", count, kind)));
        write!(f, "{} ({} rejected)", written, self.rejected)
    }
}

/// Load the demo catalogue through the bulk upsert engine. Entities with a
/// natural key are merged into existing rows, so running it twice keeps one
/// brand per name; shows have no natural key and are added on every run.
pub async fn load_seed_data<S>(store: &S, options: &BulkOptions) -> Result<SeedSummary>
where
    S: Store + ?Sized,
{
    let options = options.clone().with_live_conflict(LiveConflictPolicy::Merge);
    let mut summary = SeedSummary::default();

    let brands = upsert(store, EntityKind::Brand, data::brands(), &options, &mut summary).await?;
    let platforms = upsert(store, EntityKind::Platform, data::platforms(), &options, &mut summary).await?;
    let studios = upsert(store, EntityKind::Studio, data::studios(), &options, &mut summary).await?;
    let users = upsert(store, EntityKind::User, data::users(), &options, &mut summary).await?;

    let acme = uid_at(&brands, 0)?;
    let northwind = uid_at(&brands, 1)?;
    let studio = uid_at(&studios, 0)?;

    let rooms = upsert(store, EntityKind::StudioRoom, data::studio_rooms(studio), &options, &mut summary).await?;
    let materials = upsert(
        store,
        EntityKind::Material,
        data::materials(acme, northwind),
        &options,
        &mut summary,
    )
    .await?;
    let shows = upsert(
        store,
        EntityKind::Show,
        data::shows(acme, northwind, uid_at(&rooms, 0)?),
        &options,
        &mut summary,
    )
    .await?;

    let reviewer = uid_at(&users, 1)?;
    let show_platforms: Vec<Value> = shows
        .records
        .iter()
        .filter_map(|show| show["uid"].as_str())
        .flat_map(|show| {
            platforms
                .records
                .iter()
                .filter_map(|platform| platform["uid"].as_str())
                .map(move |platform| json!({"show": show, "platform": platform, "reviewer": reviewer}))
        })
        .collect();
    upsert(store, EntityKind::ShowPlatform, show_platforms, &options, &mut summary).await?;

    let show_materials: Vec<Value> = shows
        .records
        .iter()
        .zip([vec![0, 1], vec![2]])
        .filter_map(|(show, picks)| Some((show["uid"].as_str()?, picks)))
        .flat_map(|(show, picks)| {
            picks
                .into_iter()
                .filter_map(|i| materials.records.get(i)?["uid"].as_str())
                .map(move |material| json!({"show": show, "material": material}))
                .collect::<Vec<_>>()
        })
        .collect();
    upsert(store, EntityKind::ShowMaterial, show_materials, &options, &mut summary).await?;

    info!("Seed data loaded: {}", summary);
    Ok(summary)
}

async fn upsert<S>(
    store: &S,
    kind: EntityKind,
    records: Vec<Value>,
    options: &BulkOptions,
    summary: &mut SeedSummary,
) -> Result<BatchOutcome>
where
    S: Store + ?Sized,
{
    let outcome = BulkUpsert::run(store, kind, records, options).await?;
    for error in &outcome.errors {
        warn!("Seed {} rejected: {}", kind, error.message);
    }
    summary.written.push((kind, outcome.records.len()));
    summary.rejected += outcome.errors.len();
    Ok(outcome)
}

fn uid_at(outcome: &BatchOutcome, index: usize) -> Result<&str> {
    outcome
        .records
        .get(index)
        .and_then(|record| record["uid"].as_str())
        .ok_or_else(|| anyhow!("seed record {} was not written", index))
}
