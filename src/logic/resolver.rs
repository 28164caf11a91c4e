use anyhow::Result;
use futures::future::try_join_all;
use log::debug;
use std::collections::HashSet;

use crate::model::{kind_of, spec, ReferenceRequest, Resolution, Uid};
use crate::store::traits::ReferenceStore;

/// Translates external identifiers into live rows.
pub struct ReferenceResolver;

impl ReferenceResolver {
    /// Resolve every identifier in `request`.
    ///
    /// Identifiers whose prefix does not name the requested kind are marked
    /// missing without touching the store. The rest cost one set-membership
    /// query per kind, and the per-kind queries run concurrently. Only live
    /// rows count as found.
    pub async fn resolve<S>(store: &S, request: &ReferenceRequest) -> Result<Resolution>
    where
        S: ReferenceStore + ?Sized,
    {
        let mut resolution = Resolution::default();
        let mut queries: Vec<(_, Vec<Uid>)> = Vec::new();

        for (kind, uids) in request.iter() {
            let (wellformed, malformed): (Vec<Uid>, Vec<Uid>) =
                uids.iter().cloned().partition(|uid| kind_of(uid) == Some(kind));

            for uid in malformed {
                resolution.insert_missing(kind, uid);
            }
            if !wellformed.is_empty() {
                queries.push((kind, wellformed));
            }
        }

        if queries.is_empty() {
            return Ok(resolution);
        }

        debug!(
            "Resolving {} identifiers across {} kinds",
            queries.iter().map(|(_, uids)| uids.len()).sum::<usize>(),
            queries.len()
        );

        let fetched = try_join_all(
            queries
                .iter()
                .map(|(kind, uids)| store.fetch_live(spec(*kind), uids)),
        )
        .await?;

        for ((kind, requested), rows) in queries.into_iter().zip(fetched) {
            let mut found = HashSet::with_capacity(rows.len());
            for projection in rows {
                found.insert(projection.uid.clone());
                resolution.insert_found(kind, projection);
            }
            for uid in requested {
                if !found.contains(&uid) {
                    resolution.insert_missing(kind, uid);
                }
            }
        }

        debug!(
            "Resolved {} identifiers, {} missing",
            resolution.found_count(),
            resolution.missing_count()
        );

        Ok(resolution)
    }
}
