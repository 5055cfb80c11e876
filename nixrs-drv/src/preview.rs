//! Working out what building a set of derivations would involve.
//!
//! Each requested output ends up in exactly one of three buckets: it already
//! exists locally, it can be fetched from a binary cache, or it needs to be
//! built.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::{StreamExt as _, TryStreamExt as _, stream};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cache::{BatchQuery, BinaryCache, CacheError, NoCache};
use crate::derivation::Derivation;
use crate::derived_path::{DerivationRequest, OutputName, OutputSpec};
use crate::local::LocalStore;
use crate::store::DerivationStore;
use crate::store_path::StorePath;
use crate::{Error, Result};

pub type OutputsByDerivation = BTreeMap<StorePath, BTreeSet<OutputName>>;

/// A cache probe that failed. The output it was about stays needed.
#[derive(Debug, Error)]
#[error("could not ask binary cache about '{path}': {error}")]
pub struct ProbeError {
    pub path: StorePath,
    #[source]
    pub error: CacheError,
}

#[derive(Debug, Default, Serialize)]
pub struct PreviewResult {
    pub needed: OutputsByDerivation,
    pub existing: OutputsByDerivation,
    pub fetchable: OutputsByDerivation,
    #[serde(skip)]
    pub probe_errors: Vec<ProbeError>,
}

impl PreviewResult {
    pub fn is_empty(&self) -> bool {
        self.needed.is_empty() && self.existing.is_empty() && self.fetchable.is_empty()
    }
}

fn insert(map: &mut OutputsByDerivation, drv_path: &StorePath, output: OutputName) {
    map.entry(drv_path.clone()).or_default().insert(output);
}

fn remove(map: &mut OutputsByDerivation, drv_path: &StorePath, output: &OutputName) -> bool {
    let Some(outputs) = map.get_mut(drv_path) else {
        return false;
    };
    let removed = outputs.remove(output);
    if outputs.is_empty() {
        map.remove(drv_path);
    }
    removed
}

/// Sorts requested derivation outputs into existing, fetchable and needed.
///
/// Nothing is built, fetched or otherwise changed.
pub struct Classifier<'s, L, C = NoCache> {
    store: &'s DerivationStore,
    local: L,
    cache: Option<C>,
}

impl<'s, L> Classifier<'s, L, NoCache> {
    pub fn new(store: &'s DerivationStore, local: L) -> Classifier<'s, L, NoCache> {
        Classifier {
            store,
            local,
            cache: None,
        }
    }
}

impl<'s, L, C> Classifier<'s, L, C> {
    /// Use `cache` to find outputs that can be fetched instead of built.
    pub fn with_cache<C2>(self, cache: Option<C2>) -> Classifier<'s, L, C2> {
        Classifier {
            store: self.store,
            local: self.local,
            cache,
        }
    }
}

impl<L, C> Classifier<'_, L, C>
where
    L: LocalStore + Sync,
    C: BinaryCache + Sync,
{
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn classify(&self, requests: &[DerivationRequest]) -> Result<PreviewResult> {
        let requested = self.requested_outputs(requests).await?;
        let limit = self.store.max_concurrency();

        let mut candidates = Vec::new();
        for (drv, outputs) in requested.values() {
            for output in outputs {
                let path = drv.output_path(output).ok_or_else(|| Error::MissingOutput {
                    drv_path: drv.path.clone(),
                    output: output.clone(),
                })?;
                candidates.push((drv.path.clone(), output.clone(), path.clone()));
            }
        }

        let present: Vec<bool> = stream::iter(&candidates)
            .map(|(_, _, path)| self.local.is_valid_path(path))
            .buffered(limit)
            .try_collect()
            .await?;

        let mut result = PreviewResult::default();
        let mut needed_paths: BTreeMap<StorePath, Vec<(StorePath, OutputName)>> = BTreeMap::new();
        for ((drv_path, output, path), present) in candidates.into_iter().zip(present) {
            if present {
                insert(&mut result.existing, &drv_path, output);
            } else {
                insert(&mut result.needed, &drv_path, output.clone());
                needed_paths.entry(path).or_default().push((drv_path, output));
            }
        }

        if let Some(cache) = &self.cache {
            if !needed_paths.is_empty() {
                let found = self.query_cache(cache, &needed_paths, &mut result).await?;
                for path in found {
                    for (drv_path, output) in needed_paths.get(&path).into_iter().flatten() {
                        if remove(&mut result.needed, drv_path, output) {
                            insert(&mut result.fetchable, drv_path, output.clone());
                        }
                    }
                }
            }
        }

        info!(
            needed = result.needed.values().map(BTreeSet::len).sum::<usize>(),
            fetchable = result.fetchable.values().map(BTreeSet::len).sum::<usize>(),
            existing = result.existing.values().map(BTreeSet::len).sum::<usize>(),
            "classified derivation outputs"
        );
        Ok(result)
    }

    /// Load every requested derivation and merge requests for the same one.
    async fn requested_outputs(
        &self,
        requests: &[DerivationRequest],
    ) -> Result<BTreeMap<StorePath, (Arc<Derivation>, BTreeSet<OutputName>)>> {
        let drvs = self
            .store
            .load_many(requests.iter().map(|req| &req.drv_path))
            .await?;
        let mut requested = BTreeMap::new();
        for (drv, request) in drvs.into_iter().zip(requests) {
            let outputs = match &request.outputs {
                OutputSpec::All => drv.output_names(),
                OutputSpec::Named(names) => names.clone(),
            };
            let (_, all) = requested
                .entry(drv.path.clone())
                .or_insert_with(|| (drv.clone(), BTreeSet::new()));
            all.extend(outputs);
        }
        Ok(requested)
    }

    /// Paths among `needed` that the cache reports as present.
    async fn query_cache(
        &self,
        cache: &C,
        needed: &BTreeMap<StorePath, Vec<(StorePath, OutputName)>>,
        result: &mut PreviewResult,
    ) -> Result<Vec<StorePath>> {
        let paths: Vec<StorePath> = needed.keys().cloned().collect();
        match cache.query_paths(&paths).await? {
            BatchQuery::Supported(answers) => Ok(answers
                .into_iter()
                .filter(|(path, present)| *present && needed.contains_key(path))
                .map(|(path, _)| path)
                .collect()),
            BatchQuery::Unsupported => {
                debug!(paths = paths.len(), "probing binary cache path by path");
                let probes: Vec<(StorePath, Result<bool, CacheError>)> = stream::iter(paths)
                    .map(|path| async move {
                        let probe = cache.probe(&path).await;
                        (path, probe)
                    })
                    .buffer_unordered(self.store.max_concurrency())
                    .collect()
                    .await;
                let mut found = Vec::new();
                for (path, probe) in probes {
                    match probe {
                        Ok(true) => found.push(path),
                        Ok(false) => {}
                        Err(error) => {
                            warn!(%path, %error, "binary cache probe failed");
                            result.probe_errors.push(ProbeError { path, error });
                        }
                    }
                }
                Ok(found)
            }
        }
    }
}
