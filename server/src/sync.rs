//! Remote-to-local model synchronization.

use std::{collections::HashSet, fmt, io, sync::Arc, time::Duration};

use log::{debug, info, warn};
use rayon::prelude::*;
use tokio::time::{MissedTickBehavior, interval};

use predictor::{ArtifactIdentity, load_predictor};
use store::ArtifactStore;

use crate::{
    cache::CacheDir,
    error::SyncErr,
    index::{IndexHandle, ModelIndex},
};

/// What one synchronization cycle did with one remote identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Loaded,
    SkippedIncomplete,
    Failed(String),
}

/// The per-identity outcomes of one synchronization cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<(ArtifactIdentity, SyncOutcome)>,
}

impl SyncReport {
    fn count(&self, matching: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matching(outcome))
            .count()
    }

    pub fn loaded(&self) -> usize {
        self.count(|o| *o == SyncOutcome::Loaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| *o == SyncOutcome::SkippedIncomplete)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Failed(_)))
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} loaded, {} skipped, {} failed",
            self.loaded(),
            self.skipped(),
            self.failed()
        )
    }
}

/// Keeps the local cache and the served index following the remote store.
#[derive(Debug)]
pub struct ModelSynchronizer<S> {
    store: S,
    cache: CacheDir,
}

impl<S: ArtifactStore> ModelSynchronizer<S> {
    pub fn new(store: S, cache: CacheDir) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether the remote store holds any identity the cache is missing.
    ///
    /// A pure read; nothing is downloaded.
    pub async fn check_update(&self) -> Result<bool, SyncErr> {
        let remote = self.store.inventory().await?;
        let local = self.cache.inventory()?;

        Ok(remote.iter().any(|identity| !local.contains(identity)))
    }

    /// Runs one full synchronization cycle.
    ///
    /// Missing artifacts are downloaded into the cache (incomplete remote
    /// rows are skipped and retried on a later cycle), superseded local
    /// versions are removed, and a predictor is built for every ready
    /// identity. Per-identity failures, fetch and cache ones included,
    /// never abort the batch; they are collected into the returned
    /// report. Only an unreadable inventory fails the cycle itself.
    ///
    /// # Returns
    /// The freshly built index together with the per-identity outcomes.
    pub async fn load(&self) -> Result<(ModelIndex, SyncReport), SyncErr> {
        let remote = self.store.inventory().await?;
        let local = self.cache.inventory()?;

        let mut report = SyncReport::default();
        let mut ready = Vec::with_capacity(remote.len());

        for identity in remote {
            if !local.contains(&identity) {
                let row = match self.store.fetch(identity.gid, &identity.model).await {
                    Ok(row) => row,
                    Err(e) => {
                        warn!("failed to fetch artifact {identity}: {e}");
                        report
                            .outcomes
                            .push((identity, SyncOutcome::Failed(e.to_string())));
                        continue;
                    }
                };

                let Some((params, entity2id, relation2id)) = row.complete() else {
                    warn!("skipping incomplete artifact {identity}");
                    report.outcomes.push((identity, SyncOutcome::SkippedIncomplete));
                    continue;
                };

                if let Err(e) =
                    self.replace_cached(&local, &identity, params, entity2id, relation2id)
                {
                    warn!("failed to materialize artifact {identity}: {e}");
                    report
                        .outcomes
                        .push((identity, SyncOutcome::Failed(e.to_string())));
                    continue;
                }
            }

            ready.push(identity);
        }

        let built: Vec<_> = ready
            .into_par_iter()
            .map(|identity| {
                let result = load_predictor(
                    &identity.model,
                    &self.cache.param_path(&identity),
                    &self.cache.entity2id_path(&identity),
                    &self.cache.relation2id_path(&identity),
                );

                (identity, result)
            })
            .collect();

        let mut index = ModelIndex::new();
        for (identity, result) in built {
            match result {
                Ok(predictor) => {
                    index.insert((identity.gid, identity.model.clone()), Arc::new(predictor));
                    report.outcomes.push((identity, SyncOutcome::Loaded));
                }
                Err(e) => {
                    warn!("failed to build predictor for {identity}: {e}");
                    report.outcomes.push((identity, SyncOutcome::Failed(e.to_string())));
                }
            }
        }

        info!("synchronized models: {report}");
        Ok((index, report))
    }

    /// Drops any older cached version of the same `(gid, model)` pair,
    /// then writes the fresh artifact files.
    fn replace_cached(
        &self,
        local: &HashSet<ArtifactIdentity>,
        identity: &ArtifactIdentity,
        params: &str,
        entity2id: &str,
        relation2id: &str,
    ) -> io::Result<()> {
        for stale in local
            .iter()
            .filter(|l| l.gid == identity.gid && l.model == identity.model)
        {
            self.cache.remove(stale)?;
            debug!("removed superseded artifact {stale}");
        }

        self.cache
            .materialize(identity, params, entity2id, relation2id)?;
        debug!("materialized artifact {identity}");
        Ok(())
    }
}

/// Drives periodic refresh cycles until the task is aborted.
///
/// The tick body is awaited in full before the next tick is taken, so
/// refreshes never overlap. A failed cycle is logged and the previously
/// published index stays in place.
pub async fn run_refresh_loop<S: ArtifactStore>(
    sync: ModelSynchronizer<S>,
    handle: Arc<IndexHandle>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match sync.check_update().await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("skipping refresh cycle: {e}");
                continue;
            }
        }

        match sync.load().await {
            Ok((index, _)) => handle.publish(index),
            Err(e) => warn!("refresh cycle failed: {e}"),
        }
    }
}
