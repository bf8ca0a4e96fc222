use std::sync::Arc;

use async_trait::async_trait;

use predictor::ArtifactIdentity;
use wire::specs::registry::ReportBody;

use crate::error::Result;

/// One stored artifact's payload columns.
///
/// Any `None` marks the artifact incomplete; incomplete artifacts are
/// skipped by synchronization and retried on a later cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactRow {
    pub params: Option<String>,
    pub entity2id: Option<String>,
    pub relation2id: Option<String>,
}

impl ArtifactRow {
    /// Returns the three payloads only when all of them are present.
    pub fn complete(&self) -> Option<(&str, &str, &str)> {
        match (&self.params, &self.entity2id, &self.relation2id) {
            (Some(p), Some(e), Some(r)) => Some((p, e, r)),
            _ => None,
        }
    }
}

/// The persistent artifact store contract.
///
/// Implementations never leak backend types through these signatures.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Every identity currently marked available.
    async fn inventory(&self) -> Result<Vec<ArtifactIdentity>>;

    /// The payload columns for one `(gid, model)` pair. A missing row
    /// reads as an all-`None` (incomplete) artifact.
    async fn fetch(&self, gid: u64, model: &str) -> Result<ArtifactRow>;

    /// The training write path: stages the three payload columns in
    /// separate statements and flips `available` on last, so a partially
    /// uploaded artifact never becomes eligible remotely.
    async fn upload(
        &self,
        gid: u64,
        model: &str,
        params: &str,
        entity2id: &str,
        relation2id: &str,
    ) -> Result<()>;
}

#[async_trait]
impl<S: ArtifactStore + ?Sized> ArtifactStore for Arc<S> {
    async fn inventory(&self) -> Result<Vec<ArtifactIdentity>> {
        (**self).inventory().await
    }

    async fn fetch(&self, gid: u64, model: &str) -> Result<ArtifactRow> {
        (**self).fetch(gid, model).await
    }

    async fn upload(
        &self,
        gid: u64,
        model: &str,
        params: &str,
        entity2id: &str,
        relation2id: &str,
    ) -> Result<()> {
        (**self).upload(gid, model, params, entity2id, relation2id).await
    }
}

/// The call-telemetry log consumed by the service monitor.
#[async_trait]
pub trait CallLog: Send + Sync {
    /// Persists one call report.
    async fn record(&self, report: &ReportBody) -> Result<()>;

    /// All reports filed for `uid`.
    async fn query(&self, uid: i64) -> Result<Vec<ReportBody>>;
}
