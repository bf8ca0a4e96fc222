use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use predictor::ArtifactIdentity;
use wire::specs::registry::ReportBody;

use crate::{
    error::Result,
    traits::{ArtifactRow, ArtifactStore, CallLog},
};

#[derive(Debug, Clone)]
struct MemoryRow {
    updated: i64,
    available: bool,
    payload: ArtifactRow,
}

/// An in-memory store implementing both contracts.
///
/// Used by the test suites and by single-process local runs; the `upload`
/// path bumps a logical clock so a re-trained artifact reads as a new
/// version.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(u64, String), MemoryRow>>,
    log: Mutex<Vec<ReportBody>>,
    clock: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one artifact row.
    ///
    /// # Arguments
    /// * `identity` - The identity to store under; its `updated` field
    ///   becomes the row's version.
    /// * `payload` - The payload columns, possibly partial.
    /// * `available` - Whether the row is eligible for synchronization.
    pub fn put(&self, identity: &ArtifactIdentity, payload: ArtifactRow, available: bool) {
        self.clock.fetch_max(identity.updated, Ordering::Relaxed);

        self.rows.lock().insert(
            (identity.gid, identity.model.clone()),
            MemoryRow {
                updated: identity.updated,
                available,
                payload,
            },
        );
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn inventory(&self) -> Result<Vec<ArtifactIdentity>> {
        let identities = self
            .rows
            .lock()
            .iter()
            .filter(|(_, row)| row.available)
            .map(|((gid, model), row)| ArtifactIdentity::new(*gid, model.clone(), row.updated))
            .collect();

        Ok(identities)
    }

    async fn fetch(&self, gid: u64, model: &str) -> Result<ArtifactRow> {
        let payload = self
            .rows
            .lock()
            .get(&(gid, model.to_string()))
            .map(|row| row.payload.clone())
            .unwrap_or_default();

        Ok(payload)
    }

    async fn upload(
        &self,
        gid: u64,
        model: &str,
        params: &str,
        entity2id: &str,
        relation2id: &str,
    ) -> Result<()> {
        let updated = self.clock.fetch_add(1, Ordering::Relaxed) + 1;

        let mut rows = self.rows.lock();
        rows.insert(
            (gid, model.to_string()),
            MemoryRow {
                updated,
                available: true,
                payload: ArtifactRow {
                    params: Some(params.to_string()),
                    entity2id: Some(entity2id.to_string()),
                    relation2id: Some(relation2id.to_string()),
                },
            },
        );

        Ok(())
    }
}

#[async_trait]
impl CallLog for MemoryStore {
    async fn record(&self, report: &ReportBody) -> Result<()> {
        self.log.lock().push(report.clone());
        Ok(())
    }

    async fn query(&self, uid: i64) -> Result<Vec<ReportBody>> {
        let records = self
            .log
            .lock()
            .iter()
            .filter(|report| report.uid == uid)
            .cloned()
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inventory_lists_only_available_rows() {
        let store = MemoryStore::new();

        store.put(
            &ArtifactIdentity::new(1, "transe", 10),
            ArtifactRow::default(),
            true,
        );
        store.put(
            &ArtifactIdentity::new(2, "transe", 11),
            ArtifactRow::default(),
            false,
        );

        let inventory = store.inventory().await.unwrap();
        assert_eq!(inventory, [ArtifactIdentity::new(1, "transe", 10)]);
    }

    #[tokio::test]
    async fn test_upload_makes_row_available_with_new_version() {
        let store = MemoryStore::new();

        store.put(
            &ArtifactIdentity::new(1, "transe", 10),
            ArtifactRow::default(),
            false,
        );

        store.upload(1, "transe", "{}", "0\n", "0\n").await.unwrap();

        let inventory = store.inventory().await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert!(inventory[0].updated > 10);

        let row = store.fetch(1, "transe").await.unwrap();
        assert!(row.complete().is_some());
    }

    #[tokio::test]
    async fn test_fetch_missing_row_reads_incomplete() {
        let store = MemoryStore::new();
        let row = store.fetch(9, "transd").await.unwrap();
        assert_eq!(row.complete(), None);
    }

    #[tokio::test]
    async fn test_call_log_round_trip() {
        let store = MemoryStore::new();
        let report = ReportBody {
            uid: 7,
            service: "/services/train".into(),
            timestamp: "1700000000".into(),
            duration: "12.5".into(),
            info: "{}".into(),
        };

        store.record(&report).await.unwrap();
        store
            .record(&ReportBody {
                uid: 8,
                ..report.clone()
            })
            .await
            .unwrap();

        assert_eq!(store.query(7).await.unwrap(), [report]);
    }
}
