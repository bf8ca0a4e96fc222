use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use predictor::Predictor;

/// The immutable set of served predictors, keyed by `(gid, model)`.
pub type ModelIndex = HashMap<(u64, String), Arc<Predictor>>;

/// A single-writer published snapshot of the model index.
///
/// `snapshot` is one atomic read and `publish` replaces the whole index,
/// so readers observe either the previous index or the next one, never a
/// mixture. In-flight requests keep scoring against the snapshot they
/// took even across a publish.
#[derive(Debug, Default)]
pub struct IndexHandle {
    current: RwLock<Arc<ModelIndex>>,
}

impl IndexHandle {
    /// Creates a handle over an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the current snapshot.
    pub fn snapshot(&self) -> Arc<ModelIndex> {
        self.current.read().clone()
    }

    /// Replaces the published index wholesale.
    pub fn publish(&self, index: ModelIndex) {
        *self.current.write() = Arc::new(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_publish() {
        let handle = IndexHandle::new();
        let before = handle.snapshot();

        handle.publish(ModelIndex::new());
        let after = handle.snapshot();

        // The old snapshot stays readable and the two are distinct.
        assert!(before.is_empty());
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
