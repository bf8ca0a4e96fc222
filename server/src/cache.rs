use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use predictor::ArtifactIdentity;

/// The local artifact cache directory.
///
/// Every artifact is persisted as three files sharing an identity-encoded
/// stem, so the local inventory is recovered purely by decoding file
/// names. Foreign files are ignored.
#[derive(Debug)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    /// Opens the cache at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes the locally cached identities.
    ///
    /// An identity counts as present only when all three of its files
    /// exist; a partially written artifact reads as absent and is fetched
    /// again on the next cycle.
    pub fn inventory(&self) -> io::Result<HashSet<ArtifactIdentity>> {
        let mut identities = HashSet::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();

            let Some(identity) = name.to_str().and_then(ArtifactIdentity::parse_file_name) else {
                continue;
            };

            if self.param_path(&identity).is_file()
                && self.entity2id_path(&identity).is_file()
                && self.relation2id_path(&identity).is_file()
            {
                identities.insert(identity);
            }
        }

        Ok(identities)
    }

    /// Writes the three artifact files for `identity`.
    ///
    /// # Arguments
    /// * `identity` - The identity encoding the file stems.
    /// * `params` - The embedding-table JSON payload.
    /// * `entity2id` - The entity id-map text.
    /// * `relation2id` - The relation id-map text.
    pub fn materialize(
        &self,
        identity: &ArtifactIdentity,
        params: &str,
        entity2id: &str,
        relation2id: &str,
    ) -> io::Result<()> {
        fs::write(self.param_path(identity), params)?;
        fs::write(self.entity2id_path(identity), entity2id)?;
        fs::write(self.relation2id_path(identity), relation2id)?;
        Ok(())
    }

    /// Removes the three files of a cached identity, ignoring ones
    /// already gone.
    pub fn remove(&self, identity: &ArtifactIdentity) -> io::Result<()> {
        for path in [
            self.param_path(identity),
            self.entity2id_path(identity),
            self.relation2id_path(identity),
        ] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    pub fn param_path(&self, identity: &ArtifactIdentity) -> PathBuf {
        self.root.join(identity.param_file())
    }

    pub fn entity2id_path(&self, identity: &ArtifactIdentity) -> PathBuf {
        self.root.join(identity.entity2id_file())
    }

    pub fn relation2id_path(&self, identity: &ArtifactIdentity) -> PathBuf {
        self.root.join(identity.relation2id_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_then_inventory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(dir.path()).unwrap();
        let identity = ArtifactIdentity::new(1, "transe", 7);

        cache.materialize(&identity, "{}", "0\n", "0\n").unwrap();

        assert_eq!(cache.inventory().unwrap(), HashSet::from([identity]));
    }

    #[test]
    fn test_inventory_ignores_foreign_and_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(dir.path()).unwrap();

        fs::write(dir.path().join("readme.txt"), "hi").unwrap();
        // Only one of the three files present.
        let partial = ArtifactIdentity::new(2, "transh", 9);
        fs::write(cache.param_path(&partial), "{}").unwrap();

        assert!(cache.inventory().unwrap().is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheDir::open(dir.path()).unwrap();
        let identity = ArtifactIdentity::new(1, "transe", 7);

        cache.materialize(&identity, "{}", "0\n", "0\n").unwrap();
        cache.remove(&identity).unwrap();
        cache.remove(&identity).unwrap();

        assert!(cache.inventory().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("models");

        let cache = CacheDir::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(cache.inventory().unwrap().is_empty());
    }
}
