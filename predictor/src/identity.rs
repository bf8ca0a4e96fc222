use std::fmt;

/// The separator between the fields of a cache file stem.
pub const STEM_SEPARATOR: char = '_';

/// Uniquely names one version of one model artifact.
///
/// Two identities with equal `(gid, model)` but different `updated`
/// values are different versions. An artifact is persisted as three cache
/// files sharing the stem `{gid}_{model}_{updated}`; since the separator
/// is `_`, model names containing it cannot be encoded and fail to parse
/// back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactIdentity {
    pub gid: u64,
    pub model: String,
    pub updated: i64,
}

impl ArtifactIdentity {
    /// Creates a new identity.
    ///
    /// # Arguments
    /// * `gid` - The graph-space id.
    /// * `model` - The model variant name.
    /// * `updated` - The artifact's last-modified epoch seconds.
    pub fn new(gid: u64, model: impl Into<String>, updated: i64) -> Self {
        Self {
            gid,
            model: model.into(),
            updated,
        }
    }

    /// Encodes the identity into its cache file stem.
    pub fn file_stem(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.gid,
            self.model,
            self.updated,
            sep = STEM_SEPARATOR
        )
    }

    /// The embedding-table file name for this identity.
    pub fn param_file(&self) -> String {
        format!("{}.param", self.file_stem())
    }

    /// The entity id-map file name for this identity.
    pub fn entity2id_file(&self) -> String {
        format!("{}.entity2id.txt", self.file_stem())
    }

    /// The relation id-map file name for this identity.
    pub fn relation2id_file(&self) -> String {
        format!("{}.relation2id.txt", self.file_stem())
    }

    /// Decodes a cache file name back into an identity.
    ///
    /// The stem is everything before the first `.`; it must hold exactly
    /// three `_`-separated fields with numeric gid and timestamp. Returns
    /// `None` for anything else, so foreign files in the cache directory
    /// are simply skipped by inventory scans.
    ///
    /// # Arguments
    /// * `file_name` - A bare file name, without directory components.
    pub fn parse_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.split('.').next().unwrap_or(file_name);
        let mut parts = stem.split(STEM_SEPARATOR);

        let gid = parts.next()?.parse().ok()?;
        let model = parts.next()?;
        let updated = parts.next()?.parse().ok()?;

        if parts.next().is_some() || model.is_empty() {
            return None;
        }

        Some(Self::new(gid, model, updated))
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_round_trip() {
        let identity = ArtifactIdentity::new(42, "transe", 1_700_000_000);

        let parsed = ArtifactIdentity::parse_file_name(&identity.param_file()).unwrap();
        assert_eq!(parsed, identity);

        let parsed = ArtifactIdentity::parse_file_name(&identity.entity2id_file()).unwrap();
        assert_eq!(parsed, identity);

        let parsed = ArtifactIdentity::parse_file_name(&identity.relation2id_file()).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn test_rejects_separator_in_model_name() {
        assert_eq!(ArtifactIdentity::parse_file_name("1_trans_e_99.param"), None);
    }

    #[test]
    fn test_rejects_foreign_files() {
        assert_eq!(ArtifactIdentity::parse_file_name(".gitkeep"), None);
        assert_eq!(ArtifactIdentity::parse_file_name("readme.txt"), None);
        assert_eq!(ArtifactIdentity::parse_file_name("a_transe_9.param"), None);
        assert_eq!(ArtifactIdentity::parse_file_name("1_transe_x.param"), None);
        assert_eq!(ArtifactIdentity::parse_file_name("1__9.param"), None);
    }
}
