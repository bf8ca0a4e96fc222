use std::collections::HashMap;
use std::fmt::Write;

use crate::error::LoadErr;

/// A bijective name <-> index table for entities or relations.
///
/// Indices always cover `0..len()` with no gaps and no duplicate names;
/// construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap {
    names: Vec<String>,
    indices: HashMap<String, usize>,
}

impl IdMap {
    /// Builds the map from names listed in index order.
    ///
    /// # Arguments
    /// * `names` - One name per index, starting at 0.
    ///
    /// # Returns
    /// The map, or `LoadErr::Malformed` on a duplicate name.
    pub fn from_names(names: Vec<String>) -> Result<Self, LoadErr> {
        let mut indices = HashMap::with_capacity(names.len());

        for (idx, name) in names.iter().enumerate() {
            if indices.insert(name.clone(), idx).is_some() {
                return Err(LoadErr::Malformed(format!("duplicate name: {name}")));
            }
        }

        Ok(Self { names, indices })
    }

    /// Parses the id-map text format.
    ///
    /// First line is the declared count, every following line is
    /// `name<TAB>index`. Lines without exactly two fields are skipped;
    /// the surviving entries must form a bijection over the declared
    /// count.
    pub fn parse(text: &str) -> Result<Self, LoadErr> {
        let mut lines = text.lines();

        let count: usize = lines
            .next()
            .and_then(|line| line.trim().parse().ok())
            .ok_or_else(|| LoadErr::Malformed("missing id-map count line".into()))?;

        let mut slots: Vec<Option<String>> = vec![None; count];

        for line in lines {
            let mut fields = line.split('\t');
            let (Some(name), Some(index), None) = (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };

            let index: usize = index
                .trim()
                .parse()
                .map_err(|_| LoadErr::Malformed(format!("bad index for name: {name}")))?;

            let slot = slots
                .get_mut(index)
                .ok_or_else(|| LoadErr::Malformed(format!("index {index} out of range")))?;

            if slot.replace(name.to_string()).is_some() {
                return Err(LoadErr::Malformed(format!("duplicate index: {index}")));
            }
        }

        let names = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.ok_or_else(|| LoadErr::Malformed(format!("unmapped index: {idx}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_names(names)
    }

    /// Emits the id-map text format parsed by [`IdMap::parse`].
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        // The writer is a String, these cannot fail.
        writeln!(out, "{}", self.names.len()).unwrap();
        for (idx, name) in self.names.iter().enumerate() {
            writeln!(out, "{name}\t{idx}").unwrap();
        }

        out
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Looks up the index of `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Looks up the name at `index`.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }
}
