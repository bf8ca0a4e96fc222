use std::collections::HashMap;

use ndarray::Array2;

use crate::error::LoadErr;

/// Embedding-table keys inside a `.param` file.
pub(crate) const ENT_EMBEDDINGS: &str = "ent_embeddings.weight";
pub(crate) const REL_EMBEDDINGS: &str = "rel_embeddings.weight";
pub(crate) const NORM_VECTOR: &str = "norm_vector.weight";
pub(crate) const ENT_TRANSFER: &str = "ent_transfer.weight";
pub(crate) const REL_TRANSFER: &str = "rel_transfer.weight";

/// The deserialized `.param` file: embedding-table name -> flat array.
#[derive(Debug)]
pub(crate) struct ParamTables(HashMap<String, Vec<f32>>);

impl ParamTables {
    /// Parses the JSON table map.
    pub(crate) fn parse(text: &str) -> Result<Self, LoadErr> {
        let tables = serde_json::from_str(text)
            .map_err(|e| LoadErr::Malformed(format!("bad param json: {e}")))?;

        Ok(Self(tables))
    }

    /// Removes the table under `key` and reshapes it to `rows` rows.
    ///
    /// The flat length must divide evenly by the row count; the per-row
    /// dimension is inferred from the quotient.
    pub(crate) fn take(&mut self, key: &'static str, rows: usize) -> Result<Array2<f32>, LoadErr> {
        let flat = self.0.remove(key).ok_or(LoadErr::MissingTable(key))?;

        if rows == 0 {
            return Err(LoadErr::Malformed(format!("table {key} has no rows")));
        }
        if flat.len() % rows != 0 {
            return Err(LoadErr::Malformed(format!(
                "table {key} length {} does not divide into {rows} rows",
                flat.len()
            )));
        }

        let dim = flat.len() / rows;
        Array2::from_shape_vec((rows, dim), flat)
            .map_err(|e| LoadErr::Malformed(format!("table {key}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_reshapes_row_major() {
        let mut tables =
            ParamTables::parse(r#"{"ent_embeddings.weight": [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]}"#)
                .unwrap();

        let table = tables.take(ENT_EMBEDDINGS, 3).unwrap();
        assert_eq!(table.shape(), [3, 2]);
        assert_eq!(table.row(1).to_vec(), [3.0, 4.0]);
    }

    #[test]
    fn test_take_missing_table() {
        let mut tables = ParamTables::parse("{}").unwrap();
        assert!(matches!(
            tables.take(REL_EMBEDDINGS, 1),
            Err(LoadErr::MissingTable(REL_EMBEDDINGS))
        ));
    }

    #[test]
    fn test_take_ragged_length() {
        let mut tables =
            ParamTables::parse(r#"{"ent_embeddings.weight": [1.0, 2.0, 3.0]}"#).unwrap();
        assert!(matches!(
            tables.take(ENT_EMBEDDINGS, 2),
            Err(LoadErr::Malformed(_))
        ));
    }
}
