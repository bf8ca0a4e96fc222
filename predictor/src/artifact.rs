//! Materialization of a predictor from its three cache files.

use std::{fs, path::Path};

use crate::{
    error::LoadErr,
    idmap::IdMap,
    params::{ENT_EMBEDDINGS, ENT_TRANSFER, NORM_VECTOR, REL_EMBEDDINGS, REL_TRANSFER, ParamTables},
    predictor::Predictor,
    scoring::{Geometry, Variant},
};

/// Reads the three artifact files and builds a ready-to-serve predictor.
///
/// # Arguments
/// * `model` - The model variant name, selecting the scoring geometry.
/// * `param_path` - The `.param` embedding-table file.
/// * `entity2id_path` - The entity id-map file.
/// * `relation2id_path` - The relation id-map file.
///
/// # Returns
/// The predictor, or a `LoadErr` describing the first defect found.
pub fn load_predictor(
    model: &str,
    param_path: &Path,
    entity2id_path: &Path,
    relation2id_path: &Path,
) -> Result<Predictor, LoadErr> {
    let variant = Variant::from_name(model)?;

    let entities = IdMap::parse(&fs::read_to_string(entity2id_path)?)?;
    let relations = IdMap::parse(&fs::read_to_string(relation2id_path)?)?;

    let mut tables = ParamTables::parse(&fs::read_to_string(param_path)?)?;
    let ent_embeddings = tables.take(ENT_EMBEDDINGS, entities.len())?;
    let rel_embeddings = tables.take(REL_EMBEDDINGS, relations.len())?;

    let geometry = match variant {
        Variant::TransE => Geometry::Translation,
        Variant::TransH => Geometry::Hyperplane {
            normals: tables.take(NORM_VECTOR, relations.len())?,
        },
        Variant::TransD => Geometry::DynamicProjection {
            ent_transfer: tables.take(ENT_TRANSFER, entities.len())?,
            rel_transfer: tables.take(REL_TRANSFER, relations.len())?,
        },
    };

    Predictor::new(entities, relations, ent_embeddings, rel_embeddings, geometry)
}
