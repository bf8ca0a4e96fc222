use ndarray::{Array1, Array2, Axis};

use crate::error::LoadErr;

/// The fixed enumeration of supported scoring variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    TransE,
    TransH,
    TransD,
}

impl Variant {
    /// Maps a stored model name onto a variant.
    ///
    /// # Arguments
    /// * `name` - The model name as stored in the artifact inventory.
    ///
    /// # Returns
    /// The variant, or `LoadErr::UnknownVariant` for anything outside the
    /// closed set.
    pub fn from_name(name: &str) -> Result<Self, LoadErr> {
        match name {
            "transe" => Ok(Self::TransE),
            "transh" => Ok(Self::TransH),
            "transd" => Ok(Self::TransD),
            other => Err(LoadErr::UnknownVariant(other.to_string())),
        }
    }
}

/// The scoring geometry of one loaded model, selected once at load time.
///
/// Scoring is the L1 distance between a reconstructed target and the
/// candidate vector; the variants differ only in how entity vectors are
/// projected into the relation's space before translation.
#[derive(Debug)]
pub enum Geometry {
    /// Plain translation: entities score as-is.
    Translation,
    /// Entities are projected onto a relation-specific hyperplane:
    /// `e - (w . e) w`, with one normal vector `w` per relation.
    Hyperplane { normals: Array2<f32> },
    /// Entities are projected by relation- and entity-specific transfer
    /// vectors: `normalize(e + (e . ep) rp)`.
    DynamicProjection {
        ent_transfer: Array2<f32>,
        rel_transfer: Array2<f32>,
    },
}

impl Geometry {
    /// Validates the auxiliary table shapes against the model's universe.
    pub(crate) fn check_shapes(
        &self,
        n_entities: usize,
        n_relations: usize,
        dim: usize,
    ) -> Result<(), LoadErr> {
        let check = |what: &str, shape: &[usize], rows: usize| {
            if shape == [rows, dim] {
                Ok(())
            } else {
                Err(LoadErr::Malformed(format!(
                    "{what} table shape {shape:?} does not match [{rows}, {dim}]"
                )))
            }
        };

        match self {
            Geometry::Translation => Ok(()),
            Geometry::Hyperplane { normals } => check("normal", normals.shape(), n_relations),
            Geometry::DynamicProjection {
                ent_transfer,
                rel_transfer,
            } => {
                check("entity transfer", ent_transfer.shape(), n_entities)?;
                check("relation transfer", rel_transfer.shape(), n_relations)
            }
        }
    }

    /// Projects one entity vector into the space of relation `rel`.
    pub(crate) fn project_entity(
        &self,
        ents: &Array2<f32>,
        e: usize,
        rel: usize,
    ) -> Array1<f32> {
        let v = ents.row(e);

        match self {
            Geometry::Translation => v.to_owned(),
            Geometry::Hyperplane { normals } => {
                let w = normals.row(rel);
                let coef = w.dot(&v);
                &v - &(&w * coef)
            }
            Geometry::DynamicProjection {
                ent_transfer,
                rel_transfer,
            } => {
                let ep = ent_transfer.row(e);
                let rp = rel_transfer.row(rel);
                let mut proj = &v + &(&rp * v.dot(&ep));
                normalize(proj.view_mut());
                proj
            }
        }
    }

    /// Scores every entity as a candidate under relation `rel`.
    ///
    /// # Arguments
    /// * `ents` - The full entity embedding table.
    /// * `rel` - The fixed relation index.
    /// * `target` - The reconstructed target vector.
    ///
    /// # Returns
    /// `||P(e) - target||_1` for every entity row `e`.
    pub(crate) fn entity_scores(
        &self,
        ents: &Array2<f32>,
        rel: usize,
        target: &Array1<f32>,
    ) -> Array1<f32> {
        match self {
            Geometry::Translation => l1_rows(ents - target),
            Geometry::Hyperplane { normals } => {
                let w = normals.row(rel);
                let coef = ents.dot(&w).insert_axis(Axis(1));
                let proj = ents - &coef.dot(&w.insert_axis(Axis(0)));
                l1_rows(proj - target)
            }
            Geometry::DynamicProjection {
                ent_transfer,
                rel_transfer,
            } => {
                let rp = rel_transfer.row(rel);
                let coef = (ents * ent_transfer).sum_axis(Axis(1)).insert_axis(Axis(1));
                let mut proj = ents + &coef.dot(&rp.insert_axis(Axis(0)));
                normalize_rows(&mut proj);
                l1_rows(proj - target)
            }
        }
    }

    /// Scores every relation as a candidate for a fixed `(head, tail)` pair.
    ///
    /// # Returns
    /// `||P_r(h) + r - P_r(t)||_1` for every relation row `r`.
    pub(crate) fn relation_scores(
        &self,
        ents: &Array2<f32>,
        rels: &Array2<f32>,
        head: usize,
        tail: usize,
    ) -> Array1<f32> {
        let h = ents.row(head);
        let t = ents.row(tail);

        match self {
            Geometry::Translation => l1_rows(&(rels + &h) - &t),
            Geometry::Hyperplane { normals } => {
                // Each candidate relation projects both entities onto its
                // own hyperplane. Broadcasting a vector over the relation
                // rows cannot fail.
                let shape = (rels.nrows(), h.len());
                let hb = h.broadcast(shape).unwrap();
                let tb = t.broadcast(shape).unwrap();

                let h_proj = &hb - &(normals * &normals.dot(&h).insert_axis(Axis(1)));
                let t_proj = &tb - &(normals * &normals.dot(&t).insert_axis(Axis(1)));
                l1_rows((h_proj + rels) - t_proj)
            }
            Geometry::DynamicProjection {
                ent_transfer,
                rel_transfer,
            } => {
                let h_coef = h.dot(&ent_transfer.row(head));
                let t_coef = t.dot(&ent_transfer.row(tail));

                let mut h_proj = rel_transfer * h_coef + &h;
                let mut t_proj = rel_transfer * t_coef + &t;
                normalize_rows(&mut h_proj);
                normalize_rows(&mut t_proj);

                l1_rows((h_proj + rels) - t_proj)
            }
        }
    }
}

/// Sums absolute values along each row.
fn l1_rows(diff: Array2<f32>) -> Array1<f32> {
    diff.mapv(f32::abs).sum_axis(Axis(1))
}

/// Scales `v` to unit L2 length, leaving zero vectors untouched.
fn normalize(mut v: ndarray::ArrayViewMut1<f32>) {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v.mapv_inplace(|x| x / norm);
    }
}

/// Scales every row to unit L2 length.
fn normalize_rows(m: &mut Array2<f32>) {
    for row in m.rows_mut() {
        normalize(row);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_variant_from_name_is_closed() {
        assert_eq!(Variant::from_name("transe").unwrap(), Variant::TransE);
        assert_eq!(Variant::from_name("transh").unwrap(), Variant::TransH);
        assert_eq!(Variant::from_name("transd").unwrap(), Variant::TransD);
        assert!(matches!(
            Variant::from_name("rotate"),
            Err(LoadErr::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_hyperplane_projection_is_orthogonal_to_normal() {
        let ents = array![[3.0, 4.0], [1.0, 0.0]];
        let normals = array![[0.0, 1.0]];
        let geometry = Geometry::Hyperplane { normals };

        let proj = geometry.project_entity(&ents, 0, 0);
        assert_eq!(proj.to_vec(), [3.0, 0.0]);
    }

    #[test]
    fn test_entity_scores_match_single_projection() {
        let ents = array![[0.0, 0.0], [1.0, 1.0], [2.0, 0.5]];
        let normals = array![[1.0, 0.0]];
        let geometry = Geometry::Hyperplane {
            normals: normals.clone(),
        };

        let target = array![0.5, 0.25];
        let scores = geometry.entity_scores(&ents, 0, &target);

        for e in 0..ents.nrows() {
            let diff = geometry.project_entity(&ents, e, 0) - &target;
            let expected: f32 = diff.mapv(f32::abs).sum();
            assert!((scores[e] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_dynamic_projection_normalizes() {
        let ents = array![[2.0, 0.0]];
        let ent_transfer = array![[1.0, 0.0]];
        let rel_transfer = array![[0.0, 1.0]];
        let geometry = Geometry::DynamicProjection {
            ent_transfer,
            rel_transfer,
        };

        let proj = geometry.project_entity(&ents, 0, 0);
        let norm: f32 = proj.dot(&proj);
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
