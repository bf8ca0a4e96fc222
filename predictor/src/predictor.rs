use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};

use crate::{
    error::{LoadErr, PredictErr},
    idmap::IdMap,
    scoring::Geometry,
};

/// One loaded model artifact: embeddings, id maps and a scoring geometry.
///
/// Answers the four link-prediction operations by exact scoring over the
/// full entity or relation universe; lower score means more plausible.
#[derive(Debug)]
pub struct Predictor {
    entities: IdMap,
    relations: IdMap,
    ent_embeddings: Array2<f32>,
    rel_embeddings: Array2<f32>,
    geometry: Geometry,
}

impl Predictor {
    /// Assembles a predictor from already-parsed parts.
    ///
    /// # Arguments
    /// * `entities` - The entity id map.
    /// * `relations` - The relation id map.
    /// * `ent_embeddings` - One embedding row per entity index.
    /// * `rel_embeddings` - One embedding row per relation index.
    /// * `geometry` - The scoring geometry with its auxiliary tables.
    ///
    /// # Returns
    /// The predictor, or `LoadErr::Malformed` when the table shapes and
    /// id maps disagree.
    pub fn new(
        entities: IdMap,
        relations: IdMap,
        ent_embeddings: Array2<f32>,
        rel_embeddings: Array2<f32>,
        geometry: Geometry,
    ) -> Result<Self, LoadErr> {
        if ent_embeddings.nrows() != entities.len() {
            return Err(LoadErr::Malformed(format!(
                "{} entity embeddings for {} mapped entities",
                ent_embeddings.nrows(),
                entities.len()
            )));
        }
        if rel_embeddings.nrows() != relations.len() {
            return Err(LoadErr::Malformed(format!(
                "{} relation embeddings for {} mapped relations",
                rel_embeddings.nrows(),
                relations.len()
            )));
        }
        if ent_embeddings.ncols() != rel_embeddings.ncols() {
            return Err(LoadErr::Malformed(format!(
                "entity dimension {} differs from relation dimension {}",
                ent_embeddings.ncols(),
                rel_embeddings.ncols()
            )));
        }

        geometry.check_shapes(entities.len(), relations.len(), ent_embeddings.ncols())?;

        Ok(Self {
            entities,
            relations,
            ent_embeddings,
            rel_embeddings,
            geometry,
        })
    }

    /// Predicts the `k` most plausible head entities for `(?, relation, tail)`.
    ///
    /// Ties are broken by ascending entity index.
    pub fn predict_head(&self, tail: &str, relation: &str, k: usize) -> Result<Vec<String>, PredictErr> {
        let t = self.entity_index(tail)?;
        let r = self.relation_index(relation)?;

        // score(h) = ||P(h) + r - P(t)|| = ||P(h) - (P(t) - r)||
        let target = self.geometry.project_entity(&self.ent_embeddings, t, r)
            - &self.rel_embeddings.row(r);
        let scores = self
            .geometry
            .entity_scores(&self.ent_embeddings, r, &target);

        Ok(self.entity_names(k_lowest(scores.view(), k)))
    }

    /// Predicts the `k` most plausible tail entities for `(head, relation, ?)`.
    pub fn predict_tail(&self, head: &str, relation: &str, k: usize) -> Result<Vec<String>, PredictErr> {
        let h = self.entity_index(head)?;
        let r = self.relation_index(relation)?;

        let target = self.geometry.project_entity(&self.ent_embeddings, h, r)
            + &self.rel_embeddings.row(r);
        let scores = self
            .geometry
            .entity_scores(&self.ent_embeddings, r, &target);

        Ok(self.entity_names(k_lowest(scores.view(), k)))
    }

    /// Predicts the `k` most plausible relations for `(head, ?, tail)`.
    pub fn predict_relation(&self, head: &str, tail: &str, k: usize) -> Result<Vec<String>, PredictErr> {
        let h = self.entity_index(head)?;
        let t = self.entity_index(tail)?;

        let scores =
            self.geometry
                .relation_scores(&self.ent_embeddings, &self.rel_embeddings, h, t);

        let names = k_lowest(scores.view(), k)
            .into_iter()
            .map(|idx| {
                // k_lowest only yields indices inside the relation universe.
                self.relations.name_of(idx).unwrap().to_string()
            })
            .collect();

        Ok(names)
    }

    /// Judges whether `(head, relation, tail)` scores strictly below `threshold`.
    pub fn predict_triple(
        &self,
        head: &str,
        tail: &str,
        relation: &str,
        threshold: f32,
    ) -> Result<bool, PredictErr> {
        let h = self.entity_index(head)?;
        let t = self.entity_index(tail)?;
        let r = self.relation_index(relation)?;

        Ok(self.triple_score(h, t, r) < threshold)
    }

    /// Returns the stored embedding vector for an entity.
    pub fn entity_embedding(&self, name: &str) -> Result<ArrayView1<'_, f32>, PredictErr> {
        let e = self.entity_index(name)?;
        Ok(self.ent_embeddings.row(e))
    }

    /// Returns the stored embedding vector for a relation.
    pub fn relation_embedding(&self, name: &str) -> Result<ArrayView1<'_, f32>, PredictErr> {
        let r = self.relation_index(name)?;
        Ok(self.rel_embeddings.row(r))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    fn triple_score(&self, h: usize, t: usize, r: usize) -> f32 {
        let h_proj = self.geometry.project_entity(&self.ent_embeddings, h, r);
        let t_proj = self.geometry.project_entity(&self.ent_embeddings, t, r);

        let diff = h_proj + &self.rel_embeddings.row(r) - t_proj;
        diff.mapv(f32::abs).sum()
    }

    fn entity_index(&self, name: &str) -> Result<usize, PredictErr> {
        self.entities
            .index_of(name)
            .ok_or_else(|| PredictErr::UnknownEntity(name.to_string()))
    }

    fn relation_index(&self, name: &str) -> Result<usize, PredictErr> {
        self.relations
            .index_of(name)
            .ok_or_else(|| PredictErr::UnknownRelation(name.to_string()))
    }

    fn entity_names(&self, indices: Vec<usize>) -> Vec<String> {
        indices
            .into_iter()
            .map(|idx| {
                // k_lowest only yields indices inside the entity universe.
                self.entities.name_of(idx).unwrap().to_string()
            })
            .collect()
    }
}

/// Returns the indices of the `k` lowest scores, ties broken by ascending
/// index.
fn k_lowest(scores: ArrayView1<f32>, k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();

    indices.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    indices.truncate(k);
    indices
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use crate::idmap::IdMap;

    use super::*;

    /// Entities a=(0,0), b=(1,0), c=(2,0); relation "step" = (1,0).
    fn line_predictor() -> Predictor {
        let entities =
            IdMap::from_names(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let relations = IdMap::from_names(vec!["step".into()]).unwrap();

        Predictor::new(
            entities,
            relations,
            array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]],
            array![[1.0, 0.0]],
            Geometry::Translation,
        )
        .unwrap()
    }

    #[test]
    fn test_predict_tail_prefers_translated_entity() {
        let p = line_predictor();

        // a + step = (1, 0) = b
        let names = p.predict_tail("a", "step", 1).unwrap();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn test_predict_head_prefers_inverse_translated_entity() {
        let p = line_predictor();

        // c - step = (1, 0) = b
        let names = p.predict_head("c", "step", 1).unwrap();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn test_predict_relation_single_universe() {
        let p = line_predictor();
        assert_eq!(p.predict_relation("a", "b", 1).unwrap(), ["step"]);
    }

    #[test]
    fn test_k_larger_than_universe_returns_each_entity_once() {
        let p = line_predictor();

        let mut names = p.predict_tail("a", "step", 100).unwrap();
        assert_eq!(names.len(), 3);
        names.sort();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_never_more_than_k_results() {
        let p = line_predictor();
        assert_eq!(p.predict_tail("a", "step", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_ties_break_by_ascending_index() {
        // a and c are equidistant from b under a zero relation.
        let entities =
            IdMap::from_names(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let relations = IdMap::from_names(vec!["same".into()]).unwrap();
        let p = Predictor::new(
            entities,
            relations,
            array![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]],
            array![[0.0, 0.0]],
            Geometry::Translation,
        )
        .unwrap();

        let names = p.predict_tail("b", "same", 3).unwrap();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_predict_triple_threshold_monotonic() {
        let p = line_predictor();

        // score(a, step, c) = ||(0,0)+(1,0)-(2,0)||_1 = 1
        assert!(!p.predict_triple("a", "c", "step", 0.5).unwrap());
        assert!(!p.predict_triple("a", "c", "step", 1.0).unwrap());
        assert!(p.predict_triple("a", "c", "step", 1.5).unwrap());
        // Once true at t1, true for every t2 > t1.
        assert!(p.predict_triple("a", "c", "step", 10.0).unwrap());
    }

    #[test]
    fn test_unknown_names_are_typed_errors() {
        let p = line_predictor();

        assert_eq!(
            p.predict_tail("nope", "step", 1),
            Err(PredictErr::UnknownEntity("nope".into()))
        );
        assert_eq!(
            p.predict_tail("a", "nope", 1),
            Err(PredictErr::UnknownRelation("nope".into()))
        );
        assert_eq!(
            p.entity_embedding("nope").err(),
            Some(PredictErr::UnknownEntity("nope".into()))
        );
    }

    #[test]
    fn test_embedding_lookup_returns_stored_row() {
        let p = line_predictor();

        let v: Array1<f32> = p.entity_embedding("b").unwrap().to_owned();
        assert_eq!(v.to_vec(), [1.0, 0.0]);

        let v = p.relation_embedding("step").unwrap();
        assert_eq!(v.to_vec(), [1.0, 0.0]);
    }

    #[test]
    fn test_new_rejects_mismatched_shapes() {
        let entities = IdMap::from_names(vec!["a".into(), "b".into()]).unwrap();
        let relations = IdMap::from_names(vec!["r".into()]).unwrap();

        let result = Predictor::new(
            entities,
            relations,
            array![[0.0, 0.0]], // one row for two entities
            array![[1.0, 0.0]],
            Geometry::Translation,
        );
        assert!(matches!(result, Err(LoadErr::Malformed(_))));
    }
}
