use std::sync::Arc;

use predictor::Predictor;
use wire::specs::serving::{Call, Reply};

use crate::{error::ServeErr, index::IndexHandle};

/// A successfully answered call.
///
/// Embedding lookups are kept apart from the JSON replies so the
/// connection layer can frame them as raw vectors.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Names(Vec<String>),
    Truth(bool),
    Vector(Vec<f32>),
}

/// Stateless dispatch of serving calls against the published index.
#[derive(Clone)]
pub struct ServingFront {
    index: Arc<IndexHandle>,
}

impl ServingFront {
    pub fn new(index: Arc<IndexHandle>) -> Self {
        Self { index }
    }

    /// Answers one call against the current snapshot.
    ///
    /// The snapshot is taken once per call; a publish landing mid-request
    /// never mixes model versions within one answer.
    pub fn dispatch(&self, call: &Call) -> Result<Outcome, ServeErr> {
        let (gid, model) = call.target();
        let snapshot = self.index.snapshot();

        let predictor = snapshot
            .get(&(gid, model.to_string()))
            .ok_or_else(|| ServeErr::ModelNotLoaded {
                gid,
                model: model.to_string(),
            })?;

        Self::answer(predictor, call).map_err(ServeErr::from)
    }

    fn answer(predictor: &Predictor, call: &Call) -> Result<Outcome, predictor::PredictErr> {
        let outcome = match call {
            Call::PredictHead {
                tail, relation, k, ..
            } => Outcome::Names(predictor.predict_head(tail, relation, *k)?),
            Call::PredictTail {
                head, relation, k, ..
            } => Outcome::Names(predictor.predict_tail(head, relation, *k)?),
            Call::PredictRelation { head, tail, k, .. } => {
                Outcome::Names(predictor.predict_relation(head, tail, *k)?)
            }
            Call::PredictTriple {
                head,
                tail,
                relation,
                threshold,
                ..
            } => Outcome::Truth(predictor.predict_triple(head, tail, relation, *threshold)?),
            Call::EntityEmbedding { name, .. } => {
                Outcome::Vector(predictor.entity_embedding(name)?.to_vec())
            }
            Call::RelationEmbedding { name, .. } => {
                Outcome::Vector(predictor.relation_embedding(name)?.to_vec())
            }
        };

        Ok(outcome)
    }
}

impl Outcome {
    /// Frames the outcome as its wire message.
    pub fn into_msg(self) -> wire::msg::Msg<'static> {
        use wire::msg::Msg;

        match self {
            Outcome::Names(names) => Msg::Reply(Reply::Names(names)),
            Outcome::Truth(truth) => Msg::Reply(Reply::Truth(truth)),
            Outcome::Vector(nums) => Msg::Vector(nums.into()),
        }
    }
}
