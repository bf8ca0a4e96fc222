use serde::{Deserialize, Serialize};

/// A link-prediction request against one served model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    PredictHead {
        gid: u64,
        model: String,
        tail: String,
        relation: String,
        k: usize,
    },
    PredictTail {
        gid: u64,
        model: String,
        head: String,
        relation: String,
        k: usize,
    },
    PredictRelation {
        gid: u64,
        model: String,
        head: String,
        tail: String,
        k: usize,
    },
    PredictTriple {
        gid: u64,
        model: String,
        head: String,
        tail: String,
        relation: String,
        threshold: f32,
    },
    EntityEmbedding {
        gid: u64,
        model: String,
        name: String,
    },
    RelationEmbedding {
        gid: u64,
        model: String,
        name: String,
    },
}

impl Call {
    /// The `(gid, model)` pair this call resolves against.
    pub fn target(&self) -> (u64, &str) {
        match self {
            Call::PredictHead { gid, model, .. }
            | Call::PredictTail { gid, model, .. }
            | Call::PredictRelation { gid, model, .. }
            | Call::PredictTriple { gid, model, .. }
            | Call::EntityEmbedding { gid, model, .. }
            | Call::RelationEmbedding { gid, model, .. } => (*gid, model),
        }
    }
}

/// A serving answer for everything except raw embedding vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Names(Vec<String>),
    Truth(bool),
    Failure { kind: FailureKind, detail: String },
}

/// The closed set of per-request failures a serving client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownEntity,
    UnknownRelation,
    ModelNotLoaded,
}
