use serde::{Deserialize, Serialize};

/// A training request as published on the job queue.
///
/// The JSON field names follow the broker contract, not Rust convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// `[head, tail, relation]` triples by name.
    #[serde(rename = "trainTriples")]
    pub train_triples: Vec<(String, String, String)>,
    #[serde(rename = "modelName")]
    pub model_name: String,
    pub gid: u64,
    pub uuid: String,
    pub uid: i64,
}

/// Broker-link messages: one delivery in, one explicit settlement out.
///
/// The broker treats `payload` as opaque bytes; parsing it into a
/// [`JobSpec`] is the consumer's job, so settlements are keyed by the
/// delivery `tag` rather than anything inside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMsg {
    Job {
        tag: u64,
        payload: String,
        redelivered: bool,
    },
    Ack {
        tag: u64,
    },
    Nack {
        tag: u64,
        requeue: bool,
    },
}
