use std::{error::Error, fmt, io};

use store::StoreErr;

/// The trainer's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Training-side failures.
///
/// `MalformedPayload` is settled without requeue; everything else is a
/// routine failure the broker may redeliver.
#[derive(Debug)]
pub enum TrainErr {
    MalformedPayload(serde_json::Error),
    /// A job arrived with no triples; there is nothing to index or split.
    EmptyJob,
    Io(io::Error),
    Store(StoreErr),
    Coordination(io::Error),
    /// The external training routine reported a failure.
    Routine(String),
    NotRegistered,
    NoMonitor,
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainErr::MalformedPayload(e) => write!(f, "malformed job payload: {e}"),
            TrainErr::EmptyJob => write!(f, "job carries no triples"),
            TrainErr::Io(e) => write!(f, "io error: {e}"),
            TrainErr::Store(e) => write!(f, "store error: {e}"),
            TrainErr::Coordination(e) => write!(f, "coordination service unavailable: {e}"),
            TrainErr::Routine(detail) => write!(f, "training routine failed: {detail}"),
            TrainErr::NotRegistered => write!(f, "service node was never registered"),
            TrainErr::NoMonitor => write!(f, "no monitor registered"),
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrainErr::MalformedPayload(e) => Some(e),
            TrainErr::Io(e) | TrainErr::Coordination(e) => Some(e),
            TrainErr::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreErr> for TrainErr {
    fn from(value: StoreErr) -> Self {
        Self::Store(value)
    }
}
