use std::{error::Error, fmt, io};

use predictor::PredictErr;
use store::StoreErr;
use wire::specs::serving::{FailureKind, Reply};

/// Per-request serving failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeErr {
    /// No predictor is loaded for the requested `(gid, model)` pair.
    ModelNotLoaded { gid: u64, model: String },
    /// The resolved predictor rejected a lookup key.
    Predict(PredictErr),
}

impl ServeErr {
    /// Maps the failure onto its wire representation.
    pub fn to_failure(&self) -> Reply {
        let kind = match self {
            ServeErr::ModelNotLoaded { .. } => FailureKind::ModelNotLoaded,
            ServeErr::Predict(PredictErr::UnknownEntity(_)) => FailureKind::UnknownEntity,
            ServeErr::Predict(PredictErr::UnknownRelation(_)) => FailureKind::UnknownRelation,
        };

        Reply::Failure {
            kind,
            detail: self.to_string(),
        }
    }
}

impl fmt::Display for ServeErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeErr::ModelNotLoaded { gid, model } => {
                write!(f, "no model loaded for gid {gid} and name '{model}'")
            }
            ServeErr::Predict(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ServeErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServeErr::Predict(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PredictErr> for ServeErr {
    fn from(value: PredictErr) -> Self {
        Self::Predict(value)
    }
}

/// Failures that abort a whole synchronization cycle.
///
/// Per-identity problems never surface here; they are collected into the
/// cycle's `SyncReport` instead.
#[derive(Debug)]
pub enum SyncErr {
    Store(StoreErr),
    Io(io::Error),
}

impl fmt::Display for SyncErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncErr::Store(e) => write!(f, "store error: {e}"),
            SyncErr::Io(e) => write!(f, "cache io error: {e}"),
        }
    }
}

impl Error for SyncErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncErr::Store(e) => Some(e),
            SyncErr::Io(e) => Some(e),
        }
    }
}

impl From<StoreErr> for SyncErr {
    fn from(value: StoreErr) -> Self {
        Self::Store(value)
    }
}

impl From<io::Error> for SyncErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
