use std::{error::Error, fmt, io};

/// Lookup failures raised while answering a prediction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictErr {
    UnknownEntity(String),
    UnknownRelation(String),
}

impl fmt::Display for PredictErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictErr::UnknownEntity(name) => write!(f, "unknown entity: {name}"),
            PredictErr::UnknownRelation(name) => write!(f, "unknown relation: {name}"),
        }
    }
}

impl Error for PredictErr {}

/// Failures raised while materializing a predictor from artifact files.
#[derive(Debug)]
pub enum LoadErr {
    Io(io::Error),
    UnknownVariant(String),
    MissingTable(&'static str),
    Malformed(String),
}

impl fmt::Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErr::Io(e) => write!(f, "io error: {e}"),
            LoadErr::UnknownVariant(name) => write!(f, "unknown scoring variant: {name}"),
            LoadErr::MissingTable(key) => write!(f, "missing embedding table: {key}"),
            LoadErr::Malformed(detail) => write!(f, "malformed artifact: {detail}"),
        }
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LoadErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
