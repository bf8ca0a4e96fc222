use std::{error::Error, fmt};

/// The store crate's result type.
pub type Result<T> = std::result::Result<T, StoreErr>;

/// Failures talking to the persistent artifact store.
#[derive(Debug)]
pub enum StoreErr {
    /// The backend could not be reached or rejected the statement.
    Unavailable(String),
    /// A row came back with values the contract does not allow.
    Malformed(String),
}

impl fmt::Display for StoreErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErr::Unavailable(detail) => write!(f, "store unavailable: {detail}"),
            StoreErr::Malformed(detail) => write!(f, "malformed store row: {detail}"),
        }
    }
}

impl Error for StoreErr {}

impl From<sqlx::Error> for StoreErr {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Malformed(value.to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}
