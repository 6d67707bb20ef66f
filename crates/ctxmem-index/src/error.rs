use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the index layer, matching the error-kind taxonomy used
/// across the engine so callers can match on kind rather than message.
#[derive(Debug)]
pub enum Error {
    /// Missing required fields, negative limits, bad enum value.
    InputInvalid(String),
    /// Unknown id where a result is expected to exist.
    NotFound(String),
    /// FTS structure inconsistency or schema mismatch; may be self-repaired.
    Corruption(String),
    Database(rusqlite::Error),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputInvalid(msg) => write!(f, "invalid input: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Corruption(msg) => write!(f, "index corruption: {}", msg),
            Error::Database(err) => write!(f, "database error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Serde(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::InputInvalid(_) | Error::NotFound(_) | Error::Corruption(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}
