use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the engine layer, matching the taxonomy shared across
/// the storage crates.
#[derive(Debug)]
pub enum Error {
    InputInvalid(String),
    NotFound(String),
    Index(ctxmem_index::Error),
    Vector(ctxmem_vector::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InputInvalid(msg) => write!(f, "invalid input: {}", msg),
            Error::NotFound(msg) => write!(f, "not found: {}", msg),
            Error::Index(err) => write!(f, "index error: {}", err),
            Error::Vector(err) => write!(f, "vector index error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Vector(err) => Some(err),
            Error::InputInvalid(_) | Error::NotFound(_) => None,
        }
    }
}

impl From<ctxmem_index::Error> for Error {
    fn from(err: ctxmem_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<ctxmem_vector::Error> for Error {
    fn from(err: ctxmem_vector::Error) -> Self {
        Error::Vector(err)
    }
}
