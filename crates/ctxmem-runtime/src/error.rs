use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds for the runtime layer: everything that can go wrong
/// opening a per-project store, running a background worker, or talking
/// to the remote replication target.
#[derive(Debug)]
pub enum Error {
    Config(String),
    InputInvalid(String),
    Index(ctxmem_index::Error),
    Vector(ctxmem_vector::Error),
    Engine(ctxmem_engine::Error),
    Embed(ctxmem_embed::Error),
    Io(std::io::Error),
    Serde(serde_json::Error),
    Toml(String),
    /// Remote log transport failure; matches the `Transient` kind — the
    /// replicator retries these rather than treating them as fatal.
    Remote(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {}", msg),
            Error::InputInvalid(msg) => write!(f, "invalid input: {}", msg),
            Error::Index(err) => write!(f, "index error: {}", err),
            Error::Vector(err) => write!(f, "vector index error: {}", err),
            Error::Engine(err) => write!(f, "engine error: {}", err),
            Error::Embed(err) => write!(f, "embedding error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Serde(err) => write!(f, "serialization error: {}", err),
            Error::Toml(msg) => write!(f, "config parse error: {}", msg),
            Error::Remote(msg) => write!(f, "remote sync error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Vector(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Embed(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Config(_) | Error::InputInvalid(_) | Error::Toml(_) | Error::Remote(_) => None,
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

impl From<ctxmem_engine::Error> for Error {
    fn from(err: ctxmem_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<ctxmem_embed::Error> for Error {
    fn from(err: ctxmem_embed::Error) -> Self {
        Error::Embed(err)
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

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Toml(err.to_string())
    }
}
