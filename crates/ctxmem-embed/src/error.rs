use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The remote embedding API returned a non-success status or a body
    /// that didn't match the expected shape.
    Remote(String),
    /// Transport-level failure talking to the remote API; retryable.
    Transient(reqwest::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Remote(msg) => write!(f, "embedding API error: {}", msg),
            Error::Transient(err) => write!(f, "embedding request failed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Remote(_) => None,
            Error::Transient(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transient(err)
    }
}

impl Error {
    /// Whether a retry is likely to succeed — mirrors the `Transient` vs.
    /// `Fatal` error-kind split the outbox's retry sweep relies on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}
