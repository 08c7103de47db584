//! Error types for configuration tree operations.

use fyaml::error::Error as FyError;
use std::io;

/// Error type for configuration tree operations.
#[derive(Debug)]
pub enum Error {
    /// Document could not be parsed or emitted
    Parse(String),
    /// I/O error
    Io(String),
    /// Tree shape does not allow the operation (e.g. descending into a scalar)
    Structure { path: String, message: String },
    /// Value of the wrong kind was supplied
    Type(String),
    /// Invalid construction settings or combiner configuration
    Config(String),
    /// Generic error
    Base(String),
}

impl Error {
    pub(crate) fn structure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Structure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Path of the offending node for structural errors.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Structure { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl std::error::Error for Error {}

impl From<FyError> for Error {
    fn from(e: FyError) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Base(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Base(e.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "{}", e),
            Error::Structure { path, message } => {
                write!(f, "invalid path '{}', {}", path, message)
            }
            Error::Type(e) => write!(f, "{}", e),
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Base(e) => write!(f, "{}", e),
        }
    }
}

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}
