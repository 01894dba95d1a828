use std::fmt::{self, Display};
use std::io;

/// Provides `EcsError` and maps other errors to
/// convert to an `EcsError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum EcsError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    /// A query or lookup named a component type that was never registered with the manager.
    UnregisteredComponent(&'static str),
    InvalidConfig(String),
    /// Incrementally maintained query state disagrees with a brute-force scan.
    QueryDrift(String),
    EcsError(String),
}

impl From<io::Error> for EcsError {
    fn from(error: io::Error) -> Self {
        EcsError::IoError(error)
    }
}

impl From<serde_json::Error> for EcsError {
    fn from(error: serde_json::Error) -> Self {
        EcsError::JsonError(error)
    }
}

impl From<String> for EcsError {
    fn from(error: String) -> Self {
        EcsError::EcsError(error)
    }
}

impl From<&str> for EcsError {
    fn from(error: &str) -> Self {
        EcsError::EcsError(error.to_string())
    }
}

impl std::error::Error for EcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EcsError::IoError(error) => Some(error),
            EcsError::JsonError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EcsError::UnregisteredComponent(name) => {
                write!(f, "Error: component `{name}` is not registered")
            }
            EcsError::InvalidConfig(message) => write!(f, "Error: invalid configuration: {message}"),
            EcsError::QueryDrift(message) => write!(f, "Error: query drift: {message}"),
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
