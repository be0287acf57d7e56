//! Error types for the SOAP client builder.

use std::path::PathBuf;
use thiserror::Error;

/// SOAP client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected input at a builder call (bad URL, empty credentials,
    /// unreadable certificate).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// WSDL could not be obtained from the cache or the network.
    #[error("Cannot get wsdl: {0}")]
    FetchFailed(String),

    /// WSDL could not be written back to the cache file.
    #[error("Cannot save wsdl to cache: {} is not writable", path.display())]
    CachePersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("SOAP engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<serde_yaml::Error> for ClientError {
    fn from(error: serde_yaml::Error) -> Self {
        ClientError::Config(error.to_string())
    }
}
