use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort an import run for a source
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Storage error: {0}")]
    Storage(#[from] leadx_core::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(leadx_core::Error::from(e))
    }
}
