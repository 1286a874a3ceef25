use thiserror::Error;
use crate::schema::SchemaError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity already exists: {0}")]
    EntityExists(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
