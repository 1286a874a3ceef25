use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Campaign must have an associated landing page to send emails.")]
    NoLandingpage,

    #[error("Campaign must have prospect filters defined to send emails.")]
    NoProspectFilter,

    #[error("Campaign must be active to send emails.")]
    NotActive,

    #[error("Campaign must have an associated landing page")]
    MissingLandingpage,

    #[error("Invalid tracking base URL: {0}")]
    InvalidBaseUrl(String),
}
