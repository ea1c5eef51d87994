use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidName(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid record set: {0}")]
    InvalidSet(String),

    #[error("Invalid zone: {0}")]
    InvalidZone(String),

    #[error("Zone handler error: {0}")]
    Handler(String),

    #[error("I/O error: {0}")]
    IoError(String),
}
