//! Ledger Errors
//! Mission: One taxonomy for every failure the catalog and ledger can report

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Identity string that is not a well-formed id
    #[error("Invalid {kind} id: {value}")]
    InvalidReference { kind: &'static str, value: String },

    /// Well-formed identity with no matching record
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn invalid_reference(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidReference {
            kind,
            value: value.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for LedgerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("storage task aborted: {}", err))
    }
}
