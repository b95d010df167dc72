use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Connection to {address} refused: {reason}")]
    ConnectionRefused { address: String, reason: String },
    #[error("Connection to {address} timed out")]
    ConnectionTimeout { address: String },
    #[error("Unknown network error: {0}")]
    UnknownError(String),
}
