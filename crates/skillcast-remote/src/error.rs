use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("Remote call rejected: {0}")]
    Rejected(String),

    #[error("Remote call timed out")]
    Timeout,

    #[error("Remote calls require authority over the skill owner")]
    NoAuthority,

    #[error("Remote call channel closed before a result arrived")]
    Disconnected,

    #[error("Remote runtime error: {0}")]
    Runtime(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(err: std::io::Error) -> Self {
        RemoteError::Runtime(err.to_string())
    }
}
