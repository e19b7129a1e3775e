use thiserror::Error;

pub type NetwardResult<T> = Result<T, NetwardError>;

#[derive(Error, Debug)]
pub enum NetwardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid verdict: {0}")]
    InvalidVerdict(String),

    #[error("Enforcement error: {0}")]
    Enforcement(String),

    #[error("{0}")]
    Other(String),
}
