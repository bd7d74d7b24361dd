use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("pin `{0}` is not registered")]
    NotFound(String),
    #[error("pin `{0}` is already registered")]
    AlreadyRegistered(String),
    #[error("pin `{0}` is not writable")]
    NotWritable(String),
    #[error("pin `{0}` is already being edited")]
    AlreadyEditing(String),
    #[error("pin `{0}` is not being edited")]
    NotEditing(String),
    #[error("view error: {0}")]
    View(String),
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

pub type ScanResult<T> = Result<T, ScanError>;
