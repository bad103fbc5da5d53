#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("State file error: {0}")]
    StateFileError(String),

    #[error("Failed to scan project tree: {0}")]
    ScanError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
