//! Error types for the layout store and the edit session

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed layout document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("store rejected request: {0}")]
    Remote(String),

    #[error("store transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("layout not available: {0}")]
    LoadFailed(#[source] StoreError),

    #[error("layout not saved: {0}")]
    SaveFailed(#[source] StoreError),

    #[error("dashboard is not in edit mode")]
    NotEditing,

    #[error("frame '{0}' is being moved")]
    Busy(String),
}
