//! Error types for Folio.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Unknown special flag: {0}")]
    UnknownFlag(String),

    #[error("Unknown item kind: {0}")]
    UnknownItemKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FolioError {
    pub fn code(&self) -> i32 {
        match self {
            FolioError::Storage(_) => -32001,
            FolioError::UnknownZone(_) => -32010,
            FolioError::UnknownFlag(_) => -32011,
            FolioError::UnknownItemKind(_) => -32012,
            FolioError::Io(_) => -32006,
            FolioError::Json(_) => -32700,
        }
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            FolioError::Storage("x".into()),
            FolioError::UnknownZone("x".into()),
            FolioError::UnknownFlag("x".into()),
            FolioError::UnknownItemKind("x".into()),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_error_display() {
        let err = FolioError::UnknownZone("moon".to_string());
        assert_eq!(err.to_string(), "Unknown zone: moon");
    }
}
