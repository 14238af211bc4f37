use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite failure. Batch operations roll back before
    /// surfacing this.
    Sqlite(rusqlite::Error),
    /// Referenced record does not exist.
    NotFound { id: i64 },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "storage error: {e}"),
            Self::NotFound { id } => write!(f, "loss record {id} not found"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::NotFound { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}
