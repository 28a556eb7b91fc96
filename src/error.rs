use std::path::PathBuf;

// Identifier conflicts never show up here: the insert skips them.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read seed document {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed document: {0}")]
    DocumentParse(#[from] serde_json::Error),

    #[error("invalid {entity} {id}: {reason}")]
    InvalidRecord {
        entity: &'static str,
        id: i64,
        reason: String,
    },

    #[error("store operation failed on {entity} {id}: {source}")]
    Insert {
        entity: &'static str,
        id: i64,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store operation failed: {0}")]
    Store(#[from] rusqlite::Error),
}

impl SeedError {
    pub fn invalid(entity: &'static str, id: i64, reason: impl Into<String>) -> Self {
        SeedError::InvalidRecord {
            entity,
            id,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SeedError::DocumentRead { .. } => "seed_read_failed",
            SeedError::DocumentParse(_) | SeedError::InvalidRecord { .. } => "seed_invalid",
            SeedError::Insert { .. } | SeedError::Store(_) => "seed_store_failed",
        }
    }
}
