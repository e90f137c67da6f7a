use crate::domain::error::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("catalog is empty: nothing to export")]
    EmptyCatalog,

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("export I/O error: {0}")]
    ExportIo(#[source] std::io::Error),

    #[error("catalog lock poisoned")]
    LockPoisoned,
}
