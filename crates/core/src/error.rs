#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate job name in batch: {0}")]
    DuplicateName(String),
}
