use tempo_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
