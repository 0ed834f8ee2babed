use thiserror::Error;

/// Failure modes of the bookmark sync operation. `InvalidPayload` is
/// returned before any store interaction; `StoreFailure` means the replace
/// was rolled back and the store is exactly as it was before the call.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("bookmark store failure")]
    StoreFailure(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is already taken")]
    DuplicateField(&'static str),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("credential store failure")]
    Store(#[source] anyhow::Error),
}
