/// Errors that can occur talking to a credential store.
///
/// "Key not found" is not an error: lookups return `Ok(None)`. These
/// variants mean the store itself couldn't answer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend couldn't be reached.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but the operation failed.
    #[error("credential store operation failed: {0}")]
    Backend(String),
}
