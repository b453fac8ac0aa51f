/// Errors produced while talking to a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached, or a connection could not be established.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store was reached but rejected or failed the command.
    ///
    /// The string contains the `Display` representation of the underlying error.
    #[error("store command failed: {0}")]
    Command(String),

    /// The store is known to be unavailable (shutting down, not yet initialised).
    #[error("store unavailable")]
    Unavailable,
}
