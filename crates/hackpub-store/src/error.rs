/// Errors from document store operations.
///
/// A missing document is not an error; lookups return `Ok(None)` instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key allocator has no keys left to hand out.
    #[error("key space exhausted")]
    KeysExhausted,

    /// No unused key could be found within the retry budget.
    #[error("could not allocate a unique key after {0} attempts")]
    KeyCollision(usize),

    /// The configured URL base cannot prefix a published URL.
    #[error("invalid url base: {0}")]
    InvalidUrlBase(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
