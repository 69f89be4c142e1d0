use crate::document::{ContentType, Metadata};
use crate::error::StoreResult;

/// Key-allocating document store.
///
/// All implementations must satisfy these invariants:
/// - `create` allocates a fresh key for every call. Two concurrent calls must
///   never be handed the same key, and a key is never reused while a
///   document is stored under it.
/// - `create` stamps `published-url` into the stored metadata and returns
///   that same URL.
/// - Content bytes and content type are stored exactly as given.
/// - Reads return owned copies; mutating them never affects stored state.
/// - A missing key is `Ok(None)`; `Err` is reserved for backend faults.
pub trait DocumentStore: Send + Sync {
    /// Persist a new document and return its published URL.
    fn create(
        &self,
        content: Vec<u8>,
        content_type: ContentType,
        metadata: Metadata,
    ) -> StoreResult<String>;

    /// Fetch the content and content type stored under `key`.
    fn get_content(&self, key: &str) -> StoreResult<Option<(Vec<u8>, ContentType)>>;

    /// Fetch a copy of the metadata stored under `key`.
    fn get_metadata(&self, key: &str) -> StoreResult<Option<Metadata>>;
}
