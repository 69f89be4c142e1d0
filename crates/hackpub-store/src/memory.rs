use std::collections::HashMap;
use std::sync::RwLock;

use crate::document::{ContentType, Metadata, PUBLISHED_URL};
use crate::error::{StoreError, StoreResult};
use crate::keys::KeyAllocator;
use crate::traits::DocumentStore;

#[derive(Clone, Debug)]
struct StoredDocument {
    content: Vec<u8>,
    content_type: ContentType,
    metadata: Metadata,
}

struct State {
    documents: HashMap<String, StoredDocument>,
    allocator: KeyAllocator,
}

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Documents live behind a single `RwLock`;
/// key allocation happens under the write lock so concurrent creates can
/// never be handed the same key. Documents are cloned on read.
pub struct InMemoryDocumentStore {
    url_base: String,
    state: RwLock<State>,
}

impl InMemoryDocumentStore {
    /// Create an empty store publishing under `url_base`, with random keys.
    pub fn new(url_base: impl Into<String>) -> StoreResult<Self> {
        Self::with_allocator(url_base, KeyAllocator::default())
    }

    /// Create an empty store with an explicit key allocator.
    ///
    /// A trailing `/` is appended to `url_base` if it is missing.
    pub fn with_allocator(url_base: impl Into<String>, allocator: KeyAllocator) -> StoreResult<Self> {
        let mut url_base = url_base.into();
        if url_base.trim().is_empty() || url_base.chars().any(char::is_whitespace) {
            return Err(StoreError::InvalidUrlBase(url_base));
        }
        if !url_base.ends_with('/') {
            url_base.push('/');
        }
        Ok(Self {
            url_base,
            state: RwLock::new(State {
                documents: HashMap::new(),
                allocator,
            }),
        })
    }

    /// The prefix every published URL starts with.
    pub fn url_base(&self) -> &str {
        &self.url_base
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").documents.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().expect("lock poisoned").documents.is_empty()
    }

    /// Return a sorted list of all keys in the store.
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.read().expect("lock poisoned");
        let mut keys: Vec<String> = state.documents.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn create(
        &self,
        content: Vec<u8>,
        content_type: ContentType,
        mut metadata: Metadata,
    ) -> StoreResult<String> {
        let mut state = self.state.write().expect("lock poisoned");
        let State {
            documents,
            allocator,
        } = &mut *state;
        let key = allocator.allocate(|candidate| documents.contains_key(candidate))?;
        let published_url = format!("{}{}", self.url_base, key);
        metadata.insert(PUBLISHED_URL.to_string(), published_url.clone());
        tracing::debug!(key = %key, content_type = %content_type, bytes = content.len(), "document stored");
        documents.insert(
            key,
            StoredDocument {
                content,
                content_type,
                metadata,
            },
        );
        Ok(published_url)
    }

    fn get_content(&self, key: &str) -> StoreResult<Option<(Vec<u8>, ContentType)>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state
            .documents
            .get(key)
            .map(|doc| (doc.content.clone(), doc.content_type)))
    }

    fn get_metadata(&self, key: &str) -> StoreResult<Option<Metadata>> {
        let state = self.state.read().expect("lock poisoned");
        Ok(state.documents.get(key).map(|doc| doc.metadata.clone()))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("url_base", &self.url_base)
            .field("document_count", &self.len())
            .finish()
    }
}
