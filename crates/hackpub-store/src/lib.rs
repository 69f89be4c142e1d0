//! Document storage for hackpub.
//!
//! A published document is an immutable blob of HTML or JSON, addressed by a
//! short opaque key that the store allocates at creation time, plus a small
//! string-keyed metadata record.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Keys are allocated by the store and never reused while a mapping exists.
//! 2. Content is stored byte-for-byte; the store never interprets it.
//! 3. The store stamps `published-url` into metadata at creation.
//! 4. Reads hand out owned copies; callers cannot mutate stored state.
//! 5. All backend failures are propagated, never silently ignored.

pub mod document;
pub mod error;
pub mod keys;
pub mod memory;
pub mod traits;

pub use document::{ContentType, Metadata, CREATED, ORIGINAL_URL, PUBLISHED_URL};
pub use error::{StoreError, StoreResult};
pub use keys::KeyAllocator;
pub use memory::InMemoryDocumentStore;
pub use traits::DocumentStore;
